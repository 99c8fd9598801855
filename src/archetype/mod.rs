//! Household consumption archetypes and eligibility counts

pub mod loader;

pub use loader::{load_archetypes, load_archetypes_from_reader, load_eligibility, load_eligibility_from_reader, DEFAULT_ARCHETYPES_PATH};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{LevyError, Result};

/// Profile column shared by archetype and eligibility tables
pub const PROFILE_COLUMN: &str = "AnnualConsumptionProfile";
/// Household count column
pub const SIZE_COLUMN: &str = "ArchetypeSize";
/// Column written by [`collapse_income_deciles`]
pub const INCOME_DECILES_COLUMN: &str = "IncomeDecilesEligibilitySize";

/// A representative household profile
///
/// Consumption is as published (kWh); the scenario processor scales it to MWh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archetype {
    #[serde(rename = "AnnualConsumptionProfile")]
    pub profile: String,
    #[serde(rename = "ElectricitySingleRatekWh")]
    pub electricity_kwh: f64,
    #[serde(rename = "GaskWh")]
    pub gas_kwh: f64,
    #[serde(rename = "ArchetypeNickname", default)]
    pub nickname: Option<String>,
    #[serde(rename = "ArchetypeHeatingFuel", default)]
    pub heating_fuel: Option<String>,
    /// Number of households the archetype represents
    #[serde(rename = "ArchetypeSize", default)]
    pub size: Option<f64>,
    #[serde(rename = "GrossAnnualHouseholdIncome", default)]
    pub income: Option<f64>,
}

impl Archetype {
    pub fn new(profile: &str, electricity_kwh: f64, gas_kwh: f64) -> Self {
        Self {
            profile: profile.to_string(),
            electricity_kwh,
            gas_kwh,
            nickname: None,
            heating_fuel: None,
            size: None,
            income: None,
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }

    /// Off-gas households have no gas consumption
    pub fn is_off_gas(&self) -> bool {
        self.gas_kwh == 0.0
    }
}

/// Numeric columns per archetype profile, in header order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EligibilityTable {
    columns: Vec<String>,
    rows: Vec<(String, HashMap<String, f64>)>,
}

impl EligibilityTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Add a profile's values; columns not in the table are ignored
    pub fn push(&mut self, profile: &str, values: HashMap<String, f64>) {
        self.rows.push((profile.to_string(), values));
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn profiles(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|(profile, _)| profile.as_str())
    }

    /// Value for a profile; an empty cell reads as zero households
    pub fn value(&self, profile: &str, column: &str) -> Result<f64> {
        if !self.columns.iter().any(|c| c == column) {
            return Err(LevyError::MissingColumn(column.to_string()));
        }
        let (_, values) = self
            .rows
            .iter()
            .find(|(p, _)| p == profile)
            .ok_or_else(|| LevyError::MissingArchetype(profile.to_string()))?;
        Ok(values.get(column).copied().unwrap_or(0.0))
    }
}

/// Sum the lowest `deciles` income decile columns into a single
/// [`INCOME_DECILES_COLUMN`]
///
/// Decile columns are every column after the profile and size columns, lowest
/// decile first.
pub fn collapse_income_deciles(deciles: &EligibilityTable, eligible_deciles: usize) -> EligibilityTable {
    let decile_columns: Vec<&String> = deciles
        .columns
        .iter()
        .filter(|c| c.as_str() != SIZE_COLUMN)
        .take(eligible_deciles)
        .collect();

    let mut collapsed = EligibilityTable::new(vec![SIZE_COLUMN.to_string(), INCOME_DECILES_COLUMN.to_string()]);
    for (profile, values) in &deciles.rows {
        let eligible: f64 = decile_columns.iter().filter_map(|c| values.get(*c)).sum();
        let mut row = HashMap::new();
        if let Some(size) = values.get(SIZE_COLUMN) {
            row.insert(SIZE_COLUMN.to_string(), *size);
        }
        row.insert(INCOME_DECILES_COLUMN.to_string(), eligible);
        collapsed.push(profile, row);
    }
    collapsed
}
