//! Preset weight sets, status quo normalisation and levy rate tables

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{divide, LevyError, Result};
use crate::levy::{Levy, RebalanceWeights, Scheme};
use crate::scenario::{DenominatorSet, WeightSet, BASELINE};

/// Named starting points for scenario weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightPreset {
    /// Current statutory split
    StatusQuo,
    /// Everything on gas, status quo fixed/variable basis
    AllGas,
    /// Everything on electricity, status quo fixed/variable basis
    AllElectricity,
    /// Status quo fuel split, all fixed charges
    StatusQuoAllFixed,
    /// Status quo fuel split, all variable charges
    StatusQuoAllVariable,
}

impl WeightPreset {
    pub const ALL: [WeightPreset; 5] = [
        WeightPreset::StatusQuo,
        WeightPreset::AllGas,
        WeightPreset::AllElectricity,
        WeightPreset::StatusQuoAllFixed,
        WeightPreset::StatusQuoAllVariable,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            WeightPreset::StatusQuo => "Status quo",
            WeightPreset::AllGas => "All gas, status quo fixed or variable",
            WeightPreset::AllElectricity => "All electricity, status quo fixed or variable",
            WeightPreset::StatusQuoAllFixed => "Status quo gas and electricity, all fixed",
            WeightPreset::StatusQuoAllVariable => "Status quo gas and electricity, all variable",
        }
    }

    fn key(&self) -> &'static str {
        match self {
            WeightPreset::StatusQuo => "status_quo",
            WeightPreset::AllGas => "all_gas",
            WeightPreset::AllElectricity => "all_electricity",
            WeightPreset::StatusQuoAllFixed => "status_quo_all_fixed",
            WeightPreset::StatusQuoAllVariable => "status_quo_all_variable",
        }
    }
}

impl fmt::Display for WeightPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for WeightPreset {
    type Err = LevyError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.key().eq_ignore_ascii_case(s) || p.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| LevyError::UnknownPreset(s.to_string()))
    }
}

/// Whole-percent shares of WHD charged to (electricity, gas) by customer count
///
/// Electricity is rounded with ties to even and gas takes the remainder, so
/// the pair always sums to 100.
fn whd_customer_percent(customers_elec: f64, customers_gas: f64) -> Result<(f64, f64)> {
    let total = customers_elec + customers_gas;
    let elec = (divide(customers_elec, total, "by total customers")? * 100.0).round_ties_even();
    Ok((elec, 100.0 - elec))
}

/// Status quo (electricity %, gas %) for a scheme
fn status_quo_percent(scheme: Scheme, whd: (f64, f64)) -> (f64, f64) {
    match scheme {
        Scheme::Ro | Scheme::Aahedc | Scheme::Fit => (100.0, 0.0),
        Scheme::Ggl => (0.0, 100.0),
        Scheme::Eco => (50.0, 50.0),
        Scheme::Whd => whd,
    }
}

/// Status quo fixed charge % for a scheme
fn status_quo_fixed_percent(scheme: Scheme) -> f64 {
    match scheme {
        Scheme::Ggl | Scheme::Whd => 100.0,
        _ => 0.0,
    }
}

/// Weights for all six schemes under a preset
///
/// No revenue goes to taxation. A fuel carrying no revenue gets a zero
/// fixed/variable split.
pub fn preset_weights(preset: WeightPreset, customers_elec: f64, customers_gas: f64) -> Result<WeightSet> {
    let whd = whd_customer_percent(customers_elec, customers_gas)?;

    let weights = Scheme::ALL
        .iter()
        .map(|&scheme| {
            let (elec, gas) = match preset {
                WeightPreset::AllGas => (0.0, 100.0),
                WeightPreset::AllElectricity => (100.0, 0.0),
                _ => status_quo_percent(scheme, whd),
            };
            let fixed = match preset {
                WeightPreset::StatusQuoAllFixed => 100.0,
                WeightPreset::StatusQuoAllVariable => 0.0,
                _ => status_quo_fixed_percent(scheme),
            };
            let split = |share: f64| if share > 0.0 { (fixed, 100.0 - fixed) } else { (0.0, 0.0) };
            let (electricity_fixed, electricity_variable) = split(elec);
            let (gas_fixed, gas_variable) = split(gas);

            let w = RebalanceWeights {
                electricity: elec / 100.0,
                gas: gas / 100.0,
                tax: 0.0,
                electricity_variable: electricity_variable / 100.0,
                electricity_fixed: electricity_fixed / 100.0,
                gas_variable: gas_variable / 100.0,
                gas_fixed: gas_fixed / 100.0,
            };
            (scheme, w)
        })
        .collect();

    Ok(weights)
}

/// Each levy's own weights, with the WHD fuel split set by its customer
/// denominators to whole percent
pub fn status_quo_weights(levies: &[Levy], denominators: &DenominatorSet) -> Result<WeightSet> {
    let mut weights = WeightSet::new();
    for levy in levies {
        let mut w = levy.current_weights();
        if levy.scheme == Scheme::Whd {
            let d = denominators
                .get(&Scheme::Whd)
                .ok_or(LevyError::MissingDenominators(Scheme::Whd))?;
            let (elec, gas) = whd_customer_percent(d.customers_elec, d.customers_gas)?;
            w.electricity = elec / 100.0;
            w.gas = gas / 100.0;
        }
        weights.insert(levy.scheme, w);
    }
    Ok(weights)
}

/// Rebalance the levies to their status quo weights under `denominators`
///
/// Published rates rest on each regulator's own charging base; restating
/// them on the model's denominators makes baseline and scenarios comparable.
pub fn normalise_baseline(levies: &[Levy], denominators: &DenominatorSet) -> Result<Vec<Levy>> {
    let weights = status_quo_weights(levies, denominators)?;
    levies
        .iter()
        .map(|levy| {
            let d = denominators
                .get(&levy.scheme)
                .ok_or(LevyError::MissingDenominators(levy.scheme))?;
            let w = weights.get(&levy.scheme).ok_or_else(|| LevyError::MissingWeights {
                scenario: BASELINE.to_string(),
                scheme: levy.scheme,
            })?;
            levy.rebalanced_copy(w, d)
        })
        .collect()
}

/// A levy's rates after rebalancing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevyRateRow {
    #[serde(rename = "Levy")]
    pub levy: String,
    #[serde(rename = "Electricity, variable rate (£/MWh)")]
    pub electricity_variable_rate: f64,
    #[serde(rename = "Electricity, fixed rate (£/customer)")]
    pub electricity_fixed_rate: f64,
    #[serde(rename = "Gas, variable rate (£/MWh)")]
    pub gas_variable_rate: f64,
    #[serde(rename = "Gas, fixed rate (£/customer)")]
    pub gas_fixed_rate: f64,
    #[serde(rename = "General taxation (£)")]
    pub general_taxation: f64,
}

pub fn levy_rate_table(levies: &[Levy]) -> Vec<LevyRateRow> {
    levies
        .iter()
        .map(|levy| LevyRateRow {
            levy: levy.name.clone(),
            electricity_variable_rate: levy.electricity_variable_rate,
            electricity_fixed_rate: levy.electricity_fixed_rate,
            gas_variable_rate: levy.gas_variable_rate,
            gas_fixed_rate: levy.gas_fixed_rate,
            general_taxation: levy.general_taxation,
        })
        .collect()
}
