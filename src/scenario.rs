//! Scenario processor for batch levy rebalancing
//!
//! Holds the denominators and processing options once, then rebalances the
//! levy catalogue for each named scenario and evaluates every archetype
//! against the result. Output is long-form: one record per archetype,
//! scenario and variable.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::archetype::Archetype;
use crate::error::{LevyError, Result};
use crate::levy::{Denominators, Levy, RebalanceWeights, Scheme};
use crate::tariff::TariffPair;

/// Scenario name used for the unmodified levies
pub const BASELINE: &str = "Baseline";

/// Rebalancing weights for each scheme in one scenario
pub type WeightSet = BTreeMap<Scheme, RebalanceWeights>;

/// Weight sets by scenario name
pub type ScenarioWeights = BTreeMap<String, WeightSet>;

/// Denominators for each scheme, shared by all scenarios
pub type DenominatorSet = BTreeMap<Scheme, Denominators>;

/// Same denominators for every scheme
pub fn uniform_denominators(denominators: Denominators) -> DenominatorSet {
    Scheme::ALL.iter().map(|&scheme| (scheme, denominators)).collect()
}

/// Levy cost breakdowns to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Summary {
    Fixed,
    Variable,
    Total,
}

/// Processing options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Supply and customer denominators per scheme
    #[serde(default = "default_denominators")]
    pub denominators: DenominatorSet,

    /// Divisor converting archetype consumption to MWh
    #[serde(default = "default_consumption_scale_factor")]
    pub consumption_scale_factor: f64,

    /// Emit the unmodified levies as the Baseline scenario
    #[serde(default = "default_include_baseline")]
    pub include_baseline: bool,

    #[serde(default = "default_summaries")]
    pub summaries: Vec<Summary>,
}

fn default_denominators() -> DenominatorSet { uniform_denominators(Denominators::subnational_domestic()) }
fn default_consumption_scale_factor() -> f64 { 1_000.0 }
fn default_include_baseline() -> bool { true }
fn default_summaries() -> Vec<Summary> { vec![Summary::Fixed, Summary::Variable, Summary::Total] }

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            denominators: default_denominators(),
            consumption_scale_factor: default_consumption_scale_factor(),
            include_baseline: default_include_baseline(),
            summaries: default_summaries(),
        }
    }
}

/// One value in a long-form scenario table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRecord {
    #[serde(rename = "AnnualConsumptionProfile")]
    pub archetype: String,
    pub scenario: String,
    pub variable: String,
    pub value: f64,
}

/// Levy cost record
pub type CostRecord = ScenarioRecord;
/// VAT-inclusive bill record
pub type BillRecord = ScenarioRecord;

pub const ELECTRICITY_BILL: &str = "electricity bill incl VAT";
pub const GAS_BILL: &str = "gas bill incl VAT";
pub const TOTAL_BILL: &str = "total bill incl VAT";
pub const TOTAL_LEVY_COSTS: &str = "total levy costs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LevyFuel {
    Electricity,
    Gas,
}

impl LevyFuel {
    fn label(&self) -> &'static str {
        match self {
            LevyFuel::Electricity => "electricity",
            LevyFuel::Gas => "gas",
        }
    }
}

/// Sum of one fuel's fixed or variable levy charges at `consumption` MWh
fn sum_levies(levies: &[Levy], consumption: f64, summary: Summary, fuel: LevyFuel) -> f64 {
    if consumption == 0.0 {
        return 0.0;
    }
    let charge = |levy: &Levy| match (summary, fuel) {
        (Summary::Fixed, LevyFuel::Electricity) => levy.calculate_fixed_levy(true, false),
        (Summary::Fixed, LevyFuel::Gas) => levy.calculate_fixed_levy(false, true),
        (Summary::Variable, LevyFuel::Electricity) => levy.calculate_variable_levy(consumption, 0.0),
        (Summary::Variable, LevyFuel::Gas) => levy.calculate_variable_levy(0.0, consumption),
        (Summary::Total, _) => 0.0,
    };
    levies.iter().map(charge).sum()
}

/// Total levy charge; off-gas households are electricity-only customers
fn total_levies(levies: &[Levy], electricity: f64, gas: f64) -> f64 {
    levies.iter().map(|levy| levy.calculate_levy(electricity, gas, true, gas != 0.0)).sum()
}

/// Batch processor for rebalancing scenarios
///
/// # Example
/// ```ignore
/// let processor = ScenarioProcessor::new(ScenarioConfig::default());
/// let costs = processor.process_costs(&levies, &weights, &archetypes)?;
/// let bills = processor.process_bills(&tariffs, &levies, &weights, &archetypes)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScenarioProcessor {
    config: ScenarioConfig,
}

impl ScenarioProcessor {
    pub fn new(config: ScenarioConfig) -> Self {
        Self { config }
    }

    /// Processor with default options and the given denominators
    pub fn with_denominators(denominators: DenominatorSet) -> Self {
        Self {
            config: ScenarioConfig { denominators, ..Default::default() },
        }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ScenarioConfig {
        &mut self.config
    }

    /// Rebalanced copies of `levies` under one scenario's weights
    pub fn rebalance_levies(&self, levies: &[Levy], weights: &WeightSet, scenario: &str) -> Result<Vec<Levy>> {
        levies
            .iter()
            .map(|levy| {
                let w = weights.get(&levy.scheme).ok_or_else(|| LevyError::MissingWeights {
                    scenario: scenario.to_string(),
                    scheme: levy.scheme,
                })?;
                let d = self
                    .config
                    .denominators
                    .get(&levy.scheme)
                    .ok_or(LevyError::MissingDenominators(levy.scheme))?;
                levy.rebalanced_copy(w, d)
            })
            .collect()
    }

    /// Levies for each scenario in output order, Baseline first
    fn scenario_levies(&self, levies: &[Levy], weights: &ScenarioWeights) -> Result<Vec<(String, Vec<Levy>)>> {
        let mut scenarios = Vec::with_capacity(weights.len() + 1);
        if self.config.include_baseline {
            scenarios.push((BASELINE.to_string(), levies.to_vec()));
        }
        for (name, weight_set) in weights {
            debug!("Rebalancing levies for scenario '{}'", name);
            scenarios.push((name.clone(), self.rebalance_levies(levies, weight_set, name)?));
        }
        Ok(scenarios)
    }

    fn scale(&self, consumption: f64) -> f64 {
        consumption / self.config.consumption_scale_factor
    }

    /// Levy cost breakdown per archetype per scenario
    pub fn process_costs(
        &self,
        levies: &[Levy],
        weights: &ScenarioWeights,
        archetypes: &[Archetype],
    ) -> Result<Vec<CostRecord>> {
        let scenarios = self.scenario_levies(levies, weights)?;
        let mut records = Vec::new();

        for (scenario, scenario_levies) in &scenarios {
            for &summary in &self.config.summaries {
                let fuels: &[LevyFuel] = match summary {
                    Summary::Total => &[],
                    _ => &[LevyFuel::Electricity, LevyFuel::Gas],
                };
                for &fuel in fuels {
                    let variable = format!(
                        "{} {} levy costs",
                        fuel.label(),
                        if summary == Summary::Fixed { "fixed" } else { "variable" }
                    );
                    for archetype in archetypes {
                        let consumption = match fuel {
                            LevyFuel::Electricity => self.scale(archetype.electricity_kwh),
                            LevyFuel::Gas => self.scale(archetype.gas_kwh),
                        };
                        records.push(CostRecord {
                            archetype: archetype.profile.clone(),
                            scenario: scenario.clone(),
                            variable: variable.clone(),
                            value: sum_levies(scenario_levies, consumption, summary, fuel),
                        });
                    }
                }
                if summary == Summary::Total {
                    for archetype in archetypes {
                        records.push(CostRecord {
                            archetype: archetype.profile.clone(),
                            scenario: scenario.clone(),
                            variable: TOTAL_LEVY_COSTS.to_string(),
                            value: total_levies(
                                scenario_levies,
                                self.scale(archetype.electricity_kwh),
                                self.scale(archetype.gas_kwh),
                            ),
                        });
                    }
                }
            }
        }

        info!(
            "Processed levy costs for {} scenarios x {} archetypes ({} records)",
            scenarios.len(),
            archetypes.len(),
            records.len()
        );
        Ok(records)
    }

    /// VAT-inclusive bills per archetype per scenario
    ///
    /// Baseline bills use `tariffs` as supplied. Each scenario evaluates its
    /// own copy with policy costs replaced by the rebalanced levies.
    pub fn process_bills(
        &self,
        tariffs: &TariffPair,
        levies: &[Levy],
        weights: &ScenarioWeights,
        archetypes: &[Archetype],
    ) -> Result<Vec<BillRecord>> {
        let mut records = Vec::new();
        let mut count = 0;

        if self.config.include_baseline {
            self.push_bills(&mut records, BASELINE, tariffs, archetypes);
            count += 1;
        }
        for (name, weight_set) in weights {
            let rebalanced = self.rebalance_levies(levies, weight_set, name)?;
            let scenario_tariffs = tariffs.with_levies(&rebalanced);
            self.push_bills(&mut records, name, &scenario_tariffs, archetypes);
            count += 1;
        }

        info!(
            "Processed bills for {} scenarios x {} archetypes ({} records)",
            count,
            archetypes.len(),
            records.len()
        );
        Ok(records)
    }

    fn push_bills(&self, records: &mut Vec<BillRecord>, scenario: &str, tariffs: &TariffPair, archetypes: &[Archetype]) {
        let bills: Vec<(f64, f64)> = archetypes
            .iter()
            .map(|a| {
                (
                    tariffs.electricity.calculate_total_consumption(self.scale(a.electricity_kwh), true),
                    tariffs.gas.calculate_total_consumption(self.scale(a.gas_kwh), true),
                )
            })
            .collect();

        let columns: [(&str, fn(&(f64, f64)) -> f64); 3] = [
            (ELECTRICITY_BILL, |b| b.0),
            (GAS_BILL, |b| b.1),
            (TOTAL_BILL, |b| b.0 + b.1),
        ];
        for (variable, value) in columns {
            for (archetype, bill) in archetypes.iter().zip(&bills) {
                records.push(BillRecord {
                    archetype: archetype.profile.clone(),
                    scenario: scenario.to_string(),
                    variable: variable.to_string(),
                    value: value(bill),
                });
            }
        }
    }
}
