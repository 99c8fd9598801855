//! Revenue-conserving rebalancing of a levy's charging structure

use log::trace;
use serde::{Deserialize, Serialize};

use super::Levy;
use crate::error::{divide, LevyError, Result};

/// Absolute tolerance (£) on revenue conservation
pub const REVENUE_TOLERANCE: f64 = 0.01;

/// Target split for a levy
///
/// `electricity + gas + tax` should be 1, and each active fuel's
/// `variable + fixed` should be 1. Inconsistent weights are caught by the
/// conservation check rather than up front.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RebalanceWeights {
    #[serde(alias = "new_electricity_weight")]
    pub electricity: f64,
    #[serde(alias = "new_gas_weight")]
    pub gas: f64,
    #[serde(alias = "new_tax_weight")]
    pub tax: f64,
    #[serde(alias = "new_variable_weight_elec")]
    pub electricity_variable: f64,
    #[serde(alias = "new_fixed_weight_elec")]
    pub electricity_fixed: f64,
    #[serde(alias = "new_variable_weight_gas")]
    pub gas_variable: f64,
    #[serde(alias = "new_fixed_weight_gas")]
    pub gas_fixed: f64,
}

impl RebalanceWeights {
    /// Mode split sum; 1 for consistent weights
    pub fn mode_total(&self) -> f64 {
        self.electricity + self.gas + self.tax
    }
}

/// Supply volumes (MWh) and customer counts that convert revenue into rates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Denominators {
    pub supply_elec: f64,
    pub supply_gas: f64,
    pub customers_elec: f64,
    pub customers_gas: f64,
}

impl Denominators {
    /// Domestic subnational accounts figures
    pub fn subnational_domestic() -> Self {
        Self {
            supply_elec: 94_200_366.0,
            supply_gas: 265_197_947.0,
            customers_elec: 29_078_770.0,
            customers_gas: 24_503_683.0,
        }
    }
}

/// Rates and tax amount computed for a rebalance, not yet applied
struct Candidate {
    weights: RebalanceWeights,
    electricity_variable_rate: f64,
    electricity_fixed_rate: f64,
    gas_variable_rate: f64,
    gas_fixed_rate: f64,
    general_taxation: f64,
}

/// Rate for one share of revenue; a zero share needs no denominator
fn rate(revenue_share: f64, basis_weight: f64, denominator: f64, what: &'static str) -> Result<f64> {
    if revenue_share * basis_weight == 0.0 {
        return Ok(0.0);
    }
    Ok(divide(revenue_share, denominator, what)? * basis_weight)
}

impl Levy {
    fn rebalance_candidate(&self, weights: &RebalanceWeights, denominators: &Denominators) -> Result<Candidate> {
        let revenue_gas = self.revenue * weights.gas;
        let revenue_elec = self.revenue * weights.electricity;
        let revenue_tax = self.revenue * weights.tax;

        let candidate = Candidate {
            weights: *weights,
            gas_variable_rate: rate(revenue_gas, weights.gas_variable, denominators.supply_gas, "by gas supply")?,
            electricity_variable_rate: rate(
                revenue_elec,
                weights.electricity_variable,
                denominators.supply_elec,
                "by electricity supply",
            )?,
            gas_fixed_rate: rate(revenue_gas, weights.gas_fixed, denominators.customers_gas, "by gas customers")?,
            electricity_fixed_rate: rate(
                revenue_elec,
                weights.electricity_fixed,
                denominators.customers_elec,
                "by electricity customers",
            )?,
            general_taxation: revenue_tax,
        };

        let new_revenue_gas = candidate.gas_variable_rate * denominators.supply_gas
            + candidate.gas_fixed_rate * denominators.customers_gas;
        let new_revenue_elec = candidate.electricity_variable_rate * denominators.supply_elec
            + candidate.electricity_fixed_rate * denominators.customers_elec;
        let actual = new_revenue_gas + new_revenue_elec + revenue_tax;

        trace!(
            "{}: rebalanced revenue {:.2} (gas {:.2}, electricity {:.2}, tax {:.2})",
            self.scheme, actual, new_revenue_gas, new_revenue_elec, revenue_tax
        );

        if (actual - self.revenue).abs() >= REVENUE_TOLERANCE {
            return Err(LevyError::RevenueNotMaintained {
                scheme: self.scheme,
                expected: self.revenue,
                actual,
            });
        }
        Ok(candidate)
    }

    fn apply(&mut self, candidate: Candidate) {
        let w = candidate.weights;
        self.electricity_weight = w.electricity;
        self.gas_weight = w.gas;
        self.tax_weight = w.tax;
        self.electricity_variable_weight = w.electricity_variable;
        self.electricity_fixed_weight = w.electricity_fixed;
        self.gas_variable_weight = w.gas_variable;
        self.gas_fixed_weight = w.gas_fixed;

        self.electricity_variable_rate = candidate.electricity_variable_rate;
        self.electricity_fixed_rate = candidate.electricity_fixed_rate;
        self.gas_variable_rate = candidate.gas_variable_rate;
        self.gas_fixed_rate = candidate.gas_fixed_rate;
        self.general_taxation = candidate.general_taxation;
    }

    /// Rebalance in place. On error the levy is left unchanged.
    pub fn rebalance_into(&mut self, weights: &RebalanceWeights, denominators: &Denominators) -> Result<()> {
        let candidate = self.rebalance_candidate(weights, denominators)?;
        self.apply(candidate);
        Ok(())
    }

    /// Rebalanced copy of this levy
    pub fn rebalanced_copy(&self, weights: &RebalanceWeights, denominators: &Denominators) -> Result<Levy> {
        let candidate = self.rebalance_candidate(weights, denominators)?;
        let mut levy = self.clone();
        levy.apply(candidate);
        Ok(levy)
    }
}
