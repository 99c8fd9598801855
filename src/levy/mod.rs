//! Policy cost levy records, scheme factories and rebalancing

mod schemes;
mod rebalance;
pub mod loader;

pub use schemes::{
    RoRow, AahedcRow, GglRow, WhdRow, EcoRow, FitRow, SchemeParameters, ConversionFactors, RevenueBasis,
    renewables_obligation_rate, aahedc_tariff_forecast, aahedc_rate, ggl_rate, whd_rate,
    eco_rate, feed_in_tariff_rate,
};
pub use rebalance::{RebalanceWeights, Denominators, REVENUE_TOLERANCE};
pub use loader::{SchemeTables, LevyInputs, build_levies, build_levies_lenient};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LevyError;

/// The six policy cost schemes charged on domestic energy bills
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Renewables Obligation
    Ro,
    /// Warm Home Discount
    Whd,
    /// Energy Company Obligation
    Eco,
    /// Assistance for Areas with High Electricity Distribution Costs
    Aahedc,
    /// Green Gas Levy
    Ggl,
    /// Feed-in Tariff
    Fit,
}

impl Scheme {
    pub const ALL: [Scheme; 6] = [
        Scheme::Ro,
        Scheme::Aahedc,
        Scheme::Ggl,
        Scheme::Whd,
        Scheme::Eco,
        Scheme::Fit,
    ];

    /// Stable key used to join weights, denominators and levies
    pub fn short_name(&self) -> &'static str {
        match self {
            Scheme::Ro => "ro",
            Scheme::Whd => "whd",
            Scheme::Eco => "eco",
            Scheme::Aahedc => "aahedc",
            Scheme::Ggl => "ggl",
            Scheme::Fit => "fit",
        }
    }

    /// Full scheme name
    pub fn name(&self) -> &'static str {
        match self {
            Scheme::Ro => "renewables obligation",
            Scheme::Whd => "Warm Homes Discount",
            Scheme::Eco => "Energy Company Obligation",
            Scheme::Aahedc => "Assistance for Areas with High Electricity Distribution Costs",
            Scheme::Ggl => "Green Gas Levy",
            Scheme::Fit => "Feed in Tariff",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for Scheme {
    type Err = LevyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ro" => Ok(Scheme::Ro),
            "whd" => Ok(Scheme::Whd),
            "eco" => Ok(Scheme::Eco),
            "aahedc" => Ok(Scheme::Aahedc),
            "ggl" => Ok(Scheme::Ggl),
            "fit" => Ok(Scheme::Fit),
            other => Err(LevyError::UnknownScheme(other.to_string())),
        }
    }
}

/// A levy's charging structure and the revenue it must raise
///
/// Rates are £/MWh for the variable components and £/customer/year for the
/// fixed components. `revenue` is conserved by rebalancing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Levy {
    /// Full levy name
    pub name: String,

    /// Scheme the levy was derived from
    pub scheme: Scheme,

    // Mode split
    pub electricity_weight: f64,
    pub gas_weight: f64,
    pub tax_weight: f64,

    // Charging basis split per fuel
    pub electricity_variable_weight: f64,
    pub electricity_fixed_weight: f64,
    pub gas_variable_weight: f64,
    pub gas_fixed_weight: f64,

    // Rates
    pub electricity_variable_rate: f64,
    pub electricity_fixed_rate: f64,
    pub gas_variable_rate: f64,
    pub gas_fixed_rate: f64,

    /// Amount allocated to general taxation
    pub general_taxation: f64,

    /// Total revenue the levy raises
    pub revenue: f64,

    /// Published scheme values the rates were derived from
    pub parameters: SchemeParameters,
}

impl Levy {
    /// Short name of the levy's scheme
    pub fn short_name(&self) -> &'static str {
        self.scheme.short_name()
    }

    /// Total levy charge for a household
    pub fn calculate_levy(
        &self,
        electricity_consumption: f64,
        gas_consumption: f64,
        electricity_customer: bool,
        gas_customer: bool,
    ) -> f64 {
        self.calculate_variable_levy(electricity_consumption, gas_consumption)
            + self.calculate_fixed_levy(electricity_customer, gas_customer)
    }

    /// Consumption-driven charge; consumption in MWh
    pub fn calculate_variable_levy(&self, electricity_consumption: f64, gas_consumption: f64) -> f64 {
        self.electricity_variable_rate * electricity_consumption
            + self.gas_variable_rate * gas_consumption
    }

    /// Per-customer charge for the fuels the household is connected to
    pub fn calculate_fixed_levy(&self, electricity_customer: bool, gas_customer: bool) -> f64 {
        let electricity = if electricity_customer { self.electricity_fixed_rate } else { 0.0 };
        let gas = if gas_customer { self.gas_fixed_rate } else { 0.0 };
        electricity + gas
    }

    /// The weights describing the levy's current split
    pub fn current_weights(&self) -> RebalanceWeights {
        RebalanceWeights {
            electricity: self.electricity_weight,
            gas: self.gas_weight,
            tax: self.tax_weight,
            electricity_variable: self.electricity_variable_weight,
            electricity_fixed: self.electricity_fixed_weight,
            gas_variable: self.gas_variable_weight,
            gas_fixed: self.gas_fixed_weight,
        }
    }
}

impl fmt::Display for Levy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Levy(name=\"{}\", short_name=\"{}\"", self.name, self.short_name())?;
        let fields = [
            ("electricity_weight", self.electricity_weight),
            ("gas_weight", self.gas_weight),
            ("tax_weight", self.tax_weight),
            ("electricity_variable_rate", self.electricity_variable_rate),
            ("electricity_fixed_rate", self.electricity_fixed_rate),
            ("gas_variable_rate", self.gas_variable_rate),
            ("gas_fixed_rate", self.gas_fixed_rate),
        ];
        for (name, value) in fields.iter().filter(|(_, v)| *v > 0.0) {
            write!(f, ", {}={}", name, value)?;
        }
        write!(f, ")")
    }
}
