//! Tariff bill templates built from the price cap component tables
//!
//! A tariff holds twelve standing-charge ("nil consumption") components and
//! twelve matching unit-rate components. Components absent for a payment
//! method stay `None` and are skipped when summing.

pub mod loader;

pub use loader::{load_component_rows, load_component_rows_from_reader, load_tariff_pair, ComponentRow, DEFAULT_TARIFF_TABLES_PATH};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{divide, LevyError, Result};
use crate::levy::Levy;

/// VAT charged on domestic energy
pub const VAT_RATE: f64 = 0.05;

/// Annual consumption (MWh) the typical-consumption tables are priced at
pub const TYPICAL_ELECTRICITY_CONSUMPTION: f64 = 2.7;
pub const TYPICAL_GAS_CONSUMPTION: f64 = 11.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fuel {
    Electricity,
    Gas,
}

impl Fuel {
    pub fn typical_consumption(&self) -> f64 {
        match self {
            Fuel::Electricity => TYPICAL_ELECTRICITY_CONSUMPTION,
            Fuel::Gas => TYPICAL_GAS_CONSUMPTION,
        }
    }
}

impl fmt::Display for Fuel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fuel::Electricity => f.write_str("electricity"),
            Fuel::Gas => f.write_str("gas"),
        }
    }
}

/// How the household pays for its energy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    StandardCredit,
    OtherPayment,
    Prepayment,
}

impl PaymentMethod {
    /// File-name key for the method's component tables
    pub fn key(&self) -> &'static str {
        match self {
            PaymentMethod::StandardCredit => "standard_credit",
            PaymentMethod::OtherPayment => "other_payment",
            PaymentMethod::Prepayment => "ppm",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::StandardCredit => "Standard Credit",
            PaymentMethod::OtherPayment => "Other Payment Method",
            PaymentMethod::Prepayment => "PPM",
        }
    }

    /// Standard credit tables carry no levelisation line
    pub fn has_levelisation(&self) -> bool {
        !matches!(self, PaymentMethod::StandardCredit)
    }
}

impl FromStr for PaymentMethod {
    type Err = LevyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard credit" | "standard_credit" | "standard-credit" => Ok(PaymentMethod::StandardCredit),
            "other payment method" | "other payment" | "other_payment" | "other-payment" => {
                Ok(PaymentMethod::OtherPayment)
            }
            "prepayment meter" | "prepayment" | "ppm" => Ok(PaymentMethod::Prepayment),
            _ => Err(LevyError::UnknownPaymentMethod(s.to_string())),
        }
    }
}

/// Cost lines of the price cap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    /// Direct fuel
    DirectFuel,
    /// Capacity market
    CapacityMarket,
    /// Adjustment allowance
    AdjustmentAllowance,
    /// Policy costs
    PolicyCost,
    /// Network costs
    NetworkCost,
    /// Operating costs
    OperatingCost,
    /// Smart metering net cost change
    SmartMetering,
    /// Payment method additional administrative cost
    PaymentAdditionalCost,
    /// Payment method adjustment percentage
    PaymentAdjustment,
    /// EBIT allowance
    Ebit,
    /// Headroom allowance percentage
    Headroom,
    Levelisation,
}

impl Component {
    pub const ALL: [Component; 12] = [
        Component::DirectFuel,
        Component::CapacityMarket,
        Component::AdjustmentAllowance,
        Component::PolicyCost,
        Component::NetworkCost,
        Component::OperatingCost,
        Component::SmartMetering,
        Component::PaymentAdditionalCost,
        Component::PaymentAdjustment,
        Component::Ebit,
        Component::Headroom,
        Component::Levelisation,
    ];

    /// Code used in the component tables
    pub fn code(&self) -> &'static str {
        match self {
            Component::DirectFuel => "DF",
            Component::CapacityMarket => "CM",
            Component::AdjustmentAllowance => "AA",
            Component::PolicyCost => "PC",
            Component::NetworkCost => "NC",
            Component::OperatingCost => "OC",
            Component::SmartMetering => "SMNCC",
            Component::PaymentAdditionalCost => "PAAC",
            Component::PaymentAdjustment => "PAP",
            Component::Ebit => "EBIT",
            Component::Headroom => "HAP",
            Component::Levelisation => "Levelisation",
        }
    }

    /// Look up a component by its table code
    pub fn from_code(code: &str) -> Option<Component> {
        let code = code.trim();
        Component::ALL.into_iter().find(|c| c.code().eq_ignore_ascii_case(code))
    }
}

/// One value per cost line; `None` when the line does not apply
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TariffComponents {
    pub df: Option<f64>,
    pub cm: Option<f64>,
    pub aa: Option<f64>,
    pub pc: Option<f64>,
    pub nc: Option<f64>,
    pub oc: Option<f64>,
    pub smncc: Option<f64>,
    pub paac: Option<f64>,
    pub pap: Option<f64>,
    pub ebit: Option<f64>,
    pub hap: Option<f64>,
    pub levelisation: Option<f64>,
}

impl TariffComponents {
    pub fn get(&self, component: Component) -> Option<f64> {
        *self.slot(component)
    }

    pub fn set(&mut self, component: Component, value: Option<f64>) {
        *self.slot_mut(component) = value;
    }

    fn slot(&self, component: Component) -> &Option<f64> {
        match component {
            Component::DirectFuel => &self.df,
            Component::CapacityMarket => &self.cm,
            Component::AdjustmentAllowance => &self.aa,
            Component::PolicyCost => &self.pc,
            Component::NetworkCost => &self.nc,
            Component::OperatingCost => &self.oc,
            Component::SmartMetering => &self.smncc,
            Component::PaymentAdditionalCost => &self.paac,
            Component::PaymentAdjustment => &self.pap,
            Component::Ebit => &self.ebit,
            Component::Headroom => &self.hap,
            Component::Levelisation => &self.levelisation,
        }
    }

    fn slot_mut(&mut self, component: Component) -> &mut Option<f64> {
        match component {
            Component::DirectFuel => &mut self.df,
            Component::CapacityMarket => &mut self.cm,
            Component::AdjustmentAllowance => &mut self.aa,
            Component::PolicyCost => &mut self.pc,
            Component::NetworkCost => &mut self.nc,
            Component::OperatingCost => &mut self.oc,
            Component::SmartMetering => &mut self.smncc,
            Component::PaymentAdditionalCost => &mut self.paac,
            Component::PaymentAdjustment => &mut self.pap,
            Component::Ebit => &mut self.ebit,
            Component::Headroom => &mut self.hap,
            Component::Levelisation => &mut self.levelisation,
        }
    }

    /// Defined values, NaN treated as undefined
    pub fn defined(&self) -> impl Iterator<Item = f64> + '_ {
        Component::ALL
            .into_iter()
            .filter_map(move |c| self.get(c))
            .filter(|v| !v.is_nan())
    }

    pub fn sum(&self) -> f64 {
        self.defined().sum()
    }
}

/// An energy bill for one fuel and payment method
///
/// `nil` components are £/customer/year; `unit` components are £/MWh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tariff {
    pub name: String,
    pub fuel: Fuel,
    pub payment_method: PaymentMethod,
    pub nil: TariffComponents,
    pub unit: TariffComponents,
}

impl Tariff {
    pub fn new(fuel: Fuel, payment_method: PaymentMethod, nil: TariffComponents, unit: TariffComponents) -> Self {
        let name = match fuel {
            Fuel::Electricity => format!("{}. Electricity Single-Rate Metering Arrangement", payment_method.label()),
            Fuel::Gas => format!("{}. Gas", payment_method.label()),
        };
        Self { name, fuel, payment_method, nil, unit }
    }

    /// Build a tariff from the latest period of the nil and typical
    /// consumption component tables
    ///
    /// Unit rates are `(typical - nil) / typical_consumption`, with an
    /// undefined nil value counted as zero.
    pub fn from_component_tables(
        fuel: Fuel,
        payment_method: PaymentMethod,
        nil_rows: &[ComponentRow],
        typical_rows: &[ComponentRow],
        typical_consumption: Option<f64>,
    ) -> Result<Self> {
        let typical_consumption = typical_consumption.unwrap_or_else(|| fuel.typical_consumption());
        let nil_latest = loader::latest_components(nil_rows)?;
        let typical_latest = loader::latest_components(typical_rows)?;

        let mut nil = TariffComponents::default();
        let mut unit = TariffComponents::default();
        for component in Component::ALL {
            if component == Component::Levelisation && !payment_method.has_levelisation() {
                continue;
            }
            let nil_value = nil_latest.get(component);
            nil.set(component, nil_value);

            if let Some(typical) = typical_latest.get(component) {
                let standing = nil_value.filter(|v| !v.is_nan()).unwrap_or(0.0);
                unit.set(component, Some(divide(typical - standing, typical_consumption, "by typical consumption")?));
            }
        }

        Ok(Self::new(fuel, payment_method, nil, unit))
    }

    /// Overwrite the policy cost lines
    pub fn set_policy_costs(&mut self, nil: f64, unit: f64) {
        self.nil.pc = Some(nil);
        self.unit.pc = Some(unit);
    }

    /// Standing charge (£/year)
    pub fn calculate_nil_consumption(&self) -> f64 {
        self.nil.sum()
    }

    /// Consumption charge for `consumption` MWh
    pub fn calculate_variable_consumption(&self, consumption: f64) -> f64 {
        self.unit.defined().map(|rate| rate * consumption).sum()
    }

    /// Annual bill for `consumption` MWh
    ///
    /// Zero consumption means the household is not connected to this fuel, so
    /// no standing charge applies.
    pub fn calculate_total_consumption(&self, consumption: f64, vat: bool) -> f64 {
        let standing = if consumption > 0.0 { self.calculate_nil_consumption() } else { 0.0 };
        let total = standing + self.calculate_variable_consumption(consumption);
        if vat {
            total * (1.0 + VAT_RATE)
        } else {
            total
        }
    }

    /// Unit rate (£/MWh) excluding policy costs
    pub fn non_policy_unit_cost(&self) -> f64 {
        self.calculate_variable_consumption(1.0) - self.unit.pc.filter(|v| !v.is_nan()).unwrap_or(0.0)
    }

    /// Standing charge (£/year) excluding policy costs
    pub fn non_policy_standing_charge(&self) -> f64 {
        self.calculate_nil_consumption() - self.nil.pc.filter(|v| !v.is_nan()).unwrap_or(0.0)
    }
}

impl fmt::Display for Tariff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn total(levies: &[Levy], contribution: impl Fn(&Levy) -> f64) -> f64 {
    levies.iter().map(contribution).sum()
}

/// Electricity and gas tariffs for one payment method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffPair {
    pub electricity: Tariff,
    pub gas: Tariff,
}

impl TariffPair {
    pub fn new(electricity: Tariff, gas: Tariff) -> Self {
        Self { electricity, gas }
    }

    /// Replace both tariffs' policy costs with the levies' contributions
    pub fn apply_levies(&mut self, levies: &[Levy]) {
        self.electricity.set_policy_costs(
            total(levies, |l| l.calculate_fixed_levy(true, false)),
            total(levies, |l| l.calculate_variable_levy(1.0, 0.0)),
        );
        self.gas.set_policy_costs(
            total(levies, |l| l.calculate_fixed_levy(false, true)),
            total(levies, |l| l.calculate_variable_levy(0.0, 1.0)),
        );
    }

    /// Copy with policy costs taken from `levies`
    pub fn with_levies(&self, levies: &[Levy]) -> Self {
        let mut pair = self.clone();
        pair.apply_levies(levies);
        pair
    }

    /// Electricity to gas unit rate ratio
    pub fn unit_cost_ratio(&self) -> Result<f64> {
        divide(
            self.electricity.calculate_variable_consumption(1.0),
            self.gas.calculate_variable_consumption(1.0),
            "by gas unit cost",
        )
    }
}
