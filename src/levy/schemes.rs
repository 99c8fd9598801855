//! Scheme tables and the rate-derivation formulas that turn published scheme
//! parameters into a canonical levy
//!
//! Each scheme publishes one row per update. Factories pick the latest usable
//! row, derive a single rate and assemble a [`Levy`] with the scheme's
//! statutory charging structure:
//!
//! | Scheme | Fuel split         | Charging basis |
//! |--------|--------------------|----------------|
//! | RO     | 100% electricity   | variable       |
//! | AAHEDC | 100% electricity   | variable       |
//! | GGL    | 100% gas           | fixed          |
//! | WHD    | 50/50              | fixed          |
//! | ECO    | 50/50              | variable       |
//! | FIT    | 100% electricity   | variable       |

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

use super::{Levy, Scheme};
use crate::error::{divide, LevyError, Result};

/// Treat NaN the same as a missing value
fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan())
}

/// Latest row (by `key`) among rows accepted by `usable`
fn latest<'a, R, K: Ord>(
    rows: &'a [R],
    usable: impl Fn(&R) -> bool,
    key: impl Fn(&R) -> K,
) -> Option<&'a R> {
    rows.iter().filter(|row| usable(row)).max_by_key(|row| key(row))
}

/// Unit conversion constants tied to a scheme year's calendar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionFactors {
    /// p/kWh at GSP to £/MWh
    #[serde(default = "default_aahedc_tariff_scale")]
    pub aahedc_tariff_scale: f64,

    /// Days charged per scheme year (p/meter/day to £/meter/year)
    #[serde(default = "default_ggl_days_per_year")]
    pub ggl_days_per_year: f64,

    /// Days covered by the GGL backdated first-year charge
    #[serde(default = "default_ggl_backdated_days")]
    pub ggl_backdated_days: f64,
}

fn default_aahedc_tariff_scale() -> f64 { 10.0 }
fn default_ggl_days_per_year() -> f64 { 365.0 }
fn default_ggl_backdated_days() -> f64 { 122.0 }

impl Default for ConversionFactors {
    fn default() -> Self {
        Self {
            aahedc_tariff_scale: default_aahedc_tariff_scale(),
            ggl_days_per_year: default_ggl_days_per_year(),
            ggl_backdated_days: default_ggl_backdated_days(),
        }
    }
}

/// Renewables Obligation table row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoRow {
    #[serde(rename = "UpdateDate")]
    pub update_date: NaiveDate,
    #[serde(rename = "SchemeYear")]
    pub scheme_year: String,
    #[serde(rename = "ObligationLevel")]
    pub obligation_level: Option<f64>,
    #[serde(rename = "BuyOutPriceSchemeYear")]
    pub buy_out_price_scheme_year: Option<f64>,
    #[serde(rename = "BuyOutPricePreviousYear")]
    pub buy_out_price_previous_year: Option<f64>,
    #[serde(rename = "ForecastAnnualRPIPreviousYear")]
    pub forecast_annual_rpi_previous_year: Option<f64>,
}

/// AAHEDC table row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AahedcRow {
    #[serde(rename = "UpdateDate")]
    pub update_date: NaiveDate,
    #[serde(rename = "SchemeYear")]
    pub scheme_year: String,
    #[serde(rename = "TariffCurrentYear")]
    pub tariff_current_year: Option<f64>,
    #[serde(rename = "TariffPreviousYear")]
    pub tariff_previous_year: Option<f64>,
    #[serde(rename = "ForecastAnnualRPIPreviousYear")]
    pub forecast_annual_rpi_previous_year: Option<f64>,
}

/// Green Gas Levy table row (rates in p/meter/day)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GglRow {
    #[serde(rename = "UpdateDate")]
    pub update_date: NaiveDate,
    #[serde(rename = "SchemeYear")]
    pub scheme_year: String,
    #[serde(rename = "LevyRate")]
    pub levy_rate: Option<f64>,
    #[serde(rename = "BackdatedLevyRate")]
    pub backdated_levy_rate: Option<f64>,
}

/// Warm Home Discount table row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhdRow {
    #[serde(rename = "UpdateDate")]
    pub update_date: NaiveDate,
    #[serde(rename = "SchemeYear")]
    pub scheme_year: String,
    #[serde(rename = "TargetSpendingForSchemeYear")]
    pub target_spending_for_scheme_year: Option<f64>,
    #[serde(rename = "CoreSpending")]
    pub core_spending: Option<f64>,
    #[serde(rename = "NoncoreSpending")]
    pub noncore_spending: Option<f64>,
    #[serde(rename = "ObligatedSuppliersCustomerBase")]
    pub obligated_suppliers_customer_base: Option<f64>,
    #[serde(rename = "CompulsorySupplierFractionOfCoreGroup")]
    pub compulsory_supplier_fraction_of_core_group: Option<f64>,
}

/// Energy Company Obligation table row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcoRow {
    #[serde(rename = "UpdateDate")]
    pub update_date: NaiveDate,
    #[serde(rename = "SchemeYear")]
    pub scheme_year: String,
    #[serde(rename = "AnnualisedCostECO4Gas")]
    pub annualised_cost_eco4_gas: Option<f64>,
    #[serde(rename = "AnnualisedCostECO4Electricity")]
    pub annualised_cost_eco4_electricity: Option<f64>,
    #[serde(rename = "AnnualisedCostGBISGas")]
    pub annualised_cost_gbis_gas: Option<f64>,
    #[serde(rename = "AnnualisedCostGBISElectricity")]
    pub annualised_cost_gbis_electricity: Option<f64>,
    #[serde(rename = "GDPDeflatorToCurrentPricesECO4")]
    pub gdp_deflator_eco4: Option<f64>,
    #[serde(rename = "GDPDeflatorToCurrentPricesGBIS")]
    pub gdp_deflator_gbis: Option<f64>,
    #[serde(rename = "FullyObligatedShareOfObligatedSupplierSupplyGas")]
    pub fully_obligated_share_gas: Option<f64>,
    #[serde(rename = "FullyObligatedShareOfObligatedSupplierSupplyElectricity")]
    pub fully_obligated_share_electricity: Option<f64>,
    #[serde(rename = "ObligatedSupplierVolumeGas")]
    pub obligated_supplier_volume_gas: Option<f64>,
    #[serde(rename = "ObligatedSupplierVolumeElectricity")]
    pub obligated_supplier_volume_electricity: Option<f64>,
}

/// Feed-in Tariff levelisation table row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitRow {
    #[serde(rename = "ChargeRestrictionPeriod1")]
    pub charge_restriction_period_1: String,
    #[serde(rename = "ChargeRestrictionPeriod2")]
    pub charge_restriction_period_2: String,
    #[serde(rename = "ChargeRestrictionPeriod2_start")]
    pub charge_restriction_period_2_start: NaiveDate,
    #[serde(rename = "LookupPeriod")]
    pub lookup_period: String,
    #[serde(rename = "InflatedLevelisationFund")]
    pub inflated_levelisation_fund: Option<f64>,
    #[serde(rename = "TotalElectricitySupplied")]
    pub total_electricity_supplied: Option<f64>,
    #[serde(rename = "ExemptSupplyOutsideUK")]
    pub exempt_supply_outside_uk: Option<f64>,
    #[serde(rename = "ExemptSupplyEII")]
    pub exempt_supply_eii: Option<f64>,
}

/// The published row a levy was derived from, kept for audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum SchemeParameters {
    Ro(RoRow),
    Aahedc(AahedcRow),
    Ggl(GglRow),
    Whd(WhdRow),
    Eco(EcoRow),
    Fit(FitRow),
    /// Levy constructed by hand rather than from a scheme table
    #[default]
    Unspecified,
}

/// How a levy's total revenue is established
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueBasis {
    /// Total revenue in £, used as is
    #[serde(default)]
    pub revenue: Option<f64>,
    /// Consumption (MWh) or customer count the rate is multiplied by
    #[serde(default)]
    pub denominator: Option<f64>,
}

impl RevenueBasis {
    pub fn revenue(revenue: f64) -> Self {
        Self { revenue: Some(revenue), denominator: None }
    }

    pub fn denominator(denominator: f64) -> Self {
        Self { revenue: None, denominator: Some(denominator) }
    }

    fn require(&self, scheme: Scheme) -> Result<()> {
        if self.revenue.is_none() && self.denominator.is_none() {
            return Err(LevyError::MissingRevenueBasis { scheme });
        }
        Ok(())
    }

    fn resolve(&self, scheme: Scheme, rate: f64) -> Result<f64> {
        match (self.revenue, self.denominator) {
            (Some(revenue), _) => Ok(revenue),
            (None, Some(denominator)) => Ok(rate * denominator),
            (None, None) => Err(LevyError::MissingRevenueBasis { scheme }),
        }
    }
}

/// RO rate (£/MWh): obligation level (ROCs/MWh) times the buy-out price,
/// falling back to the previous year's price when the scheme year's is unpublished
pub fn renewables_obligation_rate(
    obligation_level: f64,
    buy_out_price_scheme_year: Option<f64>,
    buy_out_price_previous_year: Option<f64>,
) -> Result<f64> {
    match (present(buy_out_price_scheme_year), present(buy_out_price_previous_year)) {
        (Some(price), _) => Ok(obligation_level * price),
        (None, Some(price)) => Ok(obligation_level * price),
        (None, None) => Err(LevyError::InsufficientData {
            scheme: Scheme::Ro,
            fuel: "electricity",
        }),
    }
}

/// Previous year's AAHEDC tariff uprated by forecast RPI (p/kWh)
pub fn aahedc_tariff_forecast(
    tariff_previous_year: Option<f64>,
    forecast_annual_rpi_previous_year: Option<f64>,
) -> Option<f64> {
    let tariff = present(tariff_previous_year)?;
    let rpi = present(forecast_annual_rpi_previous_year)?;
    Some(tariff * (1.0 + rpi / 100.0))
}

/// AAHEDC rate (£/MWh) from the current tariff, or the forecast when unpublished
pub fn aahedc_rate(
    tariff_current_year: Option<f64>,
    tariff_forecast: Option<f64>,
    factors: &ConversionFactors,
) -> Result<f64> {
    present(tariff_current_year)
        .or(present(tariff_forecast))
        .map(|tariff| tariff * factors.aahedc_tariff_scale)
        .ok_or(LevyError::InsufficientData {
            scheme: Scheme::Aahedc,
            fuel: "electricity",
        })
}

/// GGL rate (£/meter/year), adding the backdated first-year charge when present
pub fn ggl_rate(levy_rate: f64, backdated_levy_rate: Option<f64>, factors: &ConversionFactors) -> f64 {
    let annual = levy_rate * factors.ggl_days_per_year / 100.0;
    match present(backdated_levy_rate) {
        Some(backdated) => annual + backdated * factors.ggl_backdated_days / 100.0,
        None => annual,
    }
}

/// WHD rate (£/customer): target spending over the obligated customer base,
/// or the core/non-core breakdown when core spending is published
pub fn whd_rate(
    target_spending_for_scheme_year: f64,
    core_spending: Option<f64>,
    noncore_spending: Option<f64>,
    obligated_suppliers_customer_base: f64,
    compulsory_supplier_fraction_of_core_group: Option<f64>,
) -> Result<f64> {
    let spending = match present(core_spending) {
        None => target_spending_for_scheme_year,
        Some(core) => {
            let insufficient = || LevyError::InsufficientData { scheme: Scheme::Whd, fuel: "customer" };
            let fraction = present(compulsory_supplier_fraction_of_core_group).ok_or_else(insufficient)?;
            let noncore = present(noncore_spending).ok_or_else(insufficient)?;
            core * fraction + noncore
        }
    };
    divide(spending, obligated_suppliers_customer_base, "by WHD obligated customer base")
}

/// ECO rate (£/MWh) for one fuel
///
/// Three combinations of published fields are supported:
/// 1. ECO4 and GBIS costs: both inflated and summed
/// 2. ECO4 cost without a fully obligated share: ECO4 inflated (GBIS ignored)
/// 3. ECO4 cost with a fully obligated share: share of ECO4 inflated
pub fn eco_rate(
    annualised_cost_eco4: Option<f64>,
    annualised_cost_gbis: Option<f64>,
    gdp_deflator_eco4: Option<f64>,
    gdp_deflator_gbis: Option<f64>,
    fully_obligated_share: Option<f64>,
    obligated_supplier_volume: Option<f64>,
    fuel: &'static str,
) -> Result<f64> {
    let insufficient = || LevyError::InsufficientData { scheme: Scheme::Eco, fuel };
    let inflate = |cost: f64, deflator: Option<f64>| cost * (1.0 + present(deflator).unwrap_or(0.0) / 100.0);

    let eco4 = present(annualised_cost_eco4).ok_or_else(insufficient)?;
    let cost = match (present(annualised_cost_gbis), present(fully_obligated_share)) {
        (Some(gbis), _) => inflate(eco4, gdp_deflator_eco4) + inflate(gbis, gdp_deflator_gbis),
        (None, None) => inflate(eco4, gdp_deflator_eco4),
        (None, Some(share)) => inflate(eco4 * share, gdp_deflator_eco4),
    };
    let volume = present(obligated_supplier_volume).ok_or_else(insufficient)?;
    divide(cost, volume, "by ECO obligated supplier volume")
}

/// FIT rate (£/MWh): inflated levelisation fund over non-exempt supply
pub fn feed_in_tariff_rate(
    inflated_levelisation_fund: f64,
    total_electricity_supplied: f64,
    exempt_supply_outside_uk: Option<f64>,
    exempt_supply_eii: Option<f64>,
) -> Result<f64> {
    let chargeable = total_electricity_supplied
        - present(exempt_supply_outside_uk).unwrap_or(0.0)
        - present(exempt_supply_eii).unwrap_or(0.0);
    divide(inflated_levelisation_fund, chargeable, "by FIT chargeable supply")
}

impl Levy {
    /// Levy with no charging structure; factories fill in the scheme's shape
    fn unweighted(scheme: Scheme, revenue: f64, parameters: SchemeParameters) -> Self {
        Self {
            name: scheme.name().to_string(),
            scheme,
            electricity_weight: 0.0,
            gas_weight: 0.0,
            tax_weight: 0.0,
            electricity_variable_weight: 0.0,
            electricity_fixed_weight: 0.0,
            gas_variable_weight: 0.0,
            gas_fixed_weight: 0.0,
            electricity_variable_rate: 0.0,
            electricity_fixed_rate: 0.0,
            gas_variable_rate: 0.0,
            gas_fixed_rate: 0.0,
            general_taxation: 0.0,
            revenue,
            parameters,
        }
    }

    /// Electricity-only, per-MWh levy
    fn electricity_variable(scheme: Scheme, rate: f64, revenue: f64, parameters: SchemeParameters) -> Self {
        let mut levy = Self::unweighted(scheme, revenue, parameters);
        levy.electricity_weight = 1.0;
        levy.electricity_variable_weight = 1.0;
        levy.electricity_variable_rate = rate;
        levy
    }

    /// Build the Renewables Obligation levy from its scheme table
    pub fn renewables_obligation(rows: &[RoRow], basis: RevenueBasis) -> Result<Self> {
        basis.require(Scheme::Ro)?;
        let row = latest(rows, |r| present(r.obligation_level).is_some(), |r| r.update_date)
            .ok_or(LevyError::EmptyTable(Scheme::Ro))?;

        let obligation_level = present(row.obligation_level).ok_or(LevyError::EmptyTable(Scheme::Ro))?;
        let rate = renewables_obligation_rate(
            obligation_level,
            row.buy_out_price_scheme_year,
            row.buy_out_price_previous_year,
        )?;
        let revenue = basis.resolve(Scheme::Ro, rate)?;
        debug!("ro: {} update {} rate {:.4} £/MWh", row.scheme_year, row.update_date, rate);

        Ok(Self::electricity_variable(Scheme::Ro, rate, revenue, SchemeParameters::Ro(row.clone())))
    }

    /// Build the AAHEDC levy from its scheme table
    pub fn aahedc(rows: &[AahedcRow], basis: RevenueBasis, factors: &ConversionFactors) -> Result<Self> {
        basis.require(Scheme::Aahedc)?;
        let row = latest(
            rows,
            |r| present(r.tariff_current_year).or(present(r.tariff_previous_year)).is_some(),
            |r| r.update_date,
        )
        .ok_or(LevyError::EmptyTable(Scheme::Aahedc))?;

        let forecast = aahedc_tariff_forecast(row.tariff_previous_year, row.forecast_annual_rpi_previous_year);
        let rate = aahedc_rate(row.tariff_current_year, forecast, factors)?;
        let revenue = basis.resolve(Scheme::Aahedc, rate)?;
        debug!("aahedc: {} update {} rate {:.4} £/MWh", row.scheme_year, row.update_date, rate);

        Ok(Self::electricity_variable(Scheme::Aahedc, rate, revenue, SchemeParameters::Aahedc(row.clone())))
    }

    /// Build the Green Gas Levy from its scheme table
    pub fn green_gas_levy(rows: &[GglRow], basis: RevenueBasis, factors: &ConversionFactors) -> Result<Self> {
        basis.require(Scheme::Ggl)?;
        let row = latest(rows, |r| present(r.levy_rate).is_some(), |r| r.update_date)
            .ok_or(LevyError::EmptyTable(Scheme::Ggl))?;

        let levy_rate = present(row.levy_rate).ok_or(LevyError::EmptyTable(Scheme::Ggl))?;
        let rate = ggl_rate(levy_rate, row.backdated_levy_rate, factors);
        let revenue = basis.resolve(Scheme::Ggl, rate)?;
        debug!("ggl: {} update {} rate {:.4} £/meter", row.scheme_year, row.update_date, rate);

        let mut levy = Self::unweighted(Scheme::Ggl, revenue, SchemeParameters::Ggl(row.clone()));
        levy.gas_weight = 1.0;
        levy.gas_fixed_weight = 1.0;
        levy.gas_fixed_rate = rate;
        Ok(levy)
    }

    /// Build the Warm Home Discount levy; revenue defaults to the target spending
    pub fn warm_home_discount(rows: &[WhdRow], revenue: Option<f64>) -> Result<Self> {
        let row = latest(
            rows,
            |r| present(r.target_spending_for_scheme_year).is_some(),
            |r| r.update_date,
        )
        .ok_or(LevyError::EmptyTable(Scheme::Whd))?;

        let target = present(row.target_spending_for_scheme_year).ok_or(LevyError::EmptyTable(Scheme::Whd))?;
        let customer_base = present(row.obligated_suppliers_customer_base).ok_or(LevyError::InsufficientData {
            scheme: Scheme::Whd,
            fuel: "customer",
        })?;
        let rate = whd_rate(
            target,
            row.core_spending,
            row.noncore_spending,
            customer_base,
            row.compulsory_supplier_fraction_of_core_group,
        )?;
        debug!("whd: {} update {} rate {:.4} £/customer", row.scheme_year, row.update_date, rate);

        let mut levy = Self::unweighted(Scheme::Whd, revenue.unwrap_or(target), SchemeParameters::Whd(row.clone()));
        levy.electricity_weight = 0.5;
        levy.gas_weight = 0.5;
        levy.electricity_fixed_weight = 1.0;
        levy.gas_fixed_weight = 1.0;
        levy.electricity_fixed_rate = rate;
        levy.gas_fixed_rate = rate;
        Ok(levy)
    }

    /// Build the Energy Company Obligation levy; revenue defaults to the sum
    /// of the annualised ECO4 and GBIS costs
    pub fn energy_company_obligation(rows: &[EcoRow], revenue: Option<f64>) -> Result<Self> {
        let row = latest(rows, |r| present(r.annualised_cost_eco4_gas).is_some(), |r| r.update_date)
            .ok_or(LevyError::EmptyTable(Scheme::Eco))?;

        let gas_rate = eco_rate(
            row.annualised_cost_eco4_gas,
            row.annualised_cost_gbis_gas,
            row.gdp_deflator_eco4,
            row.gdp_deflator_gbis,
            row.fully_obligated_share_gas,
            row.obligated_supplier_volume_gas,
            "gas",
        )?;
        let electricity_rate = eco_rate(
            row.annualised_cost_eco4_electricity,
            row.annualised_cost_gbis_electricity,
            row.gdp_deflator_eco4,
            row.gdp_deflator_gbis,
            row.fully_obligated_share_electricity,
            row.obligated_supplier_volume_electricity,
            "electricity",
        )?;
        let revenue = revenue.unwrap_or_else(|| {
            [
                row.annualised_cost_eco4_gas,
                row.annualised_cost_eco4_electricity,
                row.annualised_cost_gbis_gas,
                row.annualised_cost_gbis_electricity,
            ]
            .into_iter()
            .filter_map(present)
            .sum()
        });
        debug!(
            "eco: {} update {} rates {:.4} (electricity) {:.4} (gas) £/MWh",
            row.scheme_year, row.update_date, electricity_rate, gas_rate
        );

        let mut levy = Self::unweighted(Scheme::Eco, revenue, SchemeParameters::Eco(row.clone()));
        levy.electricity_weight = 0.5;
        levy.gas_weight = 0.5;
        levy.electricity_variable_weight = 1.0;
        levy.gas_variable_weight = 1.0;
        levy.electricity_variable_rate = electricity_rate;
        levy.gas_variable_rate = gas_rate;
        Ok(levy)
    }

    /// Build the Feed-in Tariff levy; revenue defaults to the levelisation fund
    pub fn feed_in_tariff(rows: &[FitRow], revenue: Option<f64>) -> Result<Self> {
        let row = latest(
            rows,
            |r| present(r.total_electricity_supplied).is_some(),
            |r| r.charge_restriction_period_2_start,
        )
        .ok_or(LevyError::EmptyTable(Scheme::Fit))?;

        let fund = present(row.inflated_levelisation_fund).ok_or(LevyError::InsufficientData {
            scheme: Scheme::Fit,
            fuel: "electricity",
        })?;
        let supplied = present(row.total_electricity_supplied).ok_or(LevyError::EmptyTable(Scheme::Fit))?;
        let rate = feed_in_tariff_rate(fund, supplied, row.exempt_supply_outside_uk, row.exempt_supply_eii)?;
        debug!("fit: period {} rate {:.4} £/MWh", row.charge_restriction_period_2, rate);

        Ok(Self::electricity_variable(
            Scheme::Fit,
            rate,
            revenue.unwrap_or(fund),
            SchemeParameters::Fit(row.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ro_row(update: NaiveDate, level: Option<f64>, price: Option<f64>, previous: Option<f64>) -> RoRow {
        RoRow {
            update_date: update,
            scheme_year: "2024-25".to_string(),
            obligation_level: level,
            buy_out_price_scheme_year: price,
            buy_out_price_previous_year: previous,
            forecast_annual_rpi_previous_year: None,
        }
    }

    fn whd_row(target: f64, core: Option<f64>) -> WhdRow {
        WhdRow {
            update_date: date(2024, 4, 1),
            scheme_year: "2024-25".to_string(),
            target_spending_for_scheme_year: Some(target),
            core_spending: core,
            noncore_spending: Some(100_000_000.0),
            obligated_suppliers_customer_base: Some(25_000_000.0),
            compulsory_supplier_fraction_of_core_group: Some(0.9),
        }
    }

    fn eco_row() -> EcoRow {
        EcoRow {
            update_date: date(2024, 4, 1),
            scheme_year: "2024-25".to_string(),
            annualised_cost_eco4_gas: Some(600.0),
            annualised_cost_eco4_electricity: Some(400.0),
            annualised_cost_gbis_gas: None,
            annualised_cost_gbis_electricity: None,
            gdp_deflator_eco4: Some(10.0),
            gdp_deflator_gbis: Some(5.0),
            fully_obligated_share_gas: None,
            fully_obligated_share_electricity: None,
            obligated_supplier_volume_gas: Some(10.0),
            obligated_supplier_volume_electricity: Some(4.0),
        }
    }

    #[test]
    fn test_ro_rate_uses_scheme_year_price() {
        let rate = renewables_obligation_rate(43.98, Some(70.17), Some(65.20)).unwrap();
        assert_abs_diff_eq!(rate, 3086.0766, epsilon = 1e-6);
        assert_abs_diff_eq!(rate, 43.98 * 70.17, epsilon = 0.01);
    }

    #[test]
    fn test_ro_rate_falls_back_to_previous_year() {
        let rate = renewables_obligation_rate(43.98, Some(f64::NAN), Some(65.20)).unwrap();
        assert_abs_diff_eq!(rate, 2867.496, epsilon = 0.01);

        let rate = renewables_obligation_rate(43.98, None, Some(65.20)).unwrap();
        assert_abs_diff_eq!(rate, 43.98 * 65.20, epsilon = 1e-9);
    }

    #[test]
    fn test_aahedc_rate_branches() {
        let factors = ConversionFactors::default();
        let forecast = aahedc_tariff_forecast(Some(0.5), Some(4.0));
        assert_abs_diff_eq!(forecast.unwrap(), 0.52, epsilon = 1e-12);

        // Current tariff published
        assert_abs_diff_eq!(aahedc_rate(Some(0.6), forecast, &factors).unwrap(), 6.0, epsilon = 1e-12);
        // Fall back to forecast
        assert_abs_diff_eq!(aahedc_rate(None, forecast, &factors).unwrap(), 5.2, epsilon = 1e-12);
        assert!(aahedc_rate(None, None, &factors).is_err());
    }

    #[test]
    fn test_ggl_rate() {
        let factors = ConversionFactors::default();
        assert_abs_diff_eq!(ggl_rate(0.524, None, &factors), 1.9126, epsilon = 1e-9);
        assert_abs_diff_eq!(ggl_rate(0.524, Some(f64::NAN), &factors), 1.9126, epsilon = 1e-9);
        assert_abs_diff_eq!(ggl_rate(0.524, Some(0.15), &factors), 2.0956, epsilon = 1e-9);
    }

    #[test]
    fn test_ggl_rate_with_custom_day_count() {
        let factors = ConversionFactors { ggl_days_per_year: 366.0, ..Default::default() };
        assert_abs_diff_eq!(ggl_rate(1.0, None, &factors), 3.66, epsilon = 1e-12);
    }

    #[test]
    fn test_whd_rate_branches() {
        let target_only = whd_rate(500_000_000.0, None, Some(1.0), 25_000_000.0, Some(0.9)).unwrap();
        assert_abs_diff_eq!(target_only, 20.0, epsilon = 1e-12);

        // ((300m * 0.9) + 100m) / 25m = 14.8
        let core = whd_rate(500_000_000.0, Some(300_000_000.0), Some(100_000_000.0), 25_000_000.0, Some(0.9)).unwrap();
        assert_abs_diff_eq!(core, 14.8, epsilon = 1e-12);
    }

    #[test]
    fn test_eco_branch_one_sums_independently_inflated_costs() {
        let rate = eco_rate(Some(100.0), Some(50.0), Some(10.0), Some(20.0), None, Some(10.0), "gas").unwrap();
        assert_abs_diff_eq!(rate, (110.0 + 60.0) / 10.0, epsilon = 1e-12);

        // A share does not change the first branch
        let with_share = eco_rate(Some(100.0), Some(50.0), Some(10.0), Some(20.0), Some(0.5), Some(10.0), "gas").unwrap();
        assert_abs_diff_eq!(with_share, rate, epsilon = 1e-12);
    }

    #[test]
    fn test_eco_branch_two_ignores_share_multiplier() {
        let rate = eco_rate(Some(100.0), None, Some(10.0), None, Some(f64::NAN), Some(10.0), "gas").unwrap();
        assert_abs_diff_eq!(rate, 11.0, epsilon = 1e-12);
    }

    #[test]
    fn test_eco_branch_three_applies_share_and_default_deflator() {
        let rate = eco_rate(Some(100.0), None, None, None, Some(0.8), Some(10.0), "electricity").unwrap();
        assert_abs_diff_eq!(rate, 8.0, epsilon = 1e-12);

        let inflated = eco_rate(Some(100.0), None, Some(10.0), None, Some(0.8), Some(10.0), "electricity").unwrap();
        assert_abs_diff_eq!(inflated, 8.8, epsilon = 1e-12);
    }

    #[test]
    fn test_eco_insufficient_data() {
        let err = eco_rate(None, Some(50.0), None, None, None, Some(10.0), "gas").unwrap_err();
        assert!(matches!(err, LevyError::InsufficientData { scheme: Scheme::Eco, fuel: "gas" }));
    }

    #[test]
    fn test_fit_rate() {
        let rate = feed_in_tariff_rate(700.0, 100.0, Some(20.0), Some(10.0)).unwrap();
        assert_abs_diff_eq!(rate, 10.0, epsilon = 1e-12);
        assert!(matches!(
            feed_in_tariff_rate(700.0, 30.0, Some(20.0), Some(10.0)),
            Err(LevyError::ZeroDenominator(_))
        ));
    }

    #[test]
    fn test_ro_factory_selects_latest_row_with_obligation() {
        let rows = vec![
            ro_row(date(2023, 4, 1), Some(40.0), Some(60.0), None),
            ro_row(date(2024, 4, 1), Some(43.98), Some(70.17), Some(65.20)),
            ro_row(date(2024, 10, 1), None, Some(80.0), None),
        ];
        let levy = Levy::renewables_obligation(&rows, RevenueBasis::denominator(1000.0)).unwrap();

        assert_eq!(levy.scheme, Scheme::Ro);
        assert_abs_diff_eq!(levy.electricity_variable_rate, 43.98 * 70.17, epsilon = 1e-9);
        assert_abs_diff_eq!(levy.revenue, 43.98 * 70.17 * 1000.0, epsilon = 1e-6);
        assert_eq!(levy.electricity_weight, 1.0);
        assert_eq!(levy.electricity_variable_weight, 1.0);
        assert_eq!(levy.gas_weight, 0.0);
        match &levy.parameters {
            SchemeParameters::Ro(row) => assert_eq!(row.update_date, date(2024, 4, 1)),
            other => panic!("unexpected parameters {:?}", other),
        }
    }

    #[test]
    fn test_factory_requires_revenue_or_denominator() {
        let rows = vec![ro_row(date(2024, 4, 1), Some(43.98), Some(70.17), None)];
        let err = Levy::renewables_obligation(&rows, RevenueBasis::default()).unwrap_err();
        assert!(matches!(err, LevyError::MissingRevenueBasis { scheme: Scheme::Ro }));

        let ggl = Levy::green_gas_levy(&[], RevenueBasis::default(), &ConversionFactors::default()).unwrap_err();
        assert!(matches!(ggl, LevyError::MissingRevenueBasis { scheme: Scheme::Ggl }));
    }

    #[test]
    fn test_supplied_revenue_takes_precedence() {
        let rows = vec![ro_row(date(2024, 4, 1), Some(43.98), Some(70.17), None)];
        let basis = RevenueBasis { revenue: Some(5.0), denominator: Some(1000.0) };
        let levy = Levy::renewables_obligation(&rows, basis).unwrap();
        assert_eq!(levy.revenue, 5.0);
    }

    #[test]
    fn test_empty_table() {
        let rows = vec![ro_row(date(2024, 4, 1), None, Some(70.17), None)];
        let err = Levy::renewables_obligation(&rows, RevenueBasis::revenue(1.0)).unwrap_err();
        assert!(matches!(err, LevyError::EmptyTable(Scheme::Ro)));
    }

    #[test]
    fn test_whd_factory_end_to_end() {
        let levy = Levy::warm_home_discount(&[whd_row(500_000_000.0, Some(f64::NAN))], None).unwrap();

        assert_abs_diff_eq!(levy.electricity_fixed_rate, 20.0, epsilon = 1e-12);
        assert_abs_diff_eq!(levy.gas_fixed_rate, 20.0, epsilon = 1e-12);
        assert_eq!(levy.revenue, 500_000_000.0);
        assert_eq!((levy.electricity_weight, levy.gas_weight), (0.5, 0.5));
        assert_eq!((levy.electricity_fixed_weight, levy.gas_fixed_weight), (1.0, 1.0));
    }

    #[test]
    fn test_eco_factory_revenue_and_rates() {
        let levy = Levy::energy_company_obligation(&[eco_row()], None).unwrap();

        assert_abs_diff_eq!(levy.gas_variable_rate, 660.0 / 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(levy.electricity_variable_rate, 440.0 / 4.0, epsilon = 1e-9);
        // Absent GBIS costs contribute nothing
        assert_abs_diff_eq!(levy.revenue, 1000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_aahedc_factory_accepts_previous_year_only_rows() {
        let rows = vec![AahedcRow {
            update_date: date(2024, 1, 1),
            scheme_year: "2024-25".to_string(),
            tariff_current_year: None,
            tariff_previous_year: Some(0.5),
            forecast_annual_rpi_previous_year: Some(4.0),
        }];
        let levy = Levy::aahedc(&rows, RevenueBasis::denominator(100.0), &ConversionFactors::default()).unwrap();
        assert_abs_diff_eq!(levy.electricity_variable_rate, 5.2, epsilon = 1e-12);
        assert_abs_diff_eq!(levy.revenue, 520.0, epsilon = 1e-9);
    }

    #[test]
    fn test_fit_factory_uses_latest_charge_period() {
        let row = |start: NaiveDate, fund: f64| FitRow {
            charge_restriction_period_1: "Oct-Dec".to_string(),
            charge_restriction_period_2: "Jan-Mar".to_string(),
            charge_restriction_period_2_start: start,
            lookup_period: "2023".to_string(),
            inflated_levelisation_fund: Some(fund),
            total_electricity_supplied: Some(100.0),
            exempt_supply_outside_uk: Some(0.0),
            exempt_supply_eii: Some(0.0),
        };
        let rows = vec![row(date(2024, 1, 1), 500.0), row(date(2024, 4, 1), 700.0)];
        let levy = Levy::feed_in_tariff(&rows, None).unwrap();

        assert_abs_diff_eq!(levy.electricity_variable_rate, 7.0, epsilon = 1e-12);
        assert_eq!(levy.revenue, 700.0);
    }
}
