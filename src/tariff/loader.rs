//! Load tidy tariff component tables
//!
//! One file per fuel, payment method and consumption level, named
//! `{fuel}_{method}_{nil|typical}.csv`, e.g. `gas_ppm_typical.csv`.

use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{Component, Fuel, PaymentMethod, Tariff, TariffComponents, TariffPair};
use crate::error::{LevyError, Result};
use crate::levy::loader::{read_rows, read_rows_from_path};

/// Default path to the tariff tables directory
pub const DEFAULT_TARIFF_TABLES_PATH: &str = "data/tariffs";

/// One component value for one charge restriction period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRow {
    #[serde(rename = "Component")]
    pub component: String,
    #[serde(rename = "PeriodStart")]
    pub period_start: NaiveDate,
    #[serde(rename = "Value")]
    pub value: Option<f64>,
}

/// Load component rows from a CSV file
pub fn load_component_rows(path: &Path) -> Result<Vec<ComponentRow>> {
    read_rows_from_path(path)
}

/// Load component rows from any reader
pub fn load_component_rows_from_reader<R: std::io::Read>(reader: R) -> Result<Vec<ComponentRow>> {
    read_rows(reader)
}

/// Components of the latest charge restriction period
///
/// Rows with an unrecognised component code (totals, notes) are ignored.
pub(crate) fn latest_components(rows: &[ComponentRow]) -> Result<TariffComponents> {
    let latest = rows
        .iter()
        .map(|row| row.period_start)
        .max()
        .ok_or(LevyError::EmptyComponentTable)?;

    let mut components = TariffComponents::default();
    for row in rows.iter().filter(|row| row.period_start == latest) {
        match Component::from_code(&row.component) {
            Some(component) => components.set(component, row.value),
            None => debug!("Ignoring tariff component row '{}'", row.component),
        }
    }
    Ok(components)
}

fn table_path(dir: &Path, fuel: Fuel, method: PaymentMethod, level: &str) -> std::path::PathBuf {
    dir.join(format!("{}_{}_{}.csv", fuel, method.key(), level))
}

fn load_tariff(dir: &Path, fuel: Fuel, method: PaymentMethod) -> Result<Tariff> {
    let nil = load_component_rows(&table_path(dir, fuel, method, "nil"))?;
    let typical = load_component_rows(&table_path(dir, fuel, method, "typical"))?;
    Tariff::from_component_tables(fuel, method, &nil, &typical, None)
}

/// Load the electricity and gas tariffs for a payment method
pub fn load_tariff_pair(dir: &Path, method: PaymentMethod) -> Result<TariffPair> {
    let pair = TariffPair::new(
        load_tariff(dir, Fuel::Electricity, method)?,
        load_tariff(dir, Fuel::Gas, method)?,
    );
    info!("Loaded {} tariffs from {}", method.label(), dir.display());
    Ok(pair)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    pub(crate) const ELECTRICITY_NIL_CSV: &str = "\
Component,PeriodStart,Value
DF,2024-04-01,0.0
NC,2024-04-01,100.0
OC,2024-04-01,80.0
PC,2024-04-01,5.0
DF,2024-07-01,0.0
NC,2024-07-01,110.0
OC,2024-07-01,85.0
PC,2024-07-01,6.0
Levelisation ,2024-07-01,
Total,2024-07-01,201.0
";

    pub(crate) const ELECTRICITY_TYPICAL_CSV: &str = "\
Component,PeriodStart,Value
DF,2024-04-01,200.0
NC,2024-04-01,180.0
OC,2024-04-01,130.0
PC,2024-04-01,110.0
DF,2024-07-01,216.0
NC,2024-07-01,191.0
OC,2024-07-01,139.5
PC,2024-07-01,114.0
Levelisation ,2024-07-01,2.7
";

    pub(crate) const GAS_NIL_CSV: &str = "\
Component,PeriodStart,Value
DF,2024-07-01,0.0
NC,2024-07-01,70.0
OC,2024-07-01,40.0
PC,2024-07-01,
";

    pub(crate) const GAS_TYPICAL_CSV: &str = "\
Component,PeriodStart,Value
DF,2024-07-01,345.0
NC,2024-07-01,127.5
OC,2024-07-01,74.5
PC,2024-07-01,23.0
";

    pub(crate) fn fixture_pair(method: PaymentMethod) -> TariffPair {
        let rows = |csv: &str| load_component_rows_from_reader(csv.as_bytes()).unwrap();
        TariffPair::new(
            Tariff::from_component_tables(
                Fuel::Electricity,
                method,
                &rows(ELECTRICITY_NIL_CSV),
                &rows(ELECTRICITY_TYPICAL_CSV),
                None,
            )
            .unwrap(),
            Tariff::from_component_tables(Fuel::Gas, method, &rows(GAS_NIL_CSV), &rows(GAS_TYPICAL_CSV), None)
                .unwrap(),
        )
    }

    #[test]
    fn test_latest_period_selected() {
        let rows = load_component_rows_from_reader(ELECTRICITY_NIL_CSV.as_bytes()).unwrap();
        let components = latest_components(&rows).unwrap();
        assert_eq!(components.nc, Some(110.0));
        assert_eq!(components.pc, Some(6.0));
        assert_eq!(components.cm, None);
        assert_eq!(components.levelisation, None);
    }

    #[test]
    fn test_unit_rates_from_typical_consumption() {
        let pair = fixture_pair(PaymentMethod::StandardCredit);
        let electricity = &pair.electricity;

        // (191 - 110) / 2.7
        assert_abs_diff_eq!(electricity.unit.nc.unwrap(), 30.0, epsilon = 1e-9);
        assert_abs_diff_eq!(electricity.unit.df.unwrap(), 80.0, epsilon = 1e-9);
        assert_abs_diff_eq!(electricity.unit.pc.unwrap(), 40.0, epsilon = 1e-9);
        assert_eq!(electricity.unit.levelisation, None);

        // Undefined nil policy cost counts as zero: 23 / 11.5
        assert_abs_diff_eq!(pair.gas.unit.pc.unwrap(), 2.0, epsilon = 1e-9);
        assert_eq!(pair.gas.nil.pc, None);
        assert_eq!(pair.gas.name, "Standard Credit. Gas");
    }

    #[test]
    fn test_levelisation_kept_for_other_payment_methods() {
        let pair = fixture_pair(PaymentMethod::Prepayment);
        assert_abs_diff_eq!(pair.electricity.unit.levelisation.unwrap(), 1.0, epsilon = 1e-9);
        assert_eq!(pair.electricity.nil.levelisation, None);
        assert_eq!(pair.electricity.name, "PPM. Electricity Single-Rate Metering Arrangement");
    }

    #[test]
    fn test_empty_component_table() {
        let err = latest_components(&[]).unwrap_err();
        assert!(matches!(err, LevyError::EmptyComponentTable));
    }
}
