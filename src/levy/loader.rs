//! Load tidy scheme tables from CSV and build the levy catalogue
//!
//! Expects one file per scheme in the tables directory:
//! `ro.csv`, `aahedc.csv`, `ggl.csv`, `whd.csv`, `eco.csv`, `fit.csv`.

use csv::Reader;
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

use super::{AahedcRow, ConversionFactors, EcoRow, FitRow, GglRow, Levy, RevenueBasis, RoRow, Scheme, WhdRow};
use crate::error::Result;

/// Default path to the scheme tables directory
pub const DEFAULT_SCHEME_TABLES_PATH: &str = "data/schemes";

/// Deserialize every row of a CSV source
pub(crate) fn read_rows<T: DeserializeOwned, R: Read>(reader: R) -> Result<Vec<T>> {
    deserialize_rows(Reader::from_reader(reader))
}

pub(crate) fn read_rows_from_path<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    deserialize_rows(Reader::from_path(path)?)
}

fn deserialize_rows<T: DeserializeOwned, R: Read>(mut csv_reader: Reader<R>) -> Result<Vec<T>> {
    let mut rows = Vec::new();
    for result in csv_reader.deserialize() {
        let row: T = result?;
        rows.push(row);
    }
    Ok(rows)
}

/// Load the Renewables Obligation table
pub fn load_ro_table(path: &Path) -> Result<Vec<RoRow>> {
    read_rows_from_path(path)
}

/// Load the AAHEDC table
pub fn load_aahedc_table(path: &Path) -> Result<Vec<AahedcRow>> {
    read_rows_from_path(path)
}

/// Load the Green Gas Levy table
pub fn load_ggl_table(path: &Path) -> Result<Vec<GglRow>> {
    read_rows_from_path(path)
}

/// Load the Warm Home Discount table
pub fn load_whd_table(path: &Path) -> Result<Vec<WhdRow>> {
    read_rows_from_path(path)
}

/// Load the Energy Company Obligation table
pub fn load_eco_table(path: &Path) -> Result<Vec<EcoRow>> {
    read_rows_from_path(path)
}

/// Load the Feed-in Tariff levelisation table
pub fn load_fit_table(path: &Path) -> Result<Vec<FitRow>> {
    read_rows_from_path(path)
}

/// All six scheme tables
#[derive(Debug, Clone, Default)]
pub struct SchemeTables {
    pub ro: Vec<RoRow>,
    pub aahedc: Vec<AahedcRow>,
    pub ggl: Vec<GglRow>,
    pub whd: Vec<WhdRow>,
    pub eco: Vec<EcoRow>,
    pub fit: Vec<FitRow>,
}

impl SchemeTables {
    /// Load all tables from the default path
    pub fn load_default() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_SCHEME_TABLES_PATH))
    }

    /// Load all tables from a specific directory
    pub fn load_from(path: &Path) -> Result<Self> {
        let tables = Self {
            ro: load_ro_table(&path.join("ro.csv"))?,
            aahedc: load_aahedc_table(&path.join("aahedc.csv"))?,
            ggl: load_ggl_table(&path.join("ggl.csv"))?,
            whd: load_whd_table(&path.join("whd.csv"))?,
            eco: load_eco_table(&path.join("eco.csv"))?,
            fit: load_fit_table(&path.join("fit.csv"))?,
        };
        info!(
            "Loaded scheme tables from {} (ro {}, aahedc {}, ggl {}, whd {}, eco {}, fit {} rows)",
            path.display(),
            tables.ro.len(),
            tables.aahedc.len(),
            tables.ggl.len(),
            tables.whd.len(),
            tables.eco.len(),
            tables.fit.len(),
        );
        Ok(tables)
    }
}

/// Revenue and denominator inputs for each scheme factory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevyInputs {
    #[serde(default = "default_ro")]
    pub ro: RevenueBasis,
    #[serde(default = "default_aahedc")]
    pub aahedc: RevenueBasis,
    #[serde(default = "default_ggl")]
    pub ggl: RevenueBasis,
    /// Defaults to the scheme year's target spending
    #[serde(default)]
    pub whd_revenue: Option<f64>,
    /// Defaults to the sum of the annualised costs
    #[serde(default)]
    pub eco_revenue: Option<f64>,
    #[serde(default = "default_fit_revenue")]
    pub fit_revenue: Option<f64>,
}

/// Domestic electricity supply (MWh)
fn default_ro() -> RevenueBasis { RevenueBasis::denominator(94_200_366.0) }
fn default_aahedc() -> RevenueBasis { RevenueBasis::denominator(94_200_366.0) }
/// Domestic gas customers
fn default_ggl() -> RevenueBasis { RevenueBasis::denominator(24_503_683.0) }
fn default_fit_revenue() -> Option<f64> { Some(689_233_317.0) }

impl Default for LevyInputs {
    fn default() -> Self {
        Self {
            ro: default_ro(),
            aahedc: default_aahedc(),
            ggl: default_ggl(),
            whd_revenue: None,
            eco_revenue: None,
            fit_revenue: default_fit_revenue(),
        }
    }
}

/// Build one scheme's levy from its table
pub fn build_levy(
    scheme: Scheme,
    tables: &SchemeTables,
    inputs: &LevyInputs,
    factors: &ConversionFactors,
) -> Result<Levy> {
    match scheme {
        Scheme::Ro => Levy::renewables_obligation(&tables.ro, inputs.ro),
        Scheme::Aahedc => Levy::aahedc(&tables.aahedc, inputs.aahedc, factors),
        Scheme::Ggl => Levy::green_gas_levy(&tables.ggl, inputs.ggl, factors),
        Scheme::Whd => Levy::warm_home_discount(&tables.whd, inputs.whd_revenue),
        Scheme::Eco => Levy::energy_company_obligation(&tables.eco, inputs.eco_revenue),
        Scheme::Fit => Levy::feed_in_tariff(&tables.fit, inputs.fit_revenue),
    }
}

/// Build all six levies, failing on the first scheme that cannot be built
pub fn build_levies(tables: &SchemeTables, inputs: &LevyInputs, factors: &ConversionFactors) -> Result<Vec<Levy>> {
    Scheme::ALL
        .iter()
        .map(|&scheme| build_levy(scheme, tables, inputs, factors))
        .collect()
}

/// Build every levy that can be built; failures are logged and skipped
pub fn build_levies_lenient(tables: &SchemeTables, inputs: &LevyInputs, factors: &ConversionFactors) -> Vec<Levy> {
    Scheme::ALL
        .iter()
        .filter_map(|&scheme| match build_levy(scheme, tables, inputs, factors) {
            Ok(levy) => Some(levy),
            Err(e) => {
                warn!("Skipping {}: {}", scheme, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::LevyError;
    use approx::assert_abs_diff_eq;

    pub(crate) const RO_CSV: &str = "\
UpdateDate,SchemeYear,ObligationLevel,BuyOutPriceSchemeYear,BuyOutPricePreviousYear,ForecastAnnualRPIPreviousYear
2023-10-01,2024-25,0.491,,64.73,3.0
2024-01-15,2024-25,0.491,66.08,64.73,
";

    pub(crate) const AAHEDC_CSV: &str = "\
UpdateDate,SchemeYear,TariffCurrentYear,TariffPreviousYear,ForecastAnnualRPIPreviousYear
2024-01-01,2024-25,,0.0256,4.0
";

    pub(crate) const GGL_CSV: &str = "\
UpdateDate,SchemeYear,LevyRate,BackdatedLevyRate
2023-01-01,2023-24,0.524,0.15
2024-01-01,2024-25,0.496,
";

    pub(crate) const WHD_CSV: &str = "\
UpdateDate,SchemeYear,TargetSpendingForSchemeYear,CoreSpending,NoncoreSpending,ObligatedSuppliersCustomerBase,CompulsorySupplierFractionOfCoreGroup
2024-04-01,2024-25,500000000,,,25000000,
";

    pub(crate) const ECO_CSV: &str = "\
UpdateDate,SchemeYear,AnnualisedCostECO4Gas,AnnualisedCostECO4Electricity,AnnualisedCostGBISGas,AnnualisedCostGBISElectricity,GDPDeflatorToCurrentPricesECO4,GDPDeflatorToCurrentPricesGBIS,FullyObligatedShareOfObligatedSupplierSupplyGas,FullyObligatedShareOfObligatedSupplierSupplyElectricity,ObligatedSupplierVolumeGas,ObligatedSupplierVolumeElectricity
2024-04-01,2024-25,600000000,400000000,100000000,50000000,10,5,,,250000000,90000000
";

    pub(crate) const FIT_CSV: &str = "\
ChargeRestrictionPeriod1,ChargeRestrictionPeriod2,ChargeRestrictionPeriod2_start,LookupPeriod,InflatedLevelisationFund,TotalElectricitySupplied,ExemptSupplyOutsideUK,ExemptSupplyEII
Oct23-Dec23,Jan24-Mar24,2024-01-01,2022-23,700000000,250000000,,10000000
Jan24-Mar24,Apr24-Jun24,2024-04-01,2023-24,689233317,245000000,5000000,10000000
";

    pub(crate) fn fixture_tables() -> SchemeTables {
        SchemeTables {
            ro: read_rows(RO_CSV.as_bytes()).unwrap(),
            aahedc: read_rows(AAHEDC_CSV.as_bytes()).unwrap(),
            ggl: read_rows(GGL_CSV.as_bytes()).unwrap(),
            whd: read_rows(WHD_CSV.as_bytes()).unwrap(),
            eco: read_rows(ECO_CSV.as_bytes()).unwrap(),
            fit: read_rows(FIT_CSV.as_bytes()).unwrap(),
        }
    }

    #[test]
    fn test_read_rows_treats_empty_cells_as_missing() {
        let rows: Vec<RoRow> = read_rows(RO_CSV.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].buy_out_price_scheme_year, None);
        assert_eq!(rows[1].buy_out_price_scheme_year, Some(66.08));
        assert_eq!(rows[1].update_date.to_string(), "2024-01-15");
    }

    #[test]
    fn test_read_rows_from_path_matches_reader() {
        let path = std::env::temp_dir().join(format!("levy_rebalancing_ro_{}.csv", std::process::id()));
        std::fs::write(&path, RO_CSV).unwrap();
        let from_path: Vec<RoRow> = read_rows_from_path(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let from_reader: Vec<RoRow> = read_rows(RO_CSV.as_bytes()).unwrap();
        assert_eq!(from_path, from_reader);
        assert!(!from_path.is_empty());
    }

    #[test]
    fn test_read_rows_from_missing_path() {
        let err = read_rows_from_path::<RoRow>(Path::new("no/such/ro.csv")).unwrap_err();
        assert!(matches!(err, LevyError::Csv(_)));
    }

    #[test]
    fn test_build_levies_from_fixtures() {
        let levies = build_levies(&fixture_tables(), &LevyInputs::default(), &ConversionFactors::default()).unwrap();
        let schemes: Vec<Scheme> = levies.iter().map(|l| l.scheme).collect();
        assert_eq!(schemes, Scheme::ALL.to_vec());

        let ro = &levies[0];
        assert_abs_diff_eq!(ro.electricity_variable_rate, 0.491 * 66.08, epsilon = 1e-9);
        assert_abs_diff_eq!(ro.revenue, 0.491 * 66.08 * 94_200_366.0, epsilon = 1e-3);

        // AAHEDC from the RPI forecast
        let aahedc = &levies[1];
        assert_abs_diff_eq!(aahedc.electricity_variable_rate, 0.0256 * 1.04 * 10.0, epsilon = 1e-12);

        // Latest GGL row has no backdated rate
        let ggl = &levies[2];
        assert_abs_diff_eq!(ggl.gas_fixed_rate, 0.496 * 3.65, epsilon = 1e-12);

        let whd = &levies[3];
        assert_abs_diff_eq!(whd.electricity_fixed_rate, 20.0, epsilon = 1e-12);

        let eco = &levies[4];
        assert_abs_diff_eq!(eco.gas_variable_rate, (660_000_000.0 + 105_000_000.0) / 250_000_000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(eco.revenue, 1_150_000_000.0, epsilon = 1e-3);

        let fit = &levies[5];
        assert_abs_diff_eq!(fit.electricity_variable_rate, 689_233_317.0 / 230_000_000.0, epsilon = 1e-9);
        assert_eq!(fit.revenue, 689_233_317.0);
    }

    #[test]
    fn test_lenient_build_skips_failing_scheme() {
        let mut tables = fixture_tables();
        tables.eco.iter_mut().for_each(|row| row.obligated_supplier_volume_gas = None);

        assert!(matches!(
            build_levies(&tables, &LevyInputs::default(), &ConversionFactors::default()),
            Err(LevyError::InsufficientData { scheme: Scheme::Eco, .. })
        ));

        let levies = build_levies_lenient(&tables, &LevyInputs::default(), &ConversionFactors::default());
        assert_eq!(levies.len(), 5);
        assert!(levies.iter().all(|l| l.scheme != Scheme::Eco));
    }

    #[test]
    fn test_levy_inputs_from_json_defaults() {
        let inputs: LevyInputs = serde_json::from_str(r#"{"ggl": {"revenue": 50000000}}"#).unwrap();
        assert_eq!(inputs.ggl.revenue, Some(50_000_000.0));
        assert_eq!(inputs.ggl.denominator, None);
        assert_eq!(inputs.ro, RevenueBasis::denominator(94_200_366.0));
        assert_eq!(inputs.fit_revenue, Some(689_233_317.0));
    }
}
