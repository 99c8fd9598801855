//! Model configuration
//!
//! A single JSON document holds the input locations, levy inputs and the
//! scenario weight sets. Every field has a default, so `{}` is a valid
//! configuration that runs the status quo presets against the default data
//! directory.

use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::archetype::{load_archetypes, Archetype, DEFAULT_ARCHETYPES_PATH};
use crate::error::{LevyError, Result};
use crate::levy::loader::DEFAULT_SCHEME_TABLES_PATH;
use crate::levy::{build_levies, build_levies_lenient, ConversionFactors, Levy, LevyInputs, Scheme, SchemeTables};
use crate::presets::{normalise_baseline, preset_weights, WeightPreset};
use crate::rebate::RebateRequest;
use crate::scenario::{ScenarioConfig, ScenarioWeights};
use crate::tariff::{load_tariff_pair, PaymentMethod, TariffPair, DEFAULT_TARIFF_TABLES_PATH};

/// Default configuration file
pub const DEFAULT_CONFIG_PATH: &str = "data/model.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Directory holding `ro.csv`, `aahedc.csv`, ...
    #[serde(default = "default_scheme_tables")]
    pub scheme_tables: PathBuf,

    /// Directory holding the tariff component tables
    #[serde(default = "default_tariff_tables")]
    pub tariff_tables: PathBuf,

    #[serde(default = "default_archetypes")]
    pub archetypes: PathBuf,

    /// Eligibility counts; only needed for rebates
    #[serde(default)]
    pub eligibility: Option<PathBuf>,

    #[serde(default = "default_payment_method")]
    pub payment_method: PaymentMethod,

    #[serde(default)]
    pub levy_inputs: LevyInputs,

    #[serde(default)]
    pub conversion_factors: ConversionFactors,

    /// Denominators and processing options
    #[serde(default)]
    pub processing: ScenarioConfig,

    /// Restate published rates on the model denominators before processing
    #[serde(default = "default_normalise_baseline")]
    pub normalise_baseline: bool,

    /// Skip schemes whose tables cannot produce a levy instead of failing
    #[serde(default)]
    pub lenient: bool,

    /// Preset scenarios, named by their label
    #[serde(default = "default_presets")]
    pub presets: Vec<WeightPreset>,

    /// Explicit scenarios; a name shared with a preset replaces it
    #[serde(default)]
    pub scenarios: ScenarioWeights,

    #[serde(default)]
    pub rebates: Vec<RebateRequest>,
}

fn default_scheme_tables() -> PathBuf { PathBuf::from(DEFAULT_SCHEME_TABLES_PATH) }
fn default_tariff_tables() -> PathBuf { PathBuf::from(DEFAULT_TARIFF_TABLES_PATH) }
fn default_archetypes() -> PathBuf { PathBuf::from(DEFAULT_ARCHETYPES_PATH) }
fn default_payment_method() -> PaymentMethod { PaymentMethod::OtherPayment }
fn default_normalise_baseline() -> bool { true }
fn default_presets() -> Vec<WeightPreset> { WeightPreset::ALL.to_vec() }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            scheme_tables: default_scheme_tables(),
            tariff_tables: default_tariff_tables(),
            archetypes: default_archetypes(),
            eligibility: None,
            payment_method: default_payment_method(),
            levy_inputs: LevyInputs::default(),
            conversion_factors: ConversionFactors::default(),
            processing: ScenarioConfig::default(),
            normalise_baseline: default_normalise_baseline(),
            lenient: false,
            presets: default_presets(),
            scenarios: ScenarioWeights::new(),
            rebates: Vec::new(),
        }
    }
}

impl ModelConfig {
    /// Load from a JSON file; relative paths are taken from the working
    /// directory
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        info!("Loaded model configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Presets expanded with the WHD customer denominators, then the explicit
    /// scenarios on top
    pub fn scenario_weights(&self) -> Result<ScenarioWeights> {
        let mut weights = ScenarioWeights::new();
        if !self.presets.is_empty() {
            let whd = self
                .processing
                .denominators
                .get(&Scheme::Whd)
                .ok_or(LevyError::MissingDenominators(Scheme::Whd))?;
            for &preset in &self.presets {
                weights.insert(
                    preset.label().to_string(),
                    preset_weights(preset, whd.customers_elec, whd.customers_gas)?,
                );
            }
        }
        for (name, set) in &self.scenarios {
            weights.insert(name.clone(), set.clone());
        }
        Ok(weights)
    }
}

/// Baseline levies, tariffs and archetypes for a configuration
#[derive(Debug, Clone)]
pub struct ModelInputs {
    pub levies: Vec<Levy>,
    /// Tariffs with policy costs set from `levies`
    pub tariffs: TariffPair,
    pub archetypes: Vec<Archetype>,
}

impl ModelInputs {
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let tables = SchemeTables::load_from(&config.scheme_tables)?;
        let levies = if config.lenient {
            build_levies_lenient(&tables, &config.levy_inputs, &config.conversion_factors)
        } else {
            build_levies(&tables, &config.levy_inputs, &config.conversion_factors)?
        };
        Self::from_levies(config, levies)
    }

    /// Finish loading around levies built elsewhere
    pub fn from_levies(config: &ModelConfig, levies: Vec<Levy>) -> Result<Self> {
        let levies = if config.normalise_baseline {
            normalise_baseline(&levies, &config.processing.denominators)?
        } else {
            levies
        };

        let mut tariffs = load_tariff_pair(&config.tariff_tables, config.payment_method)?;
        tariffs.apply_levies(&levies);
        let archetypes = load_archetypes(&config.archetypes)?;

        info!(
            "Model inputs ready: {} levies, {} archetypes, {} tariffs",
            levies.len(),
            archetypes.len(),
            config.payment_method.label()
        );
        Ok(Self { levies, tariffs, archetypes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levy::{Denominators, RevenueBasis};
    use crate::scenario::Summary;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ModelConfig::from_json("{}").unwrap();
        assert_eq!(config, ModelConfig::default());
        assert_eq!(config.processing.denominators[&Scheme::Ro], Denominators::subnational_domestic());
        assert_abs_diff_eq!(config.processing.consumption_scale_factor, 1_000.0);
        assert_eq!(config.conversion_factors.ggl_days_per_year, 365.0);
    }

    #[test]
    fn test_partial_config() {
        let config = ModelConfig::from_json(
            r#"{
                "payment_method": "standard_credit",
                "levy_inputs": {"ro": {"revenue": 7000000000.0}, "whd_revenue": 450000000.0},
                "processing": {"summaries": ["total"]},
                "presets": ["status_quo"],
                "scenarios": {
                    "Tax funded WHD": {
                        "whd": {"new_tax_weight": 1.0}
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.payment_method, PaymentMethod::StandardCredit);
        assert_eq!(config.levy_inputs.ro, RevenueBasis::revenue(7_000_000_000.0));
        assert_eq!(config.levy_inputs.whd_revenue, Some(450_000_000.0));
        assert_eq!(config.levy_inputs.fit_revenue, Some(689_233_317.0));
        assert_eq!(config.processing.summaries, vec![Summary::Total]);
        assert!(config.processing.include_baseline);

        let weights = config.scenario_weights().unwrap();
        assert_eq!(weights.len(), 2);
        assert_eq!(weights["Tax funded WHD"][&Scheme::Whd].tax, 1.0);
        assert_eq!(weights["Status quo"].len(), 6);
    }

    #[test]
    fn test_explicit_scenario_overrides_preset() {
        let mut config = ModelConfig { presets: vec![WeightPreset::AllGas], ..Default::default() };
        config.scenarios.insert(WeightPreset::AllGas.label().to_string(), Default::default());
        let weights = config.scenario_weights().unwrap();
        assert!(weights[WeightPreset::AllGas.label()].is_empty());
    }

    #[test]
    fn test_unknown_preset_is_rejected() {
        let err = ModelConfig::from_json(r#"{"presets": ["half_and_half"]}"#).unwrap_err();
        assert!(matches!(err, LevyError::Json(_)));
    }
}
