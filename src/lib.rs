//! Levy Rebalancing - policy cost levies on UK domestic energy bills
//!
//! This library provides:
//! - Levy derivation from published scheme tables (RO, AAHEDC, GGL, WHD, ECO, FIT)
//! - Revenue-conserving rebalancing across fuels, charging bases and taxation
//! - Price cap tariff evaluation with levies substituted into policy costs
//! - Batch scenario processing of levy costs and bills per household archetype
//! - Targeted rebate overlays funded by ineligible households

pub mod error;
pub mod levy;
pub mod tariff;
pub mod archetype;
pub mod scenario;
pub mod rebate;
pub mod presets;
pub mod config;
pub mod output;

// Re-export commonly used types
pub use error::{LevyError, Result};
pub use levy::{Levy, Scheme, RebalanceWeights, Denominators, SchemeTables, LevyInputs, ConversionFactors, RevenueBasis};
pub use tariff::{Tariff, TariffPair, PaymentMethod, Fuel};
pub use archetype::{Archetype, EligibilityTable};
pub use scenario::{ScenarioProcessor, ScenarioConfig, ScenarioRecord, WeightSet, ScenarioWeights, DenominatorSet};
pub use rebate::{EligibilityCriteria, RebateRequest, SubsidisationRow, subsidisation_table};
pub use presets::{WeightPreset, preset_weights, status_quo_weights, normalise_baseline, levy_rate_table};
pub use config::ModelConfig;
pub use output::OutputFormat;
