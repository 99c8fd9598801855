//! Error taxonomy for levy derivation, rebalancing and scenario processing

use thiserror::Error;

use crate::levy::Scheme;

/// Errors raised by the levy model
#[derive(Error, Debug)]
pub enum LevyError {
    // Configuration
    #[error("{scheme}: provide either a revenue or a denominator")]
    MissingRevenueBasis { scheme: Scheme },

    #[error("Unknown levy scheme: {0}")]
    UnknownScheme(String),

    #[error("Unknown eligibility criteria: {0} (expected one of: {expected})", expected = crate::rebate::EligibilityCriteria::labels().join(", "))]
    UnknownEligibilityCriteria(String),

    #[error("Unknown tariff payment method: {0}")]
    UnknownPaymentMethod(String),

    #[error("Unknown weight preset: {0}")]
    UnknownPreset(String),

    #[error("Scenario '{scenario}' has no rebalancing weights for {scheme}")]
    MissingWeights { scenario: String, scheme: Scheme },

    #[error("No denominators configured for {0}")]
    MissingDenominators(Scheme),

    #[error("Archetype '{0}' not found")]
    MissingArchetype(String),

    #[error("Scenario '{0}' not present in bill records")]
    MissingScenario(String),

    // Validation
    #[error("{scheme}: rebalancing failed to maintain revenue (expected {expected:.2}, got {actual:.2})")]
    RevenueNotMaintained {
        scheme: Scheme,
        expected: f64,
        actual: f64,
    },

    // Derivation
    #[error("{scheme}: insufficient information to calculate {fuel} rate")]
    InsufficientData { scheme: Scheme, fuel: &'static str },

    #[error("{0}: no usable rows in scheme table")]
    EmptyTable(Scheme),

    #[error("Tariff component table has no rows for the latest period")]
    EmptyComponentTable,

    // Arithmetic
    #[error("Division by zero {0}")]
    ZeroDenominator(&'static str),

    // Ingestion
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value '{value}' in column {column}")]
    InvalidValue { column: String, value: String },

    #[error("Missing column {0}")]
    MissingColumn(String),
}

/// Result type for levy model operations
pub type Result<T> = std::result::Result<T, LevyError>;

/// Divide, reporting a zero denominator instead of producing inf/NaN
pub(crate) fn divide(numerator: f64, denominator: f64, what: &'static str) -> Result<f64> {
    if denominator == 0.0 {
        return Err(LevyError::ZeroDenominator(what));
    }
    Ok(numerator / denominator)
}
