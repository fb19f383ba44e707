//! Configuration errors
//!
//! Every variant here is a programmer or operator mistake that is caught
//! while validating configuration, before any holding is evaluated.
//! Degenerate data (short history, flat series, zero references) never
//! surfaces as an error.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("at least one lookback window must be configured")]
    EmptyWindowSet,

    #[error("lookback window '{name}' must require at least one observation")]
    ZeroLengthWindow { name: String },

    #[error("lookback window '{name}' is configured more than once")]
    DuplicateWindow { name: String },

    #[error("severity tier '{name}' is configured more than once")]
    DuplicateTier { name: String },

    #[error("severity tier '{name}' has invalid magnitude {magnitude}")]
    InvalidMagnitude { name: String, magnitude: f64 },

    #[error(
        "severity tier '{name}' ({magnitude}) must be strictly above the previous tier ({previous})"
    )]
    NonAscendingTiers {
        name: String,
        magnitude: f64,
        previous: f64,
    },

    #[error("{path} alert thresholds are empty")]
    EmptyThresholds { path: &'static str },

    #[error("reference window '{name}' is not one of the configured lookback windows")]
    UnknownReferenceWindow { name: String },

    #[error("{field} must be greater than zero")]
    NonPositive { field: &'static str },

    #[error("metric catalog is empty")]
    EmptyCatalog,

    #[error("metric '{id}' is listed more than once in the catalog")]
    DuplicateMetric { id: String },

    #[error("portfolio has no holdings")]
    EmptyPortfolio,

    #[error("ticker '{ticker}' is listed more than once in the portfolio")]
    DuplicateHolding { ticker: String },
}
