//! Error types for the recibo-core library.
//!
//! Parsing receipt text never fails; a field that cannot be extracted is simply absent.
//! These errors cover the surrounding concerns: loading, saving and validating configuration.

use thiserror::Error;

/// Main error type for the recibo library.
#[derive(Error, Debug)]
pub enum ReciboError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised when validating a configuration.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    /// A tolerance must be strictly positive.
    #[error("tolerance `{name}` must be positive, got {value}")]
    NonPositiveTolerance { name: &'static str, value: String },

    /// The fallback tax rate must be a fraction in (0, 1].
    #[error("fallback tax rate must be in (0, 1], got {0}")]
    FallbackRateOutOfRange(String),

    /// The review threshold must be a confidence in [0, 1].
    #[error("review threshold must be in [0, 1], got {0}")]
    ReviewThresholdOutOfRange(f64),
}

/// Result type for the recibo library.
pub type Result<T> = std::result::Result<T, ReciboError>;
