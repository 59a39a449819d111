//! Configuration structures for the extraction pipeline.

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Maximum allowed gap between `total` and `subtotal + tax` (currency units).
pub const RECONCILIATION_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 1);

/// Maximum gap between a tax amount and `base × rate` when only two amounts are known.
pub const RATE_CHECK_TOLERANCE: Decimal = Decimal::ONE;

/// Maximum gap when matching `total − base` against a number in a document-wide table.
pub const TABLE_MATCH_TOLERANCE: Decimal = Decimal::from_parts(2, 0, 0, false, 2);

/// Tax rate some earlier clients stored when the receipt showed none (16%).
pub const LEGACY_FALLBACK_TAX_RATE: Decimal = Decimal::from_parts(16, 0, 0, false, 2);

/// Main configuration for recibo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReciboConfig {
    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Output configuration.
    pub output: OutputConfig,
}

/// Field extraction configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Numeric tolerances used while matching and reconciling amounts.
    pub tolerances: Tolerances,

    /// Rate reported when the receipt shows none. `None` leaves the field absent.
    #[serde(with = "rust_decimal::serde::float_option")]
    pub fallback_tax_rate: Option<Decimal>,
}

/// Tunable numeric tolerances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// See [`RECONCILIATION_TOLERANCE`].
    #[serde(with = "rust_decimal::serde::float")]
    pub reconciliation: Decimal,

    /// See [`RATE_CHECK_TOLERANCE`].
    #[serde(with = "rust_decimal::serde::float")]
    pub rate_check: Decimal,

    /// See [`TABLE_MATCH_TOLERANCE`].
    #[serde(with = "rust_decimal::serde::float")]
    pub table_match: Decimal,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            reconciliation: RECONCILIATION_TOLERANCE,
            rate_check: RATE_CHECK_TOLERANCE,
            table_match: TABLE_MATCH_TOLERANCE,
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Results scoring below this confidence are flagged for human review.
    pub review_threshold: f64,

    /// Pretty-print JSON output.
    pub pretty_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            review_threshold: 0.6,
            pretty_json: false,
        }
    }
}

impl ReciboConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let tolerances = &self.extraction.tolerances;
        for (name, value) in [
            ("reconciliation", tolerances.reconciliation),
            ("rate_check", tolerances.rate_check),
            ("table_match", tolerances.table_match),
        ] {
            if value <= Decimal::ZERO {
                return Err(ConfigError::NonPositiveTolerance {
                    name,
                    value: value.to_string(),
                });
            }
        }

        if let Some(rate) = self.extraction.fallback_tax_rate {
            if rate <= Decimal::ZERO || rate > Decimal::ONE {
                return Err(ConfigError::FallbackRateOutOfRange(rate.to_string()));
            }
        }

        let threshold = self.output.review_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::ReviewThresholdOutOfRange(threshold));
        }

        Ok(())
    }
}
