//! Core library for Spanish receipt OCR text.
//!
//! This crate provides:
//! - Locale-aware number parsing (`1.234,56`, `1,234.56`, `87,50`)
//! - Establishment, date and amount extraction from noisy OCR text
//! - Reconciliation of total, subtotal and IVA (Spanish VAT)
//! - A confidence score telling callers when a human should review the result

pub mod error;
pub mod invoice;
pub mod models;

pub use error::{ConfigError, ReciboError, Result};
pub use invoice::rules::{parse_number, MonetaryAccumulator};
pub use invoice::{parse_invoice, InvoiceParser, RawDocument, ReceiptParser};
pub use models::config::{ExtractionConfig, OutputConfig, ReciboConfig, Tolerances};
pub use models::invoice::ParsedInvoice;
