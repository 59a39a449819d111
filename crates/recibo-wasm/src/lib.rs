//! WASM bindings for Spanish receipt parsing.
//!
//! This crate provides WebAssembly bindings for use in browsers and Node.js. Absent fields are
//! returned as `null`, matching the JSON output of the CLI.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use recibo_core::invoice::rules::{DateExtractor, FieldExtractor};
use recibo_core::{InvoiceParser, RawDocument, ReceiptParser};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Extract receipt fields from OCR text.
///
/// Returns `{establishment, date, total, subtotal, tax, taxRate, confidence}`.
#[wasm_bindgen]
pub fn parse_receipt(text: &str) -> Result<JsValue, JsValue> {
    to_js(&recibo_core::parse_invoice(text))
}

/// Parse a number written with either decimal convention (e.g., "1.234,56" or "87,50").
#[wasm_bindgen]
pub fn parse_number(value: &str) -> Option<f64> {
    recibo_core::parse_number(value).and_then(|d| d.to_f64())
}

/// Receipt extractor class for browser use.
#[wasm_bindgen]
pub struct ReceiptExtractor {
    parser: ReceiptParser,
}

#[wasm_bindgen]
impl ReceiptExtractor {
    /// Create a new receipt extractor with the default configuration.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            parser: ReceiptParser::new(),
        }
    }

    /// Rate reported when a receipt shows none, as a fraction (e.g., 0.16). `undefined` clears it.
    #[wasm_bindgen]
    pub fn set_fallback_tax_rate(&mut self, rate: Option<f64>) -> Result<(), JsValue> {
        let rate = rate.map(fallback_rate).transpose().map_err(|e| JsValue::from_str(&e))?;
        self.parser = self.parser.clone().with_fallback_tax_rate(rate);
        Ok(())
    }

    /// Extract receipt fields from text.
    #[wasm_bindgen]
    pub fn parse(&self, text: &str) -> Result<JsValue, JsValue> {
        to_js(&self.parser.parse(text))
    }
}

impl Default for ReceiptExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn fallback_rate(rate: f64) -> Result<Decimal, String> {
    Decimal::from_f64_retain(rate)
        .map(|d| d.round_dp(4))
        .filter(|d| *d > Decimal::ZERO && *d <= Decimal::ONE)
        .ok_or_else(|| format!("fallback tax rate must be in (0, 1], got {}", rate))
}

/// Utilities for working with Spanish receipt data.
#[wasm_bindgen]
pub struct ReceiptUtils;

#[wasm_bindgen]
impl ReceiptUtils {
    /// Format amount in Spanish style (1.234,56).
    #[wasm_bindgen]
    pub fn format_amount(amount: f64) -> String {
        let s = format!("{:.2}", amount.abs());
        let Some((integer_part, decimal_part)) = s.split_once('.') else {
            return s;
        };

        let chars: Vec<char> = integer_part.chars().collect();
        let mut formatted = String::new();
        if amount < 0.0 {
            formatted.push('-');
        }
        for (i, c) in chars.iter().enumerate() {
            if i > 0 && (chars.len() - i) % 3 == 0 {
                formatted.push('.');
            }
            formatted.push(*c);
        }

        format!("{},{}", formatted, decimal_part)
    }

    /// First date found in the text, as `YYYY-MM-DD`.
    #[wasm_bindgen]
    pub fn parse_date(text: &str) -> Option<String> {
        DateExtractor::new()
            .extract(&RawDocument::new(text))
            .map(|m| m.value.to_string())
    }
}
