//! Receipt data model returned by the parser.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};

/// Structured fields extracted from one receipt or invoice.
///
/// Every field is optional: absence means the text did not yield a trustworthy value, never an
/// error. Amounts are rounded to cents and the tax rate to whole-percent precision when the parser
/// assembles the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedInvoice {
    /// Business name as it appears on the receipt.
    pub establishment: Option<String>,

    /// Transaction date.
    pub date: Option<NaiveDate>,

    /// Amount paid, taxes included.
    #[serde(
        default,
        serialize_with = "serialize_amount",
        deserialize_with = "rust_decimal::serde::float_option::deserialize"
    )]
    pub total: Option<Decimal>,

    /// Taxable base (base imponible).
    #[serde(
        default,
        serialize_with = "serialize_amount",
        deserialize_with = "rust_decimal::serde::float_option::deserialize"
    )]
    pub subtotal: Option<Decimal>,

    /// IVA amount (cuota).
    #[serde(
        default,
        serialize_with = "serialize_amount",
        deserialize_with = "rust_decimal::serde::float_option::deserialize"
    )]
    pub tax: Option<Decimal>,

    /// IVA rate as a fraction, e.g. `0.10` for 10%.
    #[serde(
        default,
        serialize_with = "serialize_rate",
        deserialize_with = "rust_decimal::serde::float_option::deserialize"
    )]
    pub tax_rate: Option<Decimal>,

    /// Heuristic confidence in [0, 1].
    pub confidence: f64,
}

impl ParsedInvoice {
    /// A record with every field absent and zero confidence.
    pub fn empty() -> Self {
        Self {
            establishment: None,
            date: None,
            total: None,
            subtotal: None,
            tax: None,
            tax_rate: None,
            confidence: 0.0,
        }
    }

    /// Names of the fields that could not be extracted, in output order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.establishment.is_none() {
            missing.push("establishment");
        }
        if self.date.is_none() {
            missing.push("date");
        }
        if self.total.is_none() {
            missing.push("total");
        }
        if self.subtotal.is_none() {
            missing.push("subtotal");
        }
        if self.tax.is_none() {
            missing.push("tax");
        }
        if self.tax_rate.is_none() {
            missing.push("taxRate");
        }
        missing
    }

    /// Whether a human should double-check this record before it is stored.
    pub fn needs_review(&self, threshold: f64) -> bool {
        self.confidence < threshold
    }
}

impl Default for ParsedInvoice {
    fn default() -> Self {
        Self::empty()
    }
}

fn serialize_amount<S>(value: &Option<Decimal>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serialize_decimal(value.map(|v| v.round_dp(2)), serializer)
}

/// The parser already rounds rates, keeping tiny ones that would otherwise round to zero.
fn serialize_rate<S>(value: &Option<Decimal>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serialize_decimal(*value, serializer)
}

/// JSON numbers go through the decimal string so `0.1` stays `0.1`.
fn serialize_decimal<S>(value: Option<Decimal>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value.and_then(|v| v.normalize().to_string().parse::<f64>().ok()) {
        Some(v) => serializer.serialize_some(&v),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_empty_invoice_serializes_nulls() {
        let value = serde_json::to_value(ParsedInvoice::empty()).unwrap();
        assert_eq!(
            value,
            json!({
                "establishment": null,
                "date": null,
                "total": null,
                "subtotal": null,
                "tax": null,
                "taxRate": null,
                "confidence": 0.0
            })
        );
    }

    #[test]
    fn test_amounts_serialize_rounded() {
        let invoice = ParsedInvoice {
            establishment: Some("RAMEN SHIFU SEVILLA".to_string()),
            date: NaiveDate::from_ymd_opt(2025, 1, 11),
            total: Some(Decimal::new(36850, 3)),
            subtotal: Some(Decimal::new(3349999, 5)),
            tax: Some(Decimal::new(335, 2)),
            tax_rate: Some(Decimal::new(10, 2)),
            confidence: 1.0,
        };

        let value = serde_json::to_value(&invoice).unwrap();
        assert_eq!(value["date"], json!("2025-01-11"));
        assert_eq!(value["total"], json!(36.85));
        assert_eq!(value["subtotal"], json!(33.5));
        assert_eq!(value["taxRate"], json!(0.1));
    }

    #[test]
    fn test_tiny_rate_is_not_serialized_as_zero() {
        let mut invoice = ParsedInvoice::empty();
        invoice.tax_rate = Some(Decimal::new(4, 6));

        let value = serde_json::to_value(&invoice).unwrap();
        assert_eq!(value["taxRate"], json!(0.000004));
    }

    #[test]
    fn test_deserialize_round_trip() {
        let text = r#"{"establishment":"BAR PEPE","date":"2024-06-24","total":72.45,
            "subtotal":59.88,"tax":12.57,"taxRate":0.21,"confidence":0.9}"#;
        let invoice: ParsedInvoice = serde_json::from_str(text).unwrap();

        assert_eq!(invoice.total.map(|v| v.round_dp(2)), Some(Decimal::new(7245, 2)));
        assert_eq!(invoice.tax_rate.map(|v| v.round_dp(2)), Some(Decimal::new(21, 2)));
        assert_eq!(invoice.establishment.as_deref(), Some("BAR PEPE"));
    }

    #[test]
    fn test_missing_fields_and_review() {
        let mut invoice = ParsedInvoice::empty();
        invoice.total = Some(Decimal::new(1000, 2));
        invoice.confidence = 0.25;

        assert_eq!(
            invoice.missing_fields(),
            vec!["establishment", "date", "subtotal", "tax", "taxRate"]
        );
        assert!(invoice.needs_review(0.6));
        assert!(!invoice.needs_review(0.2));
    }
}
