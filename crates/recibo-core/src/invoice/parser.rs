//! Receipt parser composing the field extractors, the reconciler and the confidence score.

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::models::config::{ExtractionConfig, Tolerances};
use crate::models::invoice::ParsedInvoice;

use super::confidence;
use super::document::RawDocument;
use super::reconcile::reconcile_with;
use super::rules::numbers::round_amount;
use super::rules::vat::round_rate;
use super::rules::{
    extract_amounts, DateExtractor, EstablishmentExtractor, FieldExtractor, MonetaryAccumulator,
};

/// Trait for receipt parsing.
pub trait InvoiceParser {
    /// Parse receipt fields from OCR text. Never fails; missing fields are left absent.
    fn parse(&self, text: &str) -> ParsedInvoice;
}

/// Rule-based parser for Spanish receipts and invoices.
#[derive(Debug, Clone, Default)]
pub struct ReceiptParser {
    tolerances: Tolerances,
    /// Reported when no rate could be found or derived.
    fallback_tax_rate: Option<Decimal>,
}

impl ReceiptParser {
    /// Create a parser with the default tolerances and no fallback rate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a parser from the extraction section of a configuration.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            tolerances: config.tolerances,
            fallback_tax_rate: config.fallback_tax_rate,
        }
    }

    /// Set the numeric tolerances.
    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    /// Set the rate reported for receipts that show none.
    pub fn with_fallback_tax_rate(mut self, rate: Option<Decimal>) -> Self {
        self.fallback_tax_rate = rate;
        self
    }

    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    fn assemble(
        &self,
        establishment: Option<String>,
        date: Option<chrono::NaiveDate>,
        amounts: MonetaryAccumulator,
    ) -> ParsedInvoice {
        let amounts = MonetaryAccumulator {
            total: amounts.total.map(round_amount),
            subtotal: amounts.subtotal.map(round_amount),
            tax: amounts.tax.map(round_amount),
            tax_rate: amounts.tax_rate.map(round_rate),
        };
        let confidence = confidence::score(establishment.as_deref(), date, &amounts);

        let tax_rate = amounts.tax_rate.or_else(|| {
            self.fallback_tax_rate.inspect(|rate| {
                debug!(field = "taxRate", strategy = "fallback", value = %rate, "Field filled");
            })
        });

        ParsedInvoice {
            establishment,
            date,
            total: amounts.total,
            subtotal: amounts.subtotal,
            tax: amounts.tax,
            tax_rate,
            confidence,
        }
    }
}

impl InvoiceParser for ReceiptParser {
    fn parse(&self, text: &str) -> ParsedInvoice {
        info!("Parsing receipt from {} characters of text", text.chars().count());

        let doc = RawDocument::new(text);
        if doc.is_empty() {
            return ParsedInvoice::empty();
        }

        let establishment = EstablishmentExtractor::new().extract(&doc).map(|m| m.value);
        let date = DateExtractor::new().extract(&doc).map(|m| m.value);

        let amounts = extract_amounts(&doc, &self.tolerances);
        let amounts = reconcile_with(amounts, &self.tolerances);

        let invoice = self.assemble(establishment, date, amounts);
        debug!(
            "Parsed receipt with confidence {:.2}, missing {:?}",
            invoice.confidence,
            invoice.missing_fields()
        );

        invoice
    }
}

/// Parse receipt text with the default configuration.
pub fn parse_invoice(text: &str) -> ParsedInvoice {
    ReceiptParser::new().parse(text)
}
