//! Monetary field extraction.
//!
//! Amounts are found by a fixed chain of strategies. Each one receives the accumulator produced
//! by the previous strategy and may only fill fields that are still absent, so the first strategy
//! to find a field wins it.

use rust_decimal::Decimal;
use tracing::debug;

use crate::invoice::document::RawDocument;
use crate::models::config::Tolerances;

use super::numbers::parse_number;
use super::patterns::{
    FieldPattern, SUBTOTAL_PATTERNS, TAX_PATTERNS, TAX_RATE_PATTERNS, TOTAL_PATTERNS,
};
use super::vat::rate_from_percent;
use super::{multiline, table};

/// Partial set of monetary fields built up while a document is parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonetaryAccumulator {
    pub total: Option<Decimal>,
    pub subtotal: Option<Decimal>,
    pub tax: Option<Decimal>,
    /// Fraction, e.g. `0.10`.
    pub tax_rate: Option<Decimal>,
}

impl MonetaryAccumulator {
    /// Whether total, subtotal and tax are all known.
    pub fn has_all_amounts(&self) -> bool {
        self.total.is_some() && self.subtotal.is_some() && self.tax.is_some()
    }

    /// Whether all three amounts are known and add up within `tolerance`.
    pub fn is_consistent(&self, tolerance: Decimal) -> bool {
        match (self.total, self.subtotal, self.tax) {
            (Some(total), Some(subtotal), Some(tax)) => (total - (subtotal + tax)).abs() < tolerance,
            _ => false,
        }
    }

    /// Copy every field `other` has over this one.
    pub fn overlay(self, other: Self) -> Self {
        Self {
            total: other.total.or(self.total),
            subtotal: other.subtotal.or(self.subtotal),
            tax: other.tax.or(self.tax),
            tax_rate: other.tax_rate.or(self.tax_rate),
        }
    }

    /// Take fields from `found` only where this accumulator has none.
    pub fn fill_absent(self, found: Self, strategy: &'static str) -> Self {
        Self {
            total: fill("total", strategy, self.total, found.total),
            subtotal: fill("subtotal", strategy, self.subtotal, found.subtotal),
            tax: fill("tax", strategy, self.tax, found.tax),
            tax_rate: fill("taxRate", strategy, self.tax_rate, found.tax_rate),
        }
    }
}

fn fill(
    field: &'static str,
    strategy: &'static str,
    current: Option<Decimal>,
    found: Option<Decimal>,
) -> Option<Decimal> {
    match (current, found) {
        (None, Some(value)) => {
            debug!(field, strategy, value = %value, "Field filled");
            Some(value)
        }
        (current, _) => current,
    }
}

/// A monetary extraction strategy.
pub type Strategy =
    fn(&RawDocument<'_>, &Tolerances, MonetaryAccumulator) -> MonetaryAccumulator;

/// Strategies in the order they run.
pub const STRATEGIES: [(&str, Strategy); 3] = [
    ("direct", direct_patterns),
    ("multiline", multiline::multiline_labels),
    ("table", table::table_format),
];

/// Run every strategy over the document, starting from an empty accumulator.
pub fn extract_amounts(doc: &RawDocument<'_>, tolerances: &Tolerances) -> MonetaryAccumulator {
    STRATEGIES
        .iter()
        .fold(MonetaryAccumulator::default(), |acc, (name, strategy)| {
            let next = strategy(doc, tolerances, acc);
            if next != acc {
                debug!(strategy = *name, "Strategy contributed fields");
            }
            next
        })
}

/// Labelled values matched against the whole text with the per-field pattern tables.
pub fn direct_patterns(
    doc: &RawDocument<'_>,
    _tolerances: &Tolerances,
    acc: MonetaryAccumulator,
) -> MonetaryAccumulator {
    let text = doc.text();

    MonetaryAccumulator {
        total: acc
            .total
            .or_else(|| first_match("total", &TOTAL_PATTERNS, text, positive)),
        subtotal: acc
            .subtotal
            .or_else(|| first_match("subtotal", &SUBTOTAL_PATTERNS, text, positive)),
        tax: acc
            .tax
            .or_else(|| first_match("tax", &TAX_PATTERNS, text, positive)),
        tax_rate: acc
            .tax_rate
            .or_else(|| first_match("taxRate", &TAX_RATE_PATTERNS, text, rate_from_percent)),
    }
}

fn positive(value: Decimal) -> Option<Decimal> {
    (value > Decimal::ZERO).then_some(value)
}

/// Value of the first pattern whose capture parses and passes `accept`.
fn first_match(
    field: &'static str,
    patterns: &[FieldPattern],
    text: &str,
    accept: fn(Decimal) -> Option<Decimal>,
) -> Option<Decimal> {
    patterns.iter().find_map(|pattern| {
        let value = pattern.find(text).and_then(parse_number).and_then(accept)?;
        debug!(
            field,
            strategy = "direct",
            pattern = pattern.name,
            value = %value,
            "Field matched"
        );
        Some(value)
    })
}
