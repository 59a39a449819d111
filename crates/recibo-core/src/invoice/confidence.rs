//! Additive confidence score for a parsed receipt.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::config::RECONCILIATION_TOLERANCE;

use super::rules::MonetaryAccumulator;

const ESTABLISHMENT_WEIGHT: f64 = 0.2;
const DATE_WEIGHT: f64 = 0.2;
const TOTAL_WEIGHT: f64 = 0.25;
const SUBTOTAL_WEIGHT: f64 = 0.2;
const TAX_WEIGHT: f64 = 0.15;
const CONSISTENCY_WEIGHT: f64 = 0.1;

/// Score the fields of a parsed receipt, clamped to [0, 1] and rounded to 2 decimal places.
///
/// Every present field adds its weight; a further bonus applies when total, subtotal and tax are
/// all present and add up. Absent fields never subtract, so filling a field cannot lower the
/// score.
pub fn score(
    establishment: Option<&str>,
    date: Option<NaiveDate>,
    amounts: &MonetaryAccumulator,
) -> f64 {
    let positive = |v: Option<Decimal>| v.is_some_and(|v| v > Decimal::ZERO);

    let mut score = 0.0;
    if establishment.is_some() {
        score += ESTABLISHMENT_WEIGHT;
    }
    if date.is_some() {
        score += DATE_WEIGHT;
    }
    if positive(amounts.total) {
        score += TOTAL_WEIGHT;
    }
    if positive(amounts.subtotal) {
        score += SUBTOTAL_WEIGHT;
    }
    if positive(amounts.tax) {
        score += TAX_WEIGHT;
    }
    if amounts.is_consistent(RECONCILIATION_TOLERANCE) {
        score += CONSISTENCY_WEIGHT;
    }

    ((score * 100.0).round() / 100.0).clamp(0.0, 1.0)
}
