//! Labels and values split across lines.
//!
//! OCR engines frequently read a receipt column by column, so a label such as `TOTAL A PAGAR:`
//! and its amount can end up many lines apart. This strategy recognises a handful of such
//! layouts from their header line and searches the surrounding lines for values that add up.

use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

use crate::invoice::document::RawDocument;
use crate::models::config::Tolerances;

use super::amounts::MonetaryAccumulator;
use super::numbers::{extract_numbers, parse_number};
use super::patterns::{BASE_RATE_CUOTA, COMMON_RATE_INT, IVA_SOBRE_BASE, TOTAL_EUR};
use super::vat::{implied_rate, is_plausible_rate, rate_from_percent, SPANISH_IVA_RATES};

/// Only the head of very long documents is scanned.
const MAX_SCAN_LINES: usize = 100;

/// Lines searched after a `TOTAL A PAGAR` label without a value.
const PAY_LOOKAHEAD: usize = 15;

/// Window around a `BASE IMPONIBLE` header.
const HEADER_LOOKBEHIND: usize = 10;
const HEADER_LOOKAHEAD: usize = 5;

/// Lines after a `BASE IMP IVA CUOTA` header that may hold the value row.
const CUOTA_ROW_LOOKAHEAD: usize = 4;

/// Lines after a subtotal label that may hold its value.
const SUBTOTAL_LOOKAHEAD: usize = 5;

/// Labels of a stacked `Suma / Subtotal / Impuesto / Total` block are this close together.
const STACKED_LABEL_SPAN: usize = 6;
const STACKED_VALUE_SPAN: usize = 15;
const STACKED_MIN_VALUES: usize = 4;

/// Lines that never carry the tax summary row.
const NON_VALUE_MARKERS: [&str; 4] = ["GRACIAS", "EMAIL", "TELEFONO", "OBSERV"];

/// Candidate totals of a document-wide table must exceed this amount.
const TABLE_MIN_TOTAL: Decimal = Decimal::from_parts(20, 0, 0, false, 0);

/// A rate-derived total needs a base or tax within this distance of a printed number.
const RATE_FALLBACK_TOLERANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// Smallest amount considered when deriving a total from a known rate.
const RATE_FALLBACK_MIN_TOTAL: Decimal = Decimal::TEN;

const STRATEGY: &str = "multiline";

/// Multiline-label strategy. See the module documentation.
pub fn multiline_labels(
    doc: &RawDocument<'_>,
    tolerances: &Tolerances,
    acc: MonetaryAccumulator,
) -> MonetaryAccumulator {
    let lines = doc.lines();
    let lines = &lines[..lines.len().min(MAX_SCAN_LINES)];
    acc.fill_absent(scan(lines, tolerances), STRATEGY)
}

/// Every layout writes into one local record; later matches overwrite earlier ones.
fn scan(lines: &[&str], tolerances: &Tolerances) -> MonetaryAccumulator {
    let numbers: Vec<Decimal> = lines.iter().flat_map(|line| extract_numbers(line)).collect();

    let mut found = MonetaryAccumulator::default();
    if let Some(seed) = rate_over_base(lines) {
        if seed.is_consistent(tolerances.reconciliation) {
            debug!(layout = "rate_over_base", "Amounts validated");
            return seed;
        }
        found = seed;
    }

    for (i, raw) in lines.iter().enumerate() {
        let line = raw.to_uppercase();
        let has = |word: &str| line.contains(word);

        if has("TOTAL") && has("PAGAR") {
            found.total = amount_to_pay(lines, i, found.total);
        }

        if (has("BASE") && has("IMPONIBLE")) || (has("BASE") && has("IVA") && has("TOTAL")) {
            if let Some(row) = tax_summary_row(lines, i, tolerances) {
                debug!(layout = "tax_summary_row", line = i, "Amounts validated");
                found = found.overlay(row);
            }
        }

        if has("BASE") && has("IMP") && has("CUOTA") && !has("IMPONIBLE") {
            if let Some(row) = cuota_row(lines, i) {
                debug!(layout = "cuota_row", line = i, "Amounts found");
                found = found.overlay(row);
            }
        }

        if (has("IMPORTE") && has("IVA") && has("IMPONIBLE"))
            || (has("%") && has("IVA") && has("BASE") && !has("CUOTA"))
        {
            if let Some(triple) = document_table(&numbers, tolerances) {
                debug!(layout = "document_table", line = i, "Amounts validated");
                found = found.overlay(triple);
            }
            if found.tax_rate.is_none() {
                found.tax_rate = common_rate(&numbers);
            }
        }

        if (has("IMPONIBLE") || has("SUBTOTAL")) && !has("IMPORTE") && found.subtotal.is_none() {
            found.subtotal = largest_on_or_after(lines, i, SUBTOTAL_LOOKAHEAD);
        }

        if has("SUMA") && !has("SUBTOTAL") {
            if let Some(block) = stacked_block(lines, i, tolerances) {
                debug!(layout = "stacked_labels", line = i, "Amounts found");
                found = found.overlay(block);
            }
        }
    }

    if found.total.is_none() {
        if let (Some(subtotal), Some(tax)) = (found.subtotal, found.tax) {
            found.total = Some(subtotal + tax);
        }
    }

    if found.total.is_none() {
        if let Some(rate) = found.tax_rate {
            found = found.overlay(total_from_rate(&numbers, rate, found));
        }
    }

    found
}

/// `N% IVA (s/<base>)` gives rate and base; the total comes from a `Total EUR` line.
fn rate_over_base(lines: &[&str]) -> Option<MonetaryAccumulator> {
    let text = lines.join("\n");
    let caps = IVA_SOBRE_BASE.captures(&text)?;

    let rate = Decimal::from_str(&caps[1]).ok().and_then(rate_from_percent)?;
    let base = parse_number(&caps[2])?;
    let tax = (base * rate).round_dp(2);
    let total = TOTAL_EUR
        .captures(&text)
        .and_then(|c| parse_number(&c[1]));

    Some(MonetaryAccumulator {
        total,
        subtotal: Some(base),
        tax: Some(tax),
        tax_rate: Some(rate),
    })
}

fn amount_to_pay(lines: &[&str], i: usize, current: Option<Decimal>) -> Option<Decimal> {
    if let Some(max) = max_number(lines[i]) {
        return Some(max);
    }

    let mut total = current;
    for line in lines.iter().skip(i + 1).take(PAY_LOOKAHEAD) {
        if let Some(candidate) = max_number(line) {
            if candidate > total.unwrap_or(Decimal::ZERO) {
                total = Some(candidate);
            }
        }
    }
    total
}

/// The `base rate cuota total` row near a tax summary header, in any column order.
fn tax_summary_row(
    lines: &[&str],
    header: usize,
    tolerances: &Tolerances,
) -> Option<MonetaryAccumulator> {
    let start = header.saturating_sub(HEADER_LOOKBEHIND);
    let end = (header + HEADER_LOOKAHEAD).min(lines.len());

    (start..end)
        .filter(|&j| j != header)
        .map(|j| lines[j])
        .filter(|line| {
            let upper = line.to_uppercase();
            !NON_VALUE_MARKERS.iter().any(|m| upper.contains(m))
        })
        .find_map(|line| decompose_row(line, tolerances))
}

fn decompose_row(line: &str, tolerances: &Tolerances) -> Option<MonetaryAccumulator> {
    let mut values = extract_numbers(line);
    for m in COMMON_RATE_INT.find_iter(line) {
        if let Ok(value) = Decimal::from_str(m.as_str()) {
            if !values.contains(&value) {
                values.push(value);
            }
        }
    }
    if values.len() < 3 {
        return None;
    }

    let percent = values
        .iter()
        .copied()
        .find(|v| SPANISH_IVA_RATES.iter().any(|r| *v == Decimal::from(*r)))?;
    let rate = rate_from_percent(percent)?;

    let mut others: Vec<Decimal> = values
        .into_iter()
        .filter(|v| *v != percent && *v > Decimal::ONE)
        .collect();
    others.sort_by(|a, b| b.cmp(a));

    match others.as_slice() {
        [total, base, tax, ..] if (*total - (*base + *tax)).abs() < tolerances.reconciliation => {
            Some(MonetaryAccumulator {
                total: Some(*total),
                subtotal: Some(*base),
                tax: Some(*tax),
                tax_rate: Some(rate),
            })
        }
        [total, base] => {
            let tax = *total - *base;
            ((tax - *base * rate).abs() < tolerances.rate_check).then_some(MonetaryAccumulator {
                total: Some(*total),
                subtotal: Some(*base),
                tax: Some(tax),
                tax_rate: Some(rate),
            })
        }
        _ => None,
    }
}

/// `<base> <rate>% <cuota>` on one of the lines after the header.
fn cuota_row(lines: &[&str], header: usize) -> Option<MonetaryAccumulator> {
    lines
        .iter()
        .skip(header + 1)
        .take(CUOTA_ROW_LOOKAHEAD)
        .find_map(|line| {
            let caps = BASE_RATE_CUOTA.captures(line)?;
            let base = parse_number(&caps[1])?;
            let rate = Decimal::from_str(&caps[2]).ok().and_then(rate_from_percent)?;
            let cuota = parse_number(&caps[3])?;

            Some(MonetaryAccumulator {
                total: Some(base + cuota),
                subtotal: Some(base),
                tax: Some(cuota),
                tax_rate: Some(rate),
            })
        })
}

/// Search every number in the document for `total = base + tax` with a believable rate.
fn document_table(numbers: &[Decimal], tolerances: &Tolerances) -> Option<MonetaryAccumulator> {
    let mut totals: Vec<Decimal> = numbers
        .iter()
        .copied()
        .filter(|v| *v > TABLE_MIN_TOTAL)
        .collect();
    totals.sort_by(|a, b| b.cmp(a));
    totals.dedup();

    for total in totals {
        let mut remaining: Vec<Decimal> = Vec::new();
        for &v in numbers {
            if v != total && v > Decimal::ZERO && v < total && !remaining.contains(&v) {
                remaining.push(v);
            }
        }

        let mut bases = remaining.clone();
        bases.sort_by(|a, b| b.cmp(a));

        for base in bases {
            let expected = total - base;
            let Some(tax) = remaining
                .iter()
                .copied()
                .find(|t| (*t - expected).abs() < tolerances.table_match && *t != base)
            else {
                continue;
            };

            if let Some(rate) = implied_rate(base, tax).filter(|r| is_plausible_rate(*r)) {
                return Some(MonetaryAccumulator {
                    total: Some(total),
                    subtotal: Some(base),
                    tax: Some(tax),
                    tax_rate: Some(rate),
                });
            }
        }
    }

    None
}

/// An explicit rate among the printed numbers, preferring the usual IVA rates.
fn common_rate(numbers: &[Decimal]) -> Option<Decimal> {
    let candidates: Vec<Decimal> = numbers
        .iter()
        .copied()
        .filter(|v| *v >= Decimal::ONE && *v <= Decimal::from(25))
        .collect();

    [10u32, 21, 4]
        .iter()
        .find_map(|r| candidates.iter().copied().find(|v| *v == Decimal::from(*r)))
        .or_else(|| candidates.first().copied())
        .and_then(rate_from_percent)
}

/// Largest number on line `i`, else on the first of the following lines that has any.
fn largest_on_or_after(lines: &[&str], i: usize, lookahead: usize) -> Option<Decimal> {
    max_number(lines[i]).or_else(|| {
        lines
            .iter()
            .skip(i + 1)
            .take(lookahead)
            .find_map(|line| max_number(line))
    })
}

/// `Suma`, `Subtotal`, `Impuesto`, `Total` labels followed by their values in the same order.
fn stacked_block(
    lines: &[&str],
    i: usize,
    tolerances: &Tolerances,
) -> Option<MonetaryAccumulator> {
    let labels: Vec<String> = lines
        .iter()
        .skip(i)
        .take(STACKED_LABEL_SPAN)
        .map(|l| l.to_uppercase())
        .collect();
    if !labels.iter().any(|l| l.contains("SUBTOTAL")) || !labels.iter().any(|l| l.contains("IMPUESTO")) {
        return None;
    }

    let mut values: Vec<Decimal> = Vec::new();
    for line in lines.iter().skip(i).take(STACKED_VALUE_SPAN) {
        let numbers = extract_numbers(line);
        if numbers.is_empty() {
            if values.len() >= STACKED_MIN_VALUES {
                break;
            }
        } else {
            values.extend(numbers);
        }
    }
    if values.len() < STACKED_MIN_VALUES {
        return None;
    }

    // Suma and Total print the same amount.
    let (first, last) = (values[0], values[values.len() - 1]);
    if (first - last).abs() >= tolerances.reconciliation {
        return None;
    }

    let mut interior: Vec<Decimal> = values[1..values.len() - 1]
        .iter()
        .copied()
        .filter(|v| *v > Decimal::ZERO && *v < last)
        .collect();
    interior.sort_by(|a, b| b.cmp(a));

    let mut block = MonetaryAccumulator {
        total: Some(last),
        ..Default::default()
    };
    if let Some((&subtotal, rest)) = interior.split_first() {
        block.subtotal = Some(subtotal);
        if let Some((tax, rate)) = rest.iter().find_map(|&tax| {
            implied_rate(subtotal, tax)
                .filter(|r| is_plausible_rate(*r))
                .map(|r| (tax, r))
        }) {
            block.tax = Some(tax);
            block.tax_rate = Some(rate);
        }
    }

    Some(block)
}

/// The largest printed number, accepted as total when it splits into a printed base or tax.
fn total_from_rate(
    numbers: &[Decimal],
    rate: Decimal,
    found: MonetaryAccumulator,
) -> MonetaryAccumulator {
    let Some(max) = numbers.iter().copied().max().filter(|m| *m > RATE_FALLBACK_MIN_TOTAL) else {
        return MonetaryAccumulator::default();
    };

    let base = max / (Decimal::ONE + rate);
    let tax = max - base;
    let near = |target: Decimal| {
        numbers
            .iter()
            .any(|n| (*n - target).abs() < RATE_FALLBACK_TOLERANCE)
    };
    if !near(base) && !near(tax) {
        return MonetaryAccumulator::default();
    }

    debug!(layout = "rate_fallback", total = %max, "Total derived from rate");
    MonetaryAccumulator {
        total: Some(max),
        subtotal: found.subtotal.or(Some(base)),
        tax: found.tax.or(Some(tax)),
        tax_rate: None,
    }
}

fn max_number(line: &str) -> Option<Decimal> {
    extract_numbers(line).into_iter().max()
}
