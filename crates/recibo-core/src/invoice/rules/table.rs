//! Fallback for formal invoices printed as a label column next to a value column.

use rust_decimal::Decimal;
use std::ops::Range;

use crate::invoice::document::RawDocument;
use crate::models::config::Tolerances;

use super::amounts::MonetaryAccumulator;
use super::numbers::{extract_numbers, parse_number};
use super::patterns::{BAS_RATE_CUOTA, NUMBER_TOKEN, PERCENT_TOKEN};
use super::vat::rate_from_percent;

/// Lines after a label that may hold its value.
const VALUE_LOOKAHEAD: usize = 2;

/// Largest number still read as a percentage on an IVA line.
const MAX_PERCENT: Decimal = Decimal::from_parts(25, 0, 0, false, 0);

const STRATEGY: &str = "table";

/// Table-format strategy. Skipped once total, subtotal and tax are all known.
pub fn table_format(
    doc: &RawDocument<'_>,
    _tolerances: &Tolerances,
    acc: MonetaryAccumulator,
) -> MonetaryAccumulator {
    if acc.has_all_amounts() {
        return acc;
    }

    let lines = doc.lines();
    let mut found = MonetaryAccumulator::default();

    for (i, raw) in lines.iter().enumerate() {
        let line = raw.to_uppercase();

        if line.contains("TOTAL") && !line.contains("SUBTOTAL") {
            if let Some(total) = largest_nearby(lines, i) {
                found.total = Some(total);
            }
        }

        if line.contains("SUBTOTAL") || (line.contains("BASE") && !line.contains("IMPORTE")) {
            if let Some(subtotal) = largest_nearby(lines, i) {
                found.subtotal = Some(subtotal);
            }
        }

        if (line.contains("IVA") || line.contains("I.V.A")) && !line.contains("IMPONIBLE") {
            read_iva_line(raw, &mut found);
        }
    }

    let acc = acc.fill_absent(found, STRATEGY);
    if acc.subtotal.is_none() || acc.tax.is_none() || acc.tax_rate.is_none() {
        acc.fill_absent(bas_row(lines), STRATEGY)
    } else {
        acc
    }
}

fn largest_nearby(lines: &[&str], i: usize) -> Option<Decimal> {
    std::iter::once(lines[i])
        .chain(lines.iter().skip(i + 1).take(VALUE_LOOKAHEAD).copied())
        .find_map(|line| extract_numbers(line).into_iter().max())
}

/// Split an IVA line into a tax amount and a rate.
fn read_iva_line(line: &str, found: &mut MonetaryAccumulator) {
    let percents: Vec<Range<usize>> = PERCENT_TOKEN.find_iter(line).map(|m| m.range()).collect();
    let mut amounts: Vec<Decimal> = NUMBER_TOKEN
        .find_iter(line)
        .filter(|m| !percents.iter().any(|p| p.contains(&m.start())))
        .filter_map(|m| parse_number(m.as_str()))
        .collect();
    amounts.sort();

    match amounts.as_slice() {
        [] => {}
        [smallest, ..] if !percents.is_empty() => found.tax = Some(*smallest),
        [only] => {
            if *only > MAX_PERCENT || found.tax.is_none() {
                found.tax = Some(*only);
            }
        }
        [smallest, .., largest] => {
            if *smallest <= MAX_PERCENT {
                found.tax_rate = rate_from_percent(*smallest);
                found.tax = Some(*largest);
            }
        }
    }

    let explicit = PERCENT_TOKEN
        .captures(line)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .filter(|p| (1..=25).contains(p));
    if let Some(percent) = explicit {
        found.tax_rate = rate_from_percent(Decimal::from(percent));
    }
}

/// `BAS <base> <rate>% <tax>` anywhere in the document.
fn bas_row(lines: &[&str]) -> MonetaryAccumulator {
    lines
        .iter()
        .find_map(|line| {
            let caps = BAS_RATE_CUOTA.captures(line)?;
            let base = parse_number(&caps[1])?;
            let percent: Decimal = caps[2].parse().ok()?;
            let tax = parse_number(&caps[3])?;

            Some(MonetaryAccumulator {
                total: None,
                subtotal: Some(base),
                tax: Some(tax),
                tax_rate: rate_from_percent(percent),
            })
        })
        .unwrap_or_default()
}
