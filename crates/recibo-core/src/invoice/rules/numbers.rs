//! Locale-ambiguous number parsing for Spanish receipts.
//!
//! OCR output mixes "1.234,56" (Spanish) with "1,234.56" (English) and plain "44.55", so the
//! decimal separator is inferred per token rather than fixed by locale.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::NUMBER_TOKEN;

/// Integer digits above which a token is treated as OCR garbage rather than an amount.
const MAX_INTEGER_DIGITS: usize = 15;

/// Parse a numeric-looking string such as `"1.234,56 €"` into a decimal.
///
/// Returns `None` for anything that is not a plain number once the currency symbol and
/// whitespace are stripped.
pub fn parse_number(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '€' | '$' | '£'))
        .collect();
    let cleaned = cleaned.trim_end_matches([',', '.']);

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(comma), None) => {
            let decimals = cleaned.len() - comma - 1;
            if cleaned.matches(',').count() == 1 && decimals <= 2 {
                cleaned.replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        (None, _) => cleaned.to_string(),
    };

    let integer_digits = normalized
        .split('.')
        .next()
        .map(|p| p.trim_start_matches('-').len())
        .unwrap_or(0);
    if integer_digits > MAX_INTEGER_DIGITS {
        return None;
    }

    Decimal::from_str(&normalized).ok()
}

/// Every decimal token (`12,5`, `44.55`, ...) on a line, in reading order.
pub fn extract_numbers(line: &str) -> Vec<Decimal> {
    NUMBER_TOKEN
        .find_iter(line)
        .filter_map(|m| parse_number(m.as_str()))
        .collect()
}

/// Round an amount to cents.
pub fn round_amount(amount: Decimal) -> Decimal {
    amount.round_dp(2)
}
