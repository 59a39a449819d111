//! Date extraction for Spanish receipts.

use chrono::NaiveDate;
use regex::{Captures, Regex};
use tracing::debug;

use crate::invoice::document::RawDocument;

use super::patterns::{
    month_number, DATE_DMY, DATE_FECHA, DATE_FECHA_FACTURA, DATE_SPANISH_LONG, DATE_YMD,
};
use super::{FieldExtractor, FieldMatch};

/// How the captures of a date pattern map onto a calendar date.
#[derive(Clone, Copy)]
enum DateLayout {
    /// Three numeric groups; order decided by the first one.
    Numeric,
    /// Day, Spanish month name, year.
    SpanishLong,
}

/// Transaction date extractor.
pub struct DateExtractor;

impl DateExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Patterns in priority order.
    fn patterns() -> [(&'static str, &'static Regex, DateLayout); 5] {
        [
            ("dmy", &*DATE_DMY, DateLayout::Numeric),
            ("ymd", &*DATE_YMD, DateLayout::Numeric),
            ("fecha", &*DATE_FECHA, DateLayout::Numeric),
            ("fecha_factura", &*DATE_FECHA_FACTURA, DateLayout::Numeric),
            ("spanish_long", &*DATE_SPANISH_LONG, DateLayout::SpanishLong),
        ]
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = NaiveDate;

    fn extract(&self, doc: &RawDocument<'_>) -> Option<FieldMatch<NaiveDate>> {
        for (name, regex, layout) in Self::patterns() {
            let Some(caps) = regex.captures(doc.text()) else {
                continue;
            };

            let date = match layout {
                DateLayout::Numeric => numeric_date(&caps),
                DateLayout::SpanishLong => spanish_long_date(&caps),
            };

            match date {
                Some(date) => {
                    debug!(field = "date", strategy = name, value = %date, "Date found");
                    return Some(FieldMatch::new(date, name));
                }
                None => debug!(pattern = name, matched = &caps[0], "Impossible date skipped"),
            }
        }

        None
    }
}

/// Extract the transaction date from the full receipt text.
pub fn extract_date(doc: &RawDocument<'_>) -> Option<NaiveDate> {
    DateExtractor::new().extract(doc).map(|m| m.value)
}

fn numeric_date(caps: &Captures<'_>) -> Option<NaiveDate> {
    let first: u32 = caps[1].parse().ok()?;
    let second: u32 = caps[2].parse().ok()?;
    let third: u32 = caps[3].parse().ok()?;

    // A leading group that cannot be a day is the year.
    let (year, month, day) = if first > 31 {
        (first, second, third)
    } else {
        (third, second, first)
    };

    NaiveDate::from_ymd_opt(full_year(year)?, month, day)
}

fn spanish_long_date(caps: &Captures<'_>) -> Option<NaiveDate> {
    let day: u32 = caps[1].parse().ok()?;
    let month = month_number(&caps[2])?;
    let year: u32 = caps[3].parse().ok()?;

    NaiveDate::from_ymd_opt(full_year(year)?, month, day)
}

/// Two-digit years are 20xx.
fn full_year(year: u32) -> Option<i32> {
    let year = i32::try_from(year).ok()?;
    Some(if year < 100 { 2000 + year } else { year })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(text: &str) -> Option<NaiveDate> {
        extract_date(&RawDocument::new(text))
    }

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_extract_date_dmy() {
        assert_eq!(date("FECHA13/04/2025 HORA 22:28"), ymd(2025, 4, 13));
        assert_eq!(date("Ticket 0042\n05-11-2024"), ymd(2024, 11, 5));
    }

    #[test]
    fn test_extract_date_ymd() {
        assert_eq!(date("2024-01-15"), ymd(2024, 1, 15));
        assert_eq!(date("Emitido 2023/12/31 10:15"), ymd(2023, 12, 31));
    }

    #[test]
    fn test_two_digit_year() {
        assert_eq!(date("Fecha: 07/03/24"), ymd(2024, 3, 7));
    }

    #[test]
    fn test_leading_year_in_short_form() {
        assert_eq!(date("45/01/24"), ymd(2045, 1, 24));
    }

    #[test]
    fn test_extract_date_spanish_long() {
        assert_eq!(date("Madrid, 15 de enero de 2025"), ymd(2025, 1, 15));
        assert_eq!(date("1 de Septiembre de 23"), ymd(2023, 9, 1));
    }

    #[test]
    fn test_impossible_date_falls_through() {
        assert_eq!(date("32/13/2025"), None);
        assert_eq!(date("32/13/2025\n3 de marzo de 2025"), ymd(2025, 3, 3));
    }

    #[test]
    fn test_numeric_date_inside_digit_run_is_ignored() {
        assert_eq!(date("REF 123/04/20256"), None);
    }

    #[test]
    fn test_no_date() {
        assert_eq!(date(""), None);
        assert_eq!(date("TOTAL 12,50"), None);
    }
}
