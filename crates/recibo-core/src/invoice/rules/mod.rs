//! Rule-based field extractors for Spanish receipts.

pub mod amounts;
pub mod dates;
pub mod establishment;
pub mod multiline;
pub mod numbers;
pub mod patterns;
pub mod table;
pub mod vat;

pub use amounts::{extract_amounts, MonetaryAccumulator, Strategy, STRATEGIES};
pub use dates::{extract_date, DateExtractor};
pub use establishment::{extract_establishment, EstablishmentExtractor};
pub use numbers::{extract_numbers, parse_number};

use super::document::RawDocument;

/// Trait for single-field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from a document.
    fn extract(&self, doc: &RawDocument<'_>) -> Option<FieldMatch<Self::Output>>;
}

/// An extracted value together with the rule that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Name of the rule or pass that matched.
    pub rule: &'static str,
    /// Index of the source line, when the rule works line by line.
    pub line: Option<usize>,
}

impl<T> FieldMatch<T> {
    pub fn new(value: T, rule: &'static str) -> Self {
        Self {
            value,
            rule,
            line: None,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}
