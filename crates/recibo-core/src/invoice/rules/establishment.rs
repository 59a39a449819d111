//! Establishment (business name) extraction.
//!
//! Three ranked passes over the top of the receipt. A later pass only runs when every earlier
//! one came back empty.

use tracing::debug;

use crate::invoice::document::RawDocument;

use super::patterns::{
    ADDRESS_PREFIX, BUSINESS_KEYWORD, CITY_PATTERN, COMPANY_SUFFIX, EXACT_LABEL_WORDS,
    LEADING_NUMBER_TOKEN, NOISE_PATTERNS, POSTAL_CODE_PREFIX, SPANISH_CITIES,
};
use super::{FieldExtractor, FieldMatch};

const KEYWORD_PASS_LINES: usize = 15;
const SUFFIX_PASS_LINES: usize = 15;
const GENERIC_PASS_LINES: usize = 10;

/// Lines after a client marker that belong to the buyer block.
const CLIENT_BLOCK_LINES: usize = 4;

/// Establishment name extractor.
pub struct EstablishmentExtractor;

impl EstablishmentExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EstablishmentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for EstablishmentExtractor {
    type Output = String;

    fn extract(&self, doc: &RawDocument<'_>) -> Option<FieldMatch<String>> {
        let lines = doc.lines();
        let scan = LineScan {
            lines,
            client_marker: find_client_marker(lines),
        };

        let found = scan
            .first(KEYWORD_PASS_LINES, 3, 50, is_business_line)
            .map(|i| FieldMatch::new(lines[i].to_string(), "business_keyword").at_line(i))
            .or_else(|| {
                scan.first(SUFFIX_PASS_LINES, 3, 80, is_company_line)
                    .map(|i| FieldMatch::new(lines[i].to_string(), "company_suffix").at_line(i))
            })
            .or_else(|| {
                scan.first(GENERIC_PASS_LINES, 3, 50, is_commercial_name)
                    .map(|i| FieldMatch::new(lines[i].to_string(), "commercial_name").at_line(i))
            });

        if let Some(m) = &found {
            debug!(
                field = "establishment",
                strategy = m.rule,
                line = m.line,
                value = %m.value,
                "Establishment found"
            );
        }

        found
    }
}

/// Extract the establishment name from receipt lines.
pub fn extract_establishment(doc: &RawDocument<'_>) -> Option<String> {
    EstablishmentExtractor::new().extract(doc).map(|m| m.value)
}

struct LineScan<'d, 'a> {
    lines: &'d [&'a str],
    client_marker: Option<usize>,
}

impl LineScan<'_, '_> {
    /// Index of the first line in the prefix that has an acceptable length and passes `accept`.
    fn first(
        &self,
        prefix: usize,
        min_len: usize,
        max_len: usize,
        accept: fn(&str) -> bool,
    ) -> Option<usize> {
        self.lines
            .iter()
            .take(prefix)
            .enumerate()
            .find(|(i, line)| {
                let len = line.chars().count();
                len >= min_len
                    && len <= max_len
                    && !self.is_skipped(*i, line)
                    && accept(line)
            })
            .map(|(i, _)| i)
    }

    fn is_skipped(&self, index: usize, line: &str) -> bool {
        if line.to_lowercase().contains(".pdf") {
            return true;
        }
        matches!(
            self.client_marker,
            Some(marker) if index > marker && index <= marker + CLIENT_BLOCK_LINES
        )
    }
}

fn find_client_marker(lines: &[&str]) -> Option<usize> {
    lines.iter().position(|line| {
        let upper = line.to_uppercase();
        upper.contains("DATOS CLIENTE") || upper == "CLIENTE:" || upper == "CLIENTE"
    })
}

fn is_business_line(line: &str) -> bool {
    BUSINESS_KEYWORD.is_match(line) && !LEADING_NUMBER_TOKEN.is_match(line) && !line.contains('€')
}

fn is_company_line(line: &str) -> bool {
    COMPANY_SUFFIX.is_match(line) && !ADDRESS_PREFIX.is_match(line)
}

fn is_commercial_name(line: &str) -> bool {
    let upper = line.to_uppercase();

    if EXACT_LABEL_WORDS.contains(&upper.as_str()) {
        return false;
    }
    if is_city_line(&upper) {
        return false;
    }
    if NOISE_PATTERNS.iter().any(|p| p.is_match(&upper)) {
        return false;
    }

    let letters = line.chars().filter(|c| c.is_alphabetic()).count();
    let digits = line.chars().filter(|c| c.is_ascii_digit()).count();
    if digits > letters {
        return false;
    }

    if ADDRESS_PREFIX.is_match(&upper) || POSTAL_CODE_PREFIX.is_match(&upper) {
        return false;
    }

    letters > 0
}

fn is_city_line(upper: &str) -> bool {
    if upper.contains("DONOSTIA") || upper.contains("SAN SEBASTIAN") || CITY_PATTERN.is_match(upper)
    {
        return true;
    }

    SPANISH_CITIES.iter().any(|city| {
        upper == *city
            || upper
                .strip_prefix(city)
                .is_some_and(|rest| rest.starts_with(' ') || rest.starts_with(','))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn establishment(text: &str) -> Option<String> {
        extract_establishment(&RawDocument::new(text))
    }

    #[test]
    fn test_business_keyword_first_line() {
        let text = "RAMEN SHIFU SEVILLA\nRAMSHI SEVILLA S.L\nCIF: B70674528\nCalle Calatrava 22, Sevilla, 41002";
        assert_eq!(establishment(text).as_deref(), Some("RAMEN SHIFU SEVILLA"));
    }

    #[test]
    fn test_business_keyword_rejects_item_lines() {
        let text = "2 CAFE CON LECHE 3,00\nCAFE BAR 2,50 €\nCAFETERIA LUNA";
        assert_eq!(establishment(text).as_deref(), Some("CAFETERIA LUNA"));
    }

    #[test]
    fn test_company_suffix_pass() {
        let text = "OUIGO ESPAÑA, S.A.U\nCalle Alfonso XII, 62 4ª Planta\n28014 Madrid";
        assert_eq!(establishment(text).as_deref(), Some("OUIGO ESPAÑA, S.A.U"));
    }

    #[test]
    fn test_company_suffix_skips_address_lines() {
        let text = "CALLE MAYOR S.L. 3\nFACTURA\nLA TIENDA DE ANA";
        assert_eq!(establishment(text).as_deref(), Some("LA TIENDA DE ANA"));
    }

    #[test]
    fn test_generic_pass_skips_labels_and_cities() {
        let text = "FACTURA\nSEVILLA\n41002 SEVILLA\nCIF: B12345678\nKIM'S BAP (DAEIL KIM)";
        assert_eq!(establishment(text).as_deref(), Some("KIM'S BAP (DAEIL KIM)"));
    }

    #[test]
    fn test_client_block_is_skipped() {
        let text = "Empresa\nCliente\nFederico Ondarts\nCalle de Melchor 10\nPIOTTA ROMANA";
        assert_eq!(establishment(text), None);

        let text = "DATOS CLIENTE\nJuana Perez S.L.\nNIF 12345678Z\nTOTAL 10,00\nMadrid\nLibreria Gomez";
        assert_eq!(establishment(text).as_deref(), Some("Libreria Gomez"));
    }

    #[test]
    fn test_pdf_artefacts_are_skipped() {
        let text = "B44922904Factura19722.pdf\nPIOTTA";
        assert_eq!(establishment(text).as_deref(), Some("PIOTTA"));
    }

    #[test]
    fn test_nothing_qualifies() {
        assert_eq!(establishment(""), None);
        assert_eq!(establishment("12345678\nTOTAL 3,00 €\n€"), None);
    }
}
