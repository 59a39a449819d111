//! Input document wrapper.

/// Raw OCR text together with its trimmed, non-empty lines.
#[derive(Debug, Clone)]
pub struct RawDocument<'a> {
    text: &'a str,
    lines: Vec<&'a str>,
}

impl<'a> RawDocument<'a> {
    pub fn new(text: &'a str) -> Self {
        let lines = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        Self { text, lines }
    }

    /// The text exactly as received.
    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn lines(&self) -> &[&'a str] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lines_are_trimmed_and_non_empty() {
        let doc = RawDocument::new("  BAR PEPE  \r\n\n\t\nTotal: 12,00 €\n   ");
        assert_eq!(doc.lines(), &["BAR PEPE", "Total: 12,00 €"]);
        assert!(!doc.is_empty());
    }

    #[test]
    fn test_blank_text_has_no_lines() {
        assert!(RawDocument::new("").is_empty());
        assert!(RawDocument::new(" \n \n").is_empty());
    }
}
