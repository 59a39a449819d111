//! Common regex patterns and lookup tables for Spanish receipt extraction.
//!
//! Everything here is built once on first use and never mutated afterwards.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

/// A labelled amount pattern used by the direct-pattern strategy.
///
/// The value is always captured by the group named `value`. Constructs that need look-around are
/// expressed as extra optional groups: if any group listed in `reject_if` participates in a match,
/// that match is discarded and the search continues.
pub struct FieldPattern {
    /// Short identifier reported in trace events.
    pub name: &'static str,
    pub regex: Regex,
    pub reject_if: &'static [&'static str],
}

impl FieldPattern {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self::guarded(name, pattern, &[])
    }

    fn guarded(name: &'static str, pattern: &str, reject_if: &'static [&'static str]) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).unwrap(),
            reject_if,
        }
    }

    /// The captured `value` text of the first match not vetoed by a guard group.
    pub fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.regex
            .captures_iter(text)
            .find(|caps| !self.is_rejected(caps))
            .and_then(|caps| caps.name("value"))
            .map(|m| m.as_str())
    }

    fn is_rejected(&self, caps: &Captures<'_>) -> bool {
        self.reject_if.iter().any(|g| caps.name(g).is_some())
    }
}

lazy_static! {
    // Any decimal token with one or two fraction digits.
    pub static ref NUMBER_TOKEN: Regex = Regex::new(r"\d+[.,]\d{1,2}").unwrap();

    // Total amount, most specific first
    pub static ref TOTAL_PATTERNS: Vec<FieldPattern> = vec![
        FieldPattern::new(
            "total_impuestos_incl",
            r"(?i)TOTAL\s*\(Impuestos\s*Incl\.?\)[^\n]*?(?P<value>\d+[.,]\d{2})",
        ),
        FieldPattern::new(
            "total_imp_incl",
            r"(?i)TOTAL\s*\(Imp\.?\s*Incl\.?\)[^\n]*?(?P<value>\d+[.,]\d{2})",
        ),
        FieldPattern::new("total_con_iva", r"(?i)TOTAL\s+CON\s+IVA[^\n]*?(?P<value>\d+[.,]\d{2})"),
        FieldPattern::new("total_a_pagar", r"(?i)TOTAL\s+A\s+PAGAR[^\n]*?(?P<value>\d+[.,]\d{2})"),
        FieldPattern::new("total_eur", r"(?i)TOTAL\s+EUR[^\n]*?(?P<value>\d+[.,]\d{2})"),
        FieldPattern::new("total_line_start", r"(?im)^\s*TOTAL[^\n]*?(?P<value>\d+[.,]\d{2})"),
        FieldPattern::new(
            "total_label",
            r"(?im)^[^S\n]*TOTAL\s*:?\s*€?\s*(?P<value>\d+[.,]\d{2})",
        ),
        FieldPattern::new("total_visa", r"(?i)VISA[^\n]*?(?P<value>\d+[.,]\d{2})"),
        FieldPattern::new("total_tarjeta", r"(?i)TARJETA[^\n]*?(?P<value>\d+[.,]\d{2})"),
        FieldPattern::new("total_entregado", r"(?i)ENTREGADO[^\n]*?(?P<value>\d+[.,]\d{2})"),
    ];

    // Taxable base
    pub static ref SUBTOTAL_PATTERNS: Vec<FieldPattern> = vec![
        FieldPattern::new("base_imponible", r"(?i)BASE\s*IMPONIBLE[^\n]*?(?P<value>\d+[.,]\d{2})"),
        FieldPattern::new("b_imponible", r"(?i)B\.?IMPONIBLE[^\n]*?(?P<value>\d+[.,]\d{2})"),
        FieldPattern::guarded(
            "subtotal",
            r"(?i)(?P<de>\bde\s)?Subtotal\s*:?\s*(?P<value>\d+[.,]\d{2})",
            &["de"],
        ),
        FieldPattern::new("base_colon", r"(?i)Base\s*:[^\n]*?(?P<value>\d+[.,]\d{2})"),
        FieldPattern::new(
            "rate_then_base",
            r"(?i)\d+\s*%\s*:?\s*Base\s*:?\s*(?P<value>\d+[.,]\d{2})",
        ),
        FieldPattern::new("bas_then_rate", r"(?i)\bBASE?\s+(?P<value>\d+[.,]\d{2})\s+\d+\s*%"),
    ];

    // Tax amount
    pub static ref TAX_PATTERNS: Vec<FieldPattern> = vec![
        FieldPattern::new("cuota", r"(?i)CUOTA[^\n]*?(?P<value>\d+[.,]\d{2})"),
        FieldPattern::guarded(
            "imp_iva",
            r"(?i)\bIMP\.?\s*IVA\s*:?\s*(?P<value>\d+[.,]\d{2})[ \t]*€?(?P<more>\s*\d)?",
            &["more"],
        ),
        FieldPattern::new("importe_iva", r"(?i)IMPORTE\s*IVA\s*:?\s*(?P<value>[\d.,]+)"),
        FieldPattern::guarded(
            "iva_rate_amount",
            r"(?i)I\.?V\.?A\.?\s*[\d.,]+\s*%\s+(?P<value>[\d.,]+)(?P<tail>\s*[,)])?",
            &["tail"],
        ),
        FieldPattern::new(
            "iva_rate_then_amount",
            r"(?i)I\.?V\.?A\.?\s*\d+[,.]?\d*\s*%[^(s/\n][^\n]*?(?P<value>\d+[.,]\d{2})",
        ),
        FieldPattern::new("impuesto", r"(?i)Impuesto\s*:?\s*(?P<value>\d+[.,]\d{2})"),
        FieldPattern::guarded(
            "iva_amount",
            r"(?i)(?P<open>\()?IVA\s*:?\s*(?P<value>\d+[.,]\d{2})[ \t]*€?(?P<close>\))?",
            &["open", "close"],
        ),
        FieldPattern::guarded(
            "percent_amount",
            r"(?i)\d+%\s+(?P<value>\d+[.,]\d{2})[ \t]*€?(?P<more>\s*\d)?",
            &["more"],
        ),
        FieldPattern::guarded(
            "bas_rate_amount",
            r"(?i)\bBASE?\s+[\d.,]+\s+\d+\s*%\s+(?P<value>\d+[.,]\d{2})(?P<more>\s*\d)?",
            &["more"],
        ),
    ];

    // Tax rate, captured as a percentage
    pub static ref TAX_RATE_PATTERNS: Vec<FieldPattern> = vec![
        FieldPattern::new("iva_percent", r"(?i)I\.?V\.?A\.?\s*(?P<value>[\d.,]+)\s*%"),
        FieldPattern::new("percent_base", r"(?i)(?P<value>[\d.,]+)\s*%\s*:?\s*Base"),
        FieldPattern::new("iva_int_percent", r"(?i)IVA\s*(?P<value>\d+)%"),
        FieldPattern::new("bas_percent", r"(?i)\bBASE?\s+[\d.,]+\s+(?P<value>\d+)\s*%"),
        FieldPattern::new("se_imp_iva", r"(?i)SE\s+IMP\s+IVA\s+(?P<value>\d+)%"),
    ];

    // Multiline layouts
    pub static ref IVA_SOBRE_BASE: Regex =
        Regex::new(r"(?i)(\d+)\s*%\s*IVA\s*\(s/([\d.,]+)\)").unwrap();
    pub static ref TOTAL_EUR: Regex =
        Regex::new(r"(?i)Total\s+EUR[^\n]*?(\d+[.,]\d{2})").unwrap();
    pub static ref BASE_RATE_CUOTA: Regex =
        Regex::new(r"(\d+[.,]\d{2})\s+(\d+)%\s+(\d+[.,]\d{2})").unwrap();
    pub static ref BAS_RATE_CUOTA: Regex =
        Regex::new(r"(?i)\bBAS\s+(\d+[.,]\d{2})\s+(\d+)%\s+(\d+[.,]\d{2})").unwrap();
    pub static ref COMMON_RATE_INT: Regex = Regex::new(r"\b(21|10|4)\b").unwrap();
    pub static ref PERCENT_TOKEN: Regex = Regex::new(r"(\d+)[,.]?\d*\s*%").unwrap();

    // Dates
    pub static ref DATE_DMY: Regex = Regex::new(
        r"(?:^|\D)(\d{1,2})[/\-](\d{1,2})[/\-](\d{2,4})(?:\D|$)"
    ).unwrap();

    pub static ref DATE_YMD: Regex = Regex::new(
        r"(?:^|\D)(\d{4})[/\-](\d{1,2})[/\-](\d{1,2})(?:\D|$)"
    ).unwrap();

    pub static ref DATE_FECHA: Regex = Regex::new(
        r"(?i)FECHA[:\s]*(\d{1,2})[/\-](\d{1,2})[/\-](\d{2,4})"
    ).unwrap();

    pub static ref DATE_FECHA_FACTURA: Regex = Regex::new(
        r"(?i)Fecha\s+de\s+factura[:\s]*(\d{1,2})[/\-](\d{1,2})[/\-](\d{2,4})"
    ).unwrap();

    pub static ref DATE_SPANISH_LONG: Regex = Regex::new(
        r"(?i)(\d{1,2})\s+de\s+(enero|febrero|marzo|abril|mayo|junio|julio|agosto|septiembre|octubre|noviembre|diciembre)\s+de\s+(\d{2,4})"
    ).unwrap();

    // Establishment
    pub static ref BUSINESS_KEYWORD: Regex = Regex::new(
        r"(?i)\b(?:RAMEN|RESTAURANTE|BAR|CAFE|CAFETERIA|PIZZERIA|BURGER|SUSHI|TAPAS|TABERNA|CERVECERIA|ASADOR|PARRILLA|MARISQUERIA|BOCATERIA|KEBAB|WOK|GRILL)\b"
    ).unwrap();

    pub static ref COMPANY_SUFFIX: Regex = Regex::new(
        r"(?i)\bS\.?L\.?U\.?\b|\bS\.?A\.?U\.?\b|\bS\.?L\.?\b|\bS\.?A\.?\b"
    ).unwrap();

    pub static ref ADDRESS_PREFIX: Regex = Regex::new(
        r"(?i)^(?:C/|CALLE|PLAZA|AVDA|AVENIDA|PASEO)"
    ).unwrap();

    pub static ref POSTAL_CODE_PREFIX: Regex = Regex::new(r"^\d{5}").unwrap();

    pub static ref LEADING_NUMBER_TOKEN: Regex = Regex::new(r"^\d+\s+").unwrap();

    pub static ref CITY_PATTERN: Regex = Regex::new(
        r"(?i)DONOSTIA.*SAN.*SEBASTIAN|SAN.*SEBASTIAN|\d{5}.*(?:MADRID|BARCELONA|SEVILLA|VALENCIA)"
    ).unwrap();

    // Labels and OCR noise that never name a business
    pub static ref NOISE_PATTERNS: Vec<Regex> = [
        r"FACTURA", r"TICKET", r"RECIBO", r"FECHA", r"TOTAL", r"IVA", r"SUBTOTAL", r"BASE",
        r"IMPORTE", r"NIF", r"CIF", r"DIRECCION", r"C\.?P\.?", r"POBLACION", r"CLIENTE",
        r"MESA", r"VENDEDOR", r"HORA", r"TELEFONO", r"TEL\.", r"TLF", r"FORMA DE PAGO",
        r"TARJETA", r"EFECTIVO", r"CAMBIO", r"ENTREGADO", r"GRACIAS", r"ATENDIDO",
        r"COMENSALES", r"UNID", r"DESCRIPCION", r"PRECIO", r"PRODUCTO", r"CONCEPTO",
        r"CANTIDAD", r"€", r"\d{5,}", r"\d+[,.]\d{2}\s*€?", r"OBSERVACIONES", r"METODO",
        r"PAGO", r"ENTREGA", r"ALBARAN", r"EAN", r"\.PDF",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){}", p)).unwrap())
    .collect();
}

/// Label words that sit alone on a line above the real names.
pub const EXACT_LABEL_WORDS: &[&str] = &["EMPRESA", "CLIENTE", "FACTURA"];

/// Spanish cities and country names frequently printed under the business name.
pub const SPANISH_CITIES: &[&str] = &[
    "MADRID", "BARCELONA", "VALENCIA", "SEVILLA", "ZARAGOZA", "MALAGA", "MURCIA", "PALMA",
    "BILBAO", "ALICANTE", "CORDOBA", "VALLADOLID", "VIGO", "GIJON", "GRANADA", "ELCHE", "OVIEDO",
    "DONOSTIA", "DONOSTI", "SAN SEBASTIAN", "SANTANDER", "PAMPLONA", "ALMERIA", "BURGOS", "LEON",
    "SALAMANCA", "ALBACETE", "GETAFE", "ALCALA", "ESPAÑA", "ESPANA",
];

/// Spanish month names in calendar order.
pub const SPANISH_MONTHS: [&str; 12] = [
    "enero", "febrero", "marzo", "abril", "mayo", "junio", "julio", "agosto", "septiembre",
    "octubre", "noviembre", "diciembre",
];

/// Month number (1-12) for a Spanish month name, case-insensitively.
pub fn month_number(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    SPANISH_MONTHS
        .iter()
        .position(|m| *m == name)
        .map(|i| i as u32 + 1)
}
