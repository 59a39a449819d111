//! Receipt field extraction module.

pub mod confidence;
pub mod document;
mod parser;
pub mod reconcile;
pub mod rules;

pub use document::RawDocument;
pub use parser::{parse_invoice, InvoiceParser, ReceiptParser};
pub use reconcile::{reconcile, reconcile_with};
