//! Parse command - extract fields from a single OCR text file.

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use rust_decimal::Decimal;
use tracing::{debug, info};

use recibo_core::{InvoiceParser, ParsedInvoice, ReceiptParser, ReciboConfig};

use super::load_config;

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Input text file, or `-` for stdin
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Show the confidence score and missing fields
    #[arg(long)]
    show_confidence: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    /// File extension used when writing one file per receipt.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub fn run(args: ParseArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let text = read_input(&args.input)?;
    info!("Parsing {}", args.input.display());

    let parser = ReceiptParser::from_config(&config.extraction);
    let invoice = parser.parse(&text);

    let output = format_invoice(&invoice, args.format, &config)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output.trim_end());
    }

    if args.show_confidence {
        eprintln!();
        eprintln!(
            "{} Extraction confidence: {:.1}%",
            style("ℹ").blue(),
            invoice.confidence * 100.0
        );
        if invoice.needs_review(config.output.review_threshold) {
            eprintln!("{} Needs review", style("!").yellow());
        }
        let missing = invoice.missing_fields();
        if !missing.is_empty() {
            eprintln!("{} Missing: {}", style("ℹ").blue(), missing.join(", "));
        }
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn read_input(input: &PathBuf) -> anyhow::Result<String> {
    if input.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }

    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    Ok(fs::read_to_string(input)?)
}

pub fn format_invoice(
    invoice: &ParsedInvoice,
    format: OutputFormat,
    config: &ReciboConfig,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json if config.output.pretty_json => {
            Ok(serde_json::to_string_pretty(invoice)?)
        }
        OutputFormat::Json => Ok(serde_json::to_string(invoice)?),
        OutputFormat::Csv => format_csv(invoice),
        OutputFormat::Text => Ok(format_text(invoice)),
    }
}

fn format_csv(invoice: &ParsedInvoice) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "establishment",
        "date",
        "total",
        "subtotal",
        "tax",
        "tax_rate",
        "confidence",
    ])?;

    wtr.write_record([
        invoice.establishment.clone().unwrap_or_default(),
        invoice.date.map(|d| d.to_string()).unwrap_or_default(),
        amount(invoice.total),
        amount(invoice.subtotal),
        amount(invoice.tax),
        invoice.tax_rate.map(|r| r.normalize().to_string()).unwrap_or_default(),
        format!("{:.2}", invoice.confidence),
    ])?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(invoice: &ParsedInvoice) -> String {
    let or_dash = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
    let euros = |value: Option<Decimal>| or_dash(value.map(|v| format!("{} €", amount(Some(v)))));

    let mut output = String::new();

    output.push_str(&format!(
        "Establishment: {}\n",
        or_dash(invoice.establishment.clone())
    ));
    output.push_str(&format!(
        "Date: {}\n",
        or_dash(invoice.date.map(|d| d.format("%d/%m/%Y").to_string()))
    ));
    output.push('\n');

    output.push_str(&format!("  Subtotal: {}\n", euros(invoice.subtotal)));
    output.push_str(&format!("  IVA:      {}", euros(invoice.tax)));
    if let Some(rate) = invoice.tax_rate {
        output.push_str(&format!(" ({}%)", (rate * Decimal::ONE_HUNDRED).normalize()));
    }
    output.push('\n');
    output.push_str(&format!("  Total:    {}\n", euros(invoice.total)));

    output
}

/// Amount with exactly two decimals, empty when absent.
pub fn amount(value: Option<Decimal>) -> String {
    value
        .map(|v| format!("{:.2}", v.round_dp(2)))
        .unwrap_or_default()
}
