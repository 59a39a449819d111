//! Batch command for multiple OCR text files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, error, warn};

use recibo_core::{InvoiceParser, ParsedInvoice, ReceiptParser};

use super::load_config;
use super::parse::{amount, format_invoice, OutputFormat};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching the input text files
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    invoice: Option<ParsedInvoice>,
    error: Option<String>,
    processing_time_ms: u64,
}

/// One row of `summary.csv`.
#[derive(Serialize)]
struct SummaryRow<'a> {
    filename: &'a str,
    status: &'a str,
    establishment: &'a str,
    date: String,
    total: String,
    subtotal: String,
    tax: String,
    tax_rate: String,
    confidence: String,
    needs_review: String,
    processing_time_ms: u64,
    error: &'a str,
}

pub fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let parser = ReceiptParser::from_config(&config.extraction);
    let mut results = Vec::with_capacity(files.len());

    for path in files {
        let file_start = Instant::now();
        let result = fs::read_to_string(&path).map(|text| parser.parse(&text));
        let processing_time_ms = file_start.elapsed().as_millis() as u64;

        match result {
            Ok(invoice) => results.push(ProcessResult {
                path,
                invoice: Some(invoice),
                error: None,
                processing_time_ms,
            }),
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(ProcessResult {
                        path,
                        invoice: None,
                        error: Some(error_msg),
                        processing_time_ms,
                    });
                } else {
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    progress.abandon();
                    anyhow::bail!("Processing failed for {}: {}", path.display(), error_msg);
                }
            }
        }

        progress.inc(1);
    }

    progress.finish_and_clear();

    let successful: Vec<_> = results.iter().filter(|r| r.invoice.is_some()).collect();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();
    let to_review = successful
        .iter()
        .filter_map(|r| r.invoice.as_ref())
        .filter(|i| i.needs_review(config.output.review_threshold))
        .count();

    if let Some(output_dir) = &args.output_dir {
        for result in &successful {
            let Some(invoice) = &result.invoice else {
                continue;
            };
            let output_name = result
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("receipt");
            let output_path =
                output_dir.join(format!("{}.{}", output_name, args.format.extension()));

            fs::write(&output_path, format_invoice(invoice, args.format, &config)?)?;
            debug!("Wrote output to {}", output_path.display());
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results, config.output.review_threshold)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed, {} to review",
        style(successful.len()).green(),
        style(failed.len()).red(),
        style(to_review).yellow()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn write_summary(path: &Path, results: &[ProcessResult], threshold: f64) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        let row = match &result.invoice {
            Some(invoice) => SummaryRow {
                filename,
                status: "success",
                establishment: invoice.establishment.as_deref().unwrap_or(""),
                date: invoice.date.map(|d| d.to_string()).unwrap_or_default(),
                total: amount(invoice.total),
                subtotal: amount(invoice.subtotal),
                tax: amount(invoice.tax),
                tax_rate: invoice
                    .tax_rate
                    .map(|r| r.normalize().to_string())
                    .unwrap_or_default(),
                confidence: format!("{:.2}", invoice.confidence),
                needs_review: invoice.needs_review(threshold).to_string(),
                processing_time_ms: result.processing_time_ms,
                error: "",
            },
            None => SummaryRow {
                filename,
                status: "error",
                establishment: "",
                date: String::new(),
                total: String::new(),
                subtotal: String::new(),
                tax: String::new(),
                tax_rate: String::new(),
                confidence: String::new(),
                needs_review: String::new(),
                processing_time_ms: result.processing_time_ms,
                error: result.error.as_deref().unwrap_or(""),
            },
        };
        wtr.serialize(row)?;
    }

    wtr.flush()?;
    Ok(())
}
