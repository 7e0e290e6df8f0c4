//! Extract command - run one receipt through the two-stage pipeline.

use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use receipt_scanner_core::models::receipt::ReceiptData;
use receipt_scanner_core::models::upload::ReceiptFile;
use receipt_scanner_core::services::currency_format::format_currency;
use receipt_scanner_core::ReceiptScanner;

use super::load_config;

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Receipt file (JPEG, PNG or PDF, up to 10 MB)
    #[arg(required = true)]
    input: PathBuf,

    /// Country the receipt is from (helps currency and date detection)
    #[arg(long)]
    country: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Full record as JSON
    Json,
    /// Line items as CSV
    Csv,
    /// Human-readable summary
    Pretty,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let mut scanner = ReceiptScanner::from_config(&config)?;
    if !scanner.is_initialized() {
        anyhow::bail!(
            "No API key configured. Set GEMINI_API_KEY or run 'receipt-scan config set-key <KEY>'."
        );
    }

    let file = ReceiptFile::from_path(&args.input)?;
    info!(file = %file.file_name, "extracting");

    let receipt = scanner.extract(&file, args.country.as_deref()).await?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&receipt)?),
        OutputFormat::Csv => print!("{}", receipt.to_csv()),
        OutputFormat::Pretty => print_summary(&receipt),
    }
    Ok(())
}

pub fn print_summary(receipt: &ReceiptData) {
    let cur = receipt.currency.as_str();
    println!(
        "{} {}",
        style("✓").green(),
        style(receipt.store_name.as_deref().unwrap_or("Unknown store")).bold()
    );
    if let Some(address) = &receipt.address {
        println!("  {address}");
    }
    if let Some(date) = &receipt.date {
        println!("  Date: {date}");
    }
    println!();
    for item in &receipt.items {
        let line = format!("{:>5} x {}", item.quantity.to_string(), item.name);
        let price = format_currency(&item.price, cur);
        if item.is_discount() {
            println!("  {:<44} {:>14}", line, style(price).yellow());
        } else {
            println!("  {line:<44} {price:>14}");
        }
    }
    println!();
    if let Some(discount) = &receipt.total_discount {
        println!("  {:<44} {:>14}", "Discount", format_currency(discount, cur));
    }
    if let Some(tax) = &receipt.tax {
        println!("  {:<44} {:>14}", "Tax", format_currency(tax, cur));
    }
    if let Some(total) = &receipt.total {
        println!("  {:<44} {:>14}", style("Total").bold(), format_currency(total, cur));
    }
    println!("  Items: {}  ({})  id {}", receipt.derived_total_items(), cur, receipt.id);
}
