//! History command - list, inspect and prune past extractions.

use clap::{Args, Subcommand};
use console::style;

use receipt_scanner_core::services::currency_format::format_currency;
use receipt_scanner_core::ReceiptScanner;

use super::extract::print_summary;
use super::load_config;

/// Arguments for the history command.
#[derive(Args)]
pub struct HistoryArgs {
    #[command(subcommand)]
    command: HistoryCommand,
}

#[derive(Subcommand)]
enum HistoryCommand {
    /// List stored extractions, newest first
    List {
        /// Zero-based page index
        #[arg(long, default_value_t = 0)]
        page: usize,
        #[arg(long, default_value_t = 10)]
        per_page: usize,
    },

    /// Show one extraction by id
    Show { id: String },

    /// Remove every extraction of a file
    Remove { file_name: String },

    /// Remove all extractions
    Clear,

    /// Print the whole history as JSON
    Export,
}

pub fn run(args: HistoryArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let mut scanner = ReceiptScanner::from_config(&config)?;

    match args.command {
        HistoryCommand::List { page, per_page } => {
            let entries = scanner.history_page(page, per_page);
            if entries.is_empty() {
                println!("{}", style("No extractions stored.").dim());
            }
            for r in entries {
                let total = r
                    .total
                    .as_ref()
                    .map(|t| format_currency(t, &r.currency))
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{}  {:<28} {:<24} {:>14}  {}",
                    r.timestamp.format("%Y-%m-%d %H:%M"),
                    r.file_name,
                    r.store_name.as_deref().unwrap_or("-"),
                    total,
                    style(&r.id).dim()
                );
            }
        }
        HistoryCommand::Show { id } => {
            let receipt = scanner
                .history_entry(&id)
                .ok_or_else(|| anyhow::anyhow!("No extraction with id {id}"))?;
            print_summary(receipt);
        }
        HistoryCommand::Remove { file_name } => {
            let removed = scanner.remove_from_history(&file_name);
            println!("{} Removed {removed} record(s)", style("✓").green());
        }
        HistoryCommand::Clear => {
            scanner.clear_history();
            println!("{} History cleared", style("✓").green());
        }
        HistoryCommand::Export => println!("{}", scanner.export_history_to_json()?),
    }
    Ok(())
}
