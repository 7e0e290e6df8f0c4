//! Command-line front-end for extracting receipt data with a vision model.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use commands::{config, currency, extract, history, test_key};

/// Receipt scanner - turn receipt photos into itemized data
#[derive(Parser)]
#[command(name = "receipt-scan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract data from a receipt image or PDF
    Extract(extract::ExtractArgs),

    /// Inspect or edit the extraction history
    History(history::HistoryArgs),

    /// Check that an API key works
    TestKey(test_key::TestKeyArgs),

    /// Manage configuration
    Config(config::ConfigArgs),

    /// Currency formatting and detection helpers
    Currency(currency::CurrencyArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(cli.verbose, rust_log.as_deref()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Extract(args) => extract::run(args, config_path).await,
        Commands::History(args) => history::run(args, config_path),
        Commands::TestKey(args) => test_key::run(args, config_path).await,
        Commands::Config(args) => config::run(args, config_path),
        Commands::Currency(args) => currency::run(args),
    }
}

/// `-v` count picks the default level; `RUST_LOG` directives, when set, win.
fn log_filter(verbose: u8, rust_log: Option<&str>) -> EnvFilter {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .parse_lossy(rust_log.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_sets_default_level() {
        assert_eq!(log_filter(0, None).to_string(), "warn");
        assert_eq!(log_filter(2, None).to_string(), "debug");
        assert_eq!(log_filter(9, Some("")).to_string(), "trace");
    }

    #[test]
    fn rust_log_directives_are_honoured() {
        let filter = log_filter(0, Some("receipt_scanner_core=trace"));
        assert!(filter.to_string().contains("receipt_scanner_core=trace"), "{filter}");
    }
}
