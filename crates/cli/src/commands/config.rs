//! Config command - manage configuration.

use clap::{Args, Subcommand};
use console::style;

use receipt_scanner_core::models::config::{ScannerConfig, API_KEY_ENV};

use super::{config_path, load_config};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show current configuration (API key masked)
    Show,

    /// Initialize a new configuration file
    Init {
        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Store an API key in the configuration file
    SetKey { key: String },

    /// Show configuration file path
    Path,
}

pub fn run(args: ConfigArgs, explicit: Option<&str>) -> anyhow::Result<()> {
    let path = config_path(explicit);
    match args.command {
        ConfigCommand::Show => {
            let mut config = load_config(explicit)?;
            config.api_key = config.api_key.as_deref().map(mask);
            println!("{}", serde_json::to_string_pretty(&config)?);
            if std::env::var(API_KEY_ENV).is_ok() {
                println!("({API_KEY_ENV} is set and overrides api_key)");
            }
        }
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {}. Use --force to overwrite.",
                    path.display()
                );
            }
            ScannerConfig::default().save(&path)?;
            println!("{} Created configuration file at {}", style("✓").green(), path.display());
        }
        ConfigCommand::SetKey { key } => {
            let mut config = load_config(explicit)?;
            config.api_key = Some(key.trim().to_string()).filter(|k| !k.is_empty());
            config.save(&path)?;
            println!("{} API key saved to {}", style("✓").green(), path.display());
        }
        ConfigCommand::Path => {
            println!("Configuration file: {}", path.display());
            if path.exists() {
                println!("Status: {}", style("exists").green());
            } else {
                println!("Status: {}", style("not created").yellow());
                println!();
                println!("Run 'receipt-scan config init' to create a configuration file.");
            }
        }
    }
    Ok(())
}

fn mask(key: &str) -> String {
    let visible: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("****{visible}")
}
