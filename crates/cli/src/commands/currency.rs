//! Currency command - expose the formatting and detection helpers.

use clap::{Args, Subcommand};

use receipt_scanner_core::services::currency_format::{
    detect_currency_from_location, format_currency, get_currency_symbol, is_valid_currency_code,
};

/// Arguments for the currency command.
#[derive(Args)]
pub struct CurrencyArgs {
    #[command(subcommand)]
    command: CurrencyCommand,
}

#[derive(Subcommand)]
enum CurrencyCommand {
    /// Format an amount in a currency
    Format {
        amount: String,
        #[arg(default_value = "USD")]
        code: String,
    },

    /// Show the symbol for a currency code
    Symbol { code: String },

    /// Guess the currency for an address or country
    Detect {
        address: String,
        #[arg(long)]
        language: Option<String>,
    },
}

pub fn run(args: CurrencyArgs) -> anyhow::Result<()> {
    match args.command {
        CurrencyCommand::Format { amount, code } => {
            if !is_valid_currency_code(&code) {
                eprintln!("warning: '{code}' is not a known currency code, using USD");
            }
            println!("{}", format_currency(amount.as_str(), &code));
        }
        CurrencyCommand::Symbol { code } => println!("{}", get_currency_symbol(&code)),
        CurrencyCommand::Detect { address, language } => {
            println!("{}", detect_currency_from_location(Some(&address), language.as_deref()));
        }
    }
    Ok(())
}
