//! Test-key command - loose liveness check for an API key.

use clap::Args;
use console::style;

use receipt_scanner_core::services::extraction_client::ReceiptExtractionClient;

use super::load_config;

/// Arguments for the test-key command.
#[derive(Args)]
pub struct TestKeyArgs {
    /// Key to test (defaults to GEMINI_API_KEY / the config file)
    key: Option<String>,
}

pub async fn run(args: TestKeyArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let key = args
        .key
        .or_else(|| config.resolve_api_key())
        .ok_or_else(|| anyhow::anyhow!("No API key given or configured"))?;

    let mut client = ReceiptExtractionClient::from_config(&config);
    if client.test_api_key(&key).await {
        println!("{} API key works ({})", style("✓").green(), config.model);
        Ok(())
    } else {
        anyhow::bail!("API key check failed; run with -v for details")
    }
}
