//! CLI subcommands.

pub mod config;
pub mod currency;
pub mod extract;
pub mod history;
pub mod test_key;

use std::path::{Path, PathBuf};

use receipt_scanner_core::models::config::ScannerConfig;

/// Config file path: `--config` if given, else the platform default.
pub fn config_path(explicit: Option<&str>) -> PathBuf {
    explicit
        .map(PathBuf::from)
        .unwrap_or_else(ScannerConfig::default_path)
}

/// Load the config file, or defaults when it does not exist yet.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<ScannerConfig> {
    let path = config_path(explicit);
    if path.exists() {
        Ok(ScannerConfig::from_file(Path::new(&path))?)
    } else {
        Ok(ScannerConfig::default())
    }
}
