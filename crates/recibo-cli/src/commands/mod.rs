//! Subcommands of the `recibo` binary.

pub mod batch;
pub mod config;
pub mod parse;

use std::path::{Path, PathBuf};

use recibo_core::ReciboConfig;
use tracing::debug;

/// Location of the user configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("recibo")
        .join("config.json")
}

/// Config file to use: the `--config` argument, else the user configuration file.
pub fn config_path(explicit: Option<&str>) -> PathBuf {
    explicit.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load the configuration named by `--config`, falling back to the user file, then defaults.
///
/// An explicit path must exist; a missing user file just means defaults.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<ReciboConfig> {
    if let Some(path) = explicit {
        let path = Path::new(path);
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        return Ok(ReciboConfig::from_file(path)?);
    }

    let path = default_config_path();
    if path.exists() {
        debug!("Loading configuration from {}", path.display());
        Ok(ReciboConfig::from_file(&path)?)
    } else {
        Ok(ReciboConfig::default())
    }
}
