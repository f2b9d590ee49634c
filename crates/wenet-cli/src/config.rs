//! Relay configuration loading
//!
//! Layers, lowest priority first:
//! - Built-in defaults
//! - A TOML file named by `WENET_BLE_CONFIG`, if set
//! - Command line arguments

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use tracing::info;
use wenet_core::RelayConfig;

use crate::cli::RelayCli;
use crate::error::Result;

/// Environment variable naming an optional TOML config file
pub const CONFIG_ENV_VAR: &str = "WENET_BLE_CONFIG";

/// Build the effective configuration for one relay run
pub fn load_relay_config(cli: &RelayCli) -> Result<RelayConfig> {
    let base = match std::env::var_os(CONFIG_ENV_VAR) {
        Some(path) => {
            info!("Loading configuration from: {}", Path::new(&path).display());
            load_from_file(Path::new(&path))?
        }
        None => RelayConfig::default(),
    };

    let config = apply_overrides(base, cli);
    config.validate()?;
    Ok(config)
}

pub fn load_from_file(path: &Path) -> Result<RelayConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_config(&text)
}

/// Parse a TOML document; missing keys keep their defaults
pub fn parse_config(text: &str) -> Result<RelayConfig> {
    Ok(toml::from_str(text)?)
}

pub fn apply_overrides(config: RelayConfig, cli: &RelayCli) -> RelayConfig {
    let config = config.with_device_count(cli.device_count);
    match cli.timeout {
        Some(secs) => config.with_batch_timeout(Duration::from_secs(secs)),
        None => config,
    }
}
