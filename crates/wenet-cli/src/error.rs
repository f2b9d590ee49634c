//! Error handling for the relay binaries

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Relay error: {0}")]
    Relay(#[from] wenet_core::RelayError),

    #[error("BLE transport error: {0}")]
    Ble(#[from] wenet_ble::BleTransportError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::Config(err.to_string())
    }
}
