//! Wenet BLE relay command-line tools
//!
//! - `wenet-ble`: the relay itself
//! - `wenet-probe`: GATT inspection of a single beacon

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod probe;

pub use cli::{ProbeCli, RelayCli};
pub use config::{load_relay_config, CONFIG_ENV_VAR};
pub use error::{CliError, Result};
pub use logging::setup_logging;
