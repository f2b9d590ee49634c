//! Command-line interface definitions and parsing

use clap::{ArgGroup, Parser};
use uuid::Uuid;
use wenet_ble::DeviceSelector;

use crate::error::{CliError, Result};

/// Relay telemetry from Wenet BLE beacons to the local Wenet modem over UDP
#[derive(Parser, Debug)]
#[command(name = "wenet-ble", author, version, about, long_about = None)]
pub struct RelayCli {
    /// Number of beacons to stay connected to at once
    pub device_count: usize,

    /// Seconds to wait for a batch to fill before sending it anyway [default: 10]
    #[arg(short, long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

/// Connect to one beacon, list its characteristics and print notifications
#[derive(Parser, Debug)]
#[command(name = "wenet-probe", author, version, about, long_about = None)]
#[command(group(ArgGroup::new("device").required(true).args(["name", "address"])))]
pub struct ProbeCli {
    /// Advertised name of the device to connect to
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Bluetooth address of the device to connect to
    #[arg(long, value_name = "ADDRESS")]
    pub address: Option<String>,

    /// Only enumerate these services
    #[arg(long, value_name = "UUID", num_args = 1..)]
    pub services: Vec<Uuid>,

    /// Seconds to keep printing notifications before disconnecting
    #[arg(long, value_name = "SECONDS", default_value_t = 30)]
    pub duration: u64,
}

impl ProbeCli {
    pub fn selector(&self) -> Result<DeviceSelector> {
        match (&self.name, &self.address) {
            (Some(name), _) => Ok(DeviceSelector::Name(name.clone())),
            (None, Some(address)) => Ok(DeviceSelector::Address(address.clone())),
            (None, None) => Err(CliError::Config(
                "either --name or --address is required".to_string(),
            )),
        }
    }
}
