//! Bluetooth Low Energy transport for the Wenet relay
//!
//! This crate implements the `BeaconTransport` and `BeaconLink` traits from
//! `wenet-core` on top of btleplug, so the relay pipeline can scan for,
//! connect to and stream notifications from telemetry beacons.
//!
//! ## Architecture
//!
//! - [`config`] - Adapter selection and timeouts
//! - [`error`] - Error types specific to the BLE transport
//! - [`protocol`] - GATT identifiers
//! - [`discovery`] - Adapter setup and advertisement scanning
//! - [`connection`] - Connections and notification streams
//! - [`transport`] - The `BeaconTransport` implementation
//! - [`inspect`] - GATT inspection used by the probe tool
//!
//! ## Usage
//!
//! ```rust,no_run
//! use wenet_ble::BleTransport;
//! use wenet_core::{BeaconTransport, ScanFilter, WENET_SERVICE_UUID};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = BleTransport::new().await?;
//! let _advertisements = transport
//!     .start_scan(&ScanFilter::new(WENET_SERVICE_UUID, -100))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod discovery;
pub mod error;
pub mod inspect;
pub mod protocol;
pub mod transport;

// Public API exports
pub use config::BleTransportConfig;
pub use connection::BleLink;
pub use discovery::BleDiscovery;
pub use error::BleTransportError;
pub use inspect::{CharacteristicReport, DeviceSelector};
pub use protocol::{CHARACTERISTIC_USER_DESCRIPTION_UUID, ESS_SERVICE_UUID};
pub use transport::BleTransport;

// Re-export the peripheral type used as the device handle
pub use btleplug::platform::Peripheral;
