//! Error types for BLE transport

use thiserror::Error;
use wenet_core::RelayError;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors specific to the BLE transport
#[derive(Error, Debug)]
pub enum BleTransportError {
    #[error("BLE adapter not available")]
    AdapterNotAvailable,

    #[error("BLE adapter {index} not found ({available} available)")]
    AdapterIndexOutOfRange { index: usize, available: usize },

    #[error("Failed to start scan: {0}")]
    ScanFailed(String),

    #[error("Failed to get BLE events: {0}")]
    EventStreamFailed(String),

    #[error("Failed to connect to {address}: {reason}")]
    ConnectionFailed { address: String, reason: String },

    #[error("Failed to discover services on {address}: {reason}")]
    ServiceDiscoveryFailed { address: String, reason: String },

    #[error("Characteristic not found: {characteristic}")]
    CharacteristicNotFound { characteristic: String },

    #[error("Failed to subscribe to notifications: {0}")]
    SubscriptionFailed(String),

    #[error("Failed to get notifications stream: {0}")]
    NotificationStreamFailed(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("BLE stack error: {0}")]
    Btleplug(#[from] btleplug::Error),
}

impl From<BleTransportError> for RelayError {
    fn from(err: BleTransportError) -> Self {
        RelayError::Transport(err.to_string())
    }
}
