//! BLE transport configuration

use std::time::Duration;

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Configuration for the BLE transport
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BleTransportConfig {
    /// Which local adapter to use when several are present
    pub adapter_index: usize,
    /// Bound on GATT service discovery after a connection opens
    pub service_discovery_timeout: Duration,
}

impl Default for BleTransportConfig {
    fn default() -> Self {
        Self {
            adapter_index: 0,
            service_discovery_timeout: Duration::from_secs(10),
        }
    }
}

impl BleTransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the adapter by position
    pub fn with_adapter_index(mut self, index: usize) -> Self {
        self.adapter_index = index;
        self
    }

    /// Set service discovery timeout
    pub fn with_service_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.service_discovery_timeout = timeout;
        self
    }
}
