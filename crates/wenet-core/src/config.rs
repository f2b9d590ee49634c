//! Relay configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::envelope::{DEFAULT_ENVELOPE_ID, DEFAULT_ENVELOPE_TYPE};
use crate::errors::{RelayError, Result};

// ----------------------------------------------------------------------------
// Well-known Identifiers
// ----------------------------------------------------------------------------

/// Service advertised by telemetry beacons
pub const WENET_SERVICE_UUID: Uuid = Uuid::from_u128(0xfb63feb8_31ad_451d_a587_9fc20f9c8add);

/// Characteristic carrying sensor notifications
pub const WENET_SENSOR_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x3d235f0e_61f8_4455_89c6_2f7d73c33178);

/// UDP port the downstream relay listens on
pub const DEFAULT_RELAY_PORT: u16 = 55674;

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Configuration for one relay instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Pool size and capacity limit for concurrent connections
    pub device_count: usize,
    /// Longest time a batch stays open before it is flushed
    pub batch_timeout_ms: u64,
    /// Bound on a single connection attempt
    pub connection_timeout_ms: u64,
    /// How often a streaming connection is checked for liveness
    pub liveness_interval_ms: u64,
    /// Advertisements weaker than this (dBm) are ignored
    pub rssi_threshold: i16,
    /// Capacity of the discovery, packet and output queues
    pub queue_capacity: usize,
    pub service_uuid: Uuid,
    pub characteristic_uuid: Uuid,
    pub relay_host: String,
    pub relay_port: u16,
    pub envelope_type: String,
    pub envelope_id: u8,
    /// How long shutdown waits for tasks to unwind before aborting them
    pub shutdown_grace_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            device_count: 3,
            batch_timeout_ms: 10_000,
            connection_timeout_ms: 10_000,
            liveness_interval_ms: 1_000,
            rssi_threshold: -100,
            queue_capacity: 50,
            service_uuid: WENET_SERVICE_UUID,
            characteristic_uuid: WENET_SENSOR_CHARACTERISTIC_UUID,
            relay_host: "127.0.0.1".to_string(),
            relay_port: DEFAULT_RELAY_PORT,
            envelope_type: DEFAULT_ENVELOPE_TYPE.to_string(),
            envelope_id: DEFAULT_ENVELOPE_ID,
            shutdown_grace_ms: 5_000,
        }
    }
}

impl RelayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection pool size
    pub fn with_device_count(mut self, count: usize) -> Self {
        self.device_count = count;
        self
    }

    /// Set the batch assembly window
    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the connection attempt bound
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_liveness_interval(mut self, interval: Duration) -> Self {
        self.liveness_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_rssi_threshold(mut self, threshold: i16) -> Self {
        self.rssi_threshold = threshold;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the downstream relay endpoint
    pub fn with_relay(mut self, host: impl Into<String>, port: u16) -> Self {
        self.relay_host = host.into();
        self.relay_port = port;
        self
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn liveness_interval(&self) -> Duration {
        Duration::from_millis(self.liveness_interval_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Check the configuration for values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.device_count == 0 {
            return Err(RelayError::Config(
                "Device count must be greater than 0".to_string(),
            ));
        }
        if self.batch_timeout_ms == 0 || self.connection_timeout_ms == 0 {
            return Err(RelayError::Config(
                "Timeouts must be greater than 0".to_string(),
            ));
        }
        if self.liveness_interval_ms == 0 {
            return Err(RelayError::Config(
                "Liveness interval must be greater than 0".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(RelayError::Config(
                "Queue capacity must be greater than 0".to_string(),
            ));
        }
        if self.relay_port == 0 {
            return Err(RelayError::Config("Relay port must be set".to_string()));
        }
        Ok(())
    }
}
