//! btleplug-backed beacon transport

use async_trait::async_trait;
use btleplug::platform::Peripheral;
use wenet_core::{
    AdvertisementStream, BeaconLink, BeaconTransport, Result as RelayResult, ScanFilter,
};

use crate::config::BleTransportConfig;
use crate::connection::BleLink;
use crate::discovery::BleDiscovery;
use crate::error::BleTransportError;

// ----------------------------------------------------------------------------
// BLE Transport
// ----------------------------------------------------------------------------

/// Wireless transport collaborator over the platform BLE stack
#[derive(Debug, Clone)]
pub struct BleTransport {
    config: BleTransportConfig,
    discovery: BleDiscovery,
}

impl BleTransport {
    /// Open the local adapter with default settings
    pub async fn new() -> Result<Self, BleTransportError> {
        Self::with_config(BleTransportConfig::default()).await
    }

    pub async fn with_config(config: BleTransportConfig) -> Result<Self, BleTransportError> {
        let discovery = BleDiscovery::initialize(&config).await?;
        Ok(Self { config, discovery })
    }

    pub fn discovery(&self) -> &BleDiscovery {
        &self.discovery
    }

    pub fn config(&self) -> &BleTransportConfig {
        &self.config
    }
}

#[async_trait]
impl BeaconTransport for BleTransport {
    type Device = Peripheral;

    async fn start_scan(&self, filter: &ScanFilter) -> RelayResult<AdvertisementStream<Peripheral>> {
        Ok(self.discovery.start_scanning(vec![filter.service]).await?)
    }

    async fn stop_scan(&self) -> RelayResult<()> {
        Ok(self.discovery.stop_scanning().await?)
    }

    async fn connect(&self, device: &Peripheral) -> RelayResult<Box<dyn BeaconLink>> {
        let link = BleLink::open(device.clone(), &self.config).await?;
        Ok(Box::new(link))
    }
}
