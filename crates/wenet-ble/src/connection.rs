//! BLE connection management and notification delivery

use async_trait::async_trait;
use btleplug::api::Peripheral as _;
use btleplug::platform::Peripheral;
use futures::stream::StreamExt;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;
use wenet_core::{BeaconLink, NotificationStream, PendingLink, Result as RelayResult};

use crate::config::BleTransportConfig;
use crate::error::BleTransportError;

// ----------------------------------------------------------------------------
// Connection Management
// ----------------------------------------------------------------------------

/// An open connection to one beacon
#[derive(Debug, Clone)]
pub struct BleLink {
    peripheral: Peripheral,
    address: String,
}

impl BleLink {
    /// Connect and discover services
    ///
    /// On a service discovery failure the link is torn down before returning.
    /// If the future is dropped after the peripheral connected, the pending
    /// guard disconnects it in the background.
    pub async fn open(
        peripheral: Peripheral,
        config: &BleTransportConfig,
    ) -> Result<Self, BleTransportError> {
        let address = peripheral.address().to_string();

        peripheral
            .connect()
            .await
            .map_err(|e| BleTransportError::ConnectionFailed {
                address: address.clone(),
                reason: e.to_string(),
            })?;

        let pending = PendingLink::new(
            Self {
                peripheral,
                address: address.clone(),
            },
            address.clone(),
        );

        let discovered = timeout(
            config.service_discovery_timeout,
            pending.link().peripheral.discover_services(),
        )
        .await;

        let failure = match discovered {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some("timed out".to_string()),
        };

        let link = pending.complete();
        if let Some(reason) = failure {
            if let Err(e) = link.peripheral.disconnect().await {
                warn!("Failed to disconnect from {} after discovery failure: {}", address, e);
            }
            return Err(BleTransportError::ServiceDiscoveryFailed { address, reason });
        }

        info!("Connected to {}", address);
        Ok(link)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn peripheral(&self) -> &Peripheral {
        &self.peripheral
    }

    async fn subscribe_inner(
        &self,
        characteristic: Uuid,
    ) -> Result<NotificationStream, BleTransportError> {
        let target = self
            .peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == characteristic)
            .ok_or_else(|| BleTransportError::CharacteristicNotFound {
                characteristic: characteristic.to_string(),
            })?;

        // Open the stream before subscribing so the first notification is not missed
        let notifications = self
            .peripheral
            .notifications()
            .await
            .map_err(|e| BleTransportError::NotificationStreamFailed(e.to_string()))?;

        self.peripheral
            .subscribe(&target)
            .await
            .map_err(|e| BleTransportError::SubscriptionFailed(e.to_string()))?;
        debug!("Subscribed to {} on {}", characteristic, self.address);

        let values = notifications
            .filter(move |n| futures::future::ready(n.uuid == characteristic))
            .map(|n| n.value);
        Ok(values.boxed())
    }
}

#[async_trait]
impl BeaconLink for BleLink {
    async fn subscribe(&self, characteristic: Uuid) -> RelayResult<NotificationStream> {
        Ok(self.subscribe_inner(characteristic).await?)
    }

    async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    async fn disconnect(&self) -> RelayResult<()> {
        self.peripheral
            .disconnect()
            .await
            .map_err(BleTransportError::from)?;
        info!("Disconnected from {}", self.address);
        Ok(())
    }
}
