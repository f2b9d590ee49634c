//! BLE adapter setup and beacon scanning

use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::stream::StreamExt;
use tracing::{debug, info};
use wenet_core::{Advertisement, AdvertisementStream, DeviceHandle};

use crate::config::BleTransportConfig;
use crate::error::BleTransportError;

// ----------------------------------------------------------------------------
// Discovery Implementation
// ----------------------------------------------------------------------------

/// Handles BLE adapter access and scanning
#[derive(Debug, Clone)]
pub struct BleDiscovery {
    adapter: Adapter,
}

impl BleDiscovery {
    /// Open the configured local adapter
    pub async fn initialize(config: &BleTransportConfig) -> Result<Self, BleTransportError> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;

        if adapters.is_empty() {
            return Err(BleTransportError::AdapterNotAvailable);
        }

        let available = adapters.len();
        let adapter = adapters.into_iter().nth(config.adapter_index).ok_or(
            BleTransportError::AdapterIndexOutOfRange {
                index: config.adapter_index,
                available,
            },
        )?;

        match adapter.adapter_info().await {
            Ok(info) => info!("BLE adapter initialized: {}", info),
            Err(_) => info!("BLE adapter initialized"),
        }
        Ok(Self { adapter })
    }

    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// Start a scan session and stream advertisements as the adapter reports them
    ///
    /// An empty service list scans for everything.
    pub async fn start_scanning(
        &self,
        services: Vec<uuid::Uuid>,
    ) -> Result<AdvertisementStream<Peripheral>, BleTransportError> {
        let events = self
            .adapter
            .events()
            .await
            .map_err(|e| BleTransportError::EventStreamFailed(e.to_string()))?;

        self.adapter
            .start_scan(ScanFilter { services })
            .await
            .map_err(|e| BleTransportError::ScanFailed(e.to_string()))?;
        info!("Started BLE scanning");

        let adapter = self.adapter.clone();
        let advertisements = events.filter_map(move |event| {
            let adapter = adapter.clone();
            async move {
                let id = advertised_peripheral(event)?;
                advertisement_for(&adapter, &id).await
            }
        });

        Ok(advertisements.boxed())
    }

    /// Stop the current scan session
    pub async fn stop_scanning(&self) -> Result<(), BleTransportError> {
        self.adapter
            .stop_scan()
            .await
            .map_err(|e| BleTransportError::ScanFailed(e.to_string()))?;
        debug!("Stopped BLE scanning");
        Ok(())
    }
}

/// Peripheral an event carries fresh advertisement data for
fn advertised_peripheral(event: CentralEvent) -> Option<PeripheralId> {
    match event {
        CentralEvent::DeviceDiscovered(id)
        | CentralEvent::DeviceUpdated(id)
        | CentralEvent::ServicesAdvertisement { id, .. } => Some(id),
        _ => None,
    }
}

/// Snapshot the current advertisement data for a peripheral
async fn advertisement_for(
    adapter: &Adapter,
    id: &PeripheralId,
) -> Option<Advertisement<Peripheral>> {
    let peripheral = adapter.peripheral(id).await.ok()?;
    let properties = peripheral.properties().await.ok()??;

    Some(Advertisement {
        handle: DeviceHandle::new(peripheral, properties.address.to_string()),
        rssi: properties.rssi,
        services: properties.services,
    })
}
