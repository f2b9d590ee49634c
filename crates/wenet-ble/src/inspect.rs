//! GATT inspection helpers for diagnosing a single beacon

use std::time::Duration;

use btleplug::api::{CharPropFlags, Characteristic, Peripheral as _};
use btleplug::platform::Peripheral;
use futures::stream::StreamExt;
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::discovery::BleDiscovery;
use crate::error::BleTransportError;
use crate::protocol::CHARACTERISTIC_USER_DESCRIPTION_UUID;

// ----------------------------------------------------------------------------
// Device Lookup
// ----------------------------------------------------------------------------

/// How to pick the device to inspect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    Name(String),
    Address(String),
}

impl DeviceSelector {
    /// Whether an advertised name/address pair identifies this device
    pub fn matches(&self, local_name: Option<&str>, address: &str) -> bool {
        match self {
            Self::Name(name) => local_name == Some(name.as_str()),
            Self::Address(wanted) => wanted.eq_ignore_ascii_case(address),
        }
    }
}

impl std::fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name(name) => write!(f, "name '{}'", name),
            Self::Address(address) => write!(f, "address '{}'", address),
        }
    }
}

/// Scan until a device matching the selector shows up
pub async fn find_device(
    discovery: &BleDiscovery,
    selector: &DeviceSelector,
    wait: Duration,
) -> Result<Peripheral, BleTransportError> {
    let mut advertisements = discovery.start_scanning(Vec::new()).await?;

    let found = timeout(wait, async {
        while let Some(advertisement) = advertisements.next().await {
            let peripheral = advertisement.handle.device;
            let name = match peripheral.properties().await {
                Ok(Some(properties)) => properties.local_name,
                _ => None,
            };
            if selector.matches(name.as_deref(), &advertisement.handle.address) {
                return Some(peripheral);
            }
        }
        None
    })
    .await;

    if let Err(e) = discovery.stop_scanning().await {
        warn!("Failed to stop scan: {}", e);
    }

    found
        .ok()
        .flatten()
        .ok_or_else(|| BleTransportError::DeviceNotFound(selector.to_string()))
}

// ----------------------------------------------------------------------------
// Characteristic Reports
// ----------------------------------------------------------------------------

/// What the probe learned about one characteristic
#[derive(Debug, Clone)]
pub struct CharacteristicReport {
    pub service: Uuid,
    pub characteristic: Characteristic,
    pub user_description: Option<String>,
}

impl CharacteristicReport {
    pub fn notifies(&self) -> bool {
        self.characteristic.properties.contains(CharPropFlags::NOTIFY)
    }
}

impl std::fmt::Display for CharacteristicReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "service {} | characteristic {} | properties {:?} | description {} | notify {}",
            self.service,
            self.characteristic.uuid,
            self.characteristic.properties,
            self.user_description.as_deref().unwrap_or("None"),
            self.notifies()
        )
    }
}

/// Enumerate the characteristics of a connected peripheral
///
/// An empty `services` slice means every service is reported.
pub async fn describe_characteristics(
    peripheral: &Peripheral,
    services: &[Uuid],
) -> Vec<CharacteristicReport> {
    let mut reports = Vec::new();

    for service in peripheral.services() {
        if !services.is_empty() && !services.contains(&service.uuid) {
            continue;
        }
        for characteristic in service.characteristics {
            let user_description = read_user_description(peripheral, &characteristic).await;
            reports.push(CharacteristicReport {
                service: service.uuid,
                characteristic,
                user_description,
            });
        }
    }

    reports
}

async fn read_user_description(
    peripheral: &Peripheral,
    characteristic: &Characteristic,
) -> Option<String> {
    let descriptor = characteristic
        .descriptors
        .iter()
        .find(|d| d.uuid == CHARACTERISTIC_USER_DESCRIPTION_UUID)?;

    match peripheral.read_descriptor(descriptor).await {
        Ok(value) => Some(String::from_utf8_lossy(&value).into_owned()),
        Err(e) => {
            debug!(
                "Failed to read user description of {}: {}",
                characteristic.uuid, e
            );
            None
        }
    }
}

/// Render a notification value for display
pub fn format_notification(characteristic: Uuid, value: &[u8]) -> String {
    format!("{} {}", characteristic, hex::encode(value))
}
