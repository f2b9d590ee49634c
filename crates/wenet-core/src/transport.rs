//! Transport collaborator traits
//!
//! The relay talks to two external collaborators: a wireless stack that can
//! scan for, connect to and subscribe on beacons, and a datagram transport
//! that carries serialized envelopes downstream. Notifications are delivered
//! as a stream of messages rather than through a callback, so ordering and
//! backpressure stay visible to the caller.
//!
//! Concrete implementations live elsewhere:
//! - `BleTransport` in the `wenet-ble` crate (btleplug)
//! - `UdpFrameSink` in the `wenet-runtime` crate (tokio UDP)

use std::fmt::Debug;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::Result;

// ----------------------------------------------------------------------------
// Discovery Types
// ----------------------------------------------------------------------------

/// A discovered beacon, valid for one discovery-to-disconnect cycle
#[derive(Debug, Clone)]
pub struct DeviceHandle<D> {
    /// Transport-specific reference used to connect
    pub device: D,
    /// Human-readable network address
    pub address: String,
}

impl<D> DeviceHandle<D> {
    pub fn new(device: D, address: impl Into<String>) -> Self {
        Self {
            device,
            address: address.into(),
        }
    }
}

/// One advertisement seen during a scan session
#[derive(Debug, Clone)]
pub struct Advertisement<D> {
    pub handle: DeviceHandle<D>,
    pub rssi: Option<i16>,
    pub services: Vec<Uuid>,
}

/// Which advertisements the scanner is interested in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFilter {
    pub service: Uuid,
    /// Advertisements weaker than this (dBm) are rejected
    pub rssi_threshold: i16,
}

impl ScanFilter {
    pub fn new(service: Uuid, rssi_threshold: i16) -> Self {
        Self {
            service,
            rssi_threshold,
        }
    }

    /// Whether an advertisement is strong enough and carries the target service
    ///
    /// Advertisements without an RSSI reading are rejected; the stack reports
    /// the device again once it has one.
    pub fn accepts<D>(&self, advertisement: &Advertisement<D>) -> bool {
        match advertisement.rssi {
            Some(rssi) if rssi >= self.rssi_threshold => {
                advertisement.services.contains(&self.service)
            }
            _ => false,
        }
    }
}

pub type AdvertisementStream<D> = BoxStream<'static, Advertisement<D>>;

/// Raw characteristic notifications; the stream ends when the link drops
pub type NotificationStream = BoxStream<'static, Vec<u8>>;

// ----------------------------------------------------------------------------
// Wireless Transport
// ----------------------------------------------------------------------------

/// Scan and connect primitives of a wireless stack
#[async_trait]
pub trait BeaconTransport: Send + Sync + 'static {
    /// Transport-specific device reference
    type Device: Clone + Debug + Send + Sync + 'static;

    /// Begin a scan session and stream advertisements as they arrive
    async fn start_scan(&self, filter: &ScanFilter) -> Result<AdvertisementStream<Self::Device>>;

    /// End the current scan session
    async fn stop_scan(&self) -> Result<()>;

    /// Open a connection; the caller bounds this with its own timeout
    ///
    /// The future may be dropped at any point. Anything connected before that
    /// must be released, see [`PendingLink`].
    async fn connect(&self, device: &Self::Device) -> Result<Box<dyn BeaconLink>>;
}

/// An open connection to one beacon
#[async_trait]
pub trait BeaconLink: Send + Sync {
    /// Subscribe to notifications on a characteristic
    async fn subscribe(&self, characteristic: Uuid) -> Result<NotificationStream>;

    async fn is_connected(&self) -> bool;

    async fn disconnect(&self) -> Result<()>;
}

/// A link that is connected but not yet handed to its owner
///
/// Connect futures are raced against a timeout and may be dropped part way
/// through. If that happens after the underlying connection came up, dropping
/// the guard spawns a disconnect so the device is not left attached with no
/// owner. Call [`PendingLink::complete`] once the link is returned.
pub struct PendingLink<L: BeaconLink + Clone + 'static> {
    link: L,
    address: String,
    armed: bool,
}

impl<L: BeaconLink + Clone + 'static> PendingLink<L> {
    pub fn new(link: L, address: impl Into<String>) -> Self {
        Self {
            link,
            address: address.into(),
            armed: true,
        }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    /// Disarm the guard and hand the link to its owner
    pub fn complete(mut self) -> L {
        self.armed = false;
        self.link.clone()
    }
}

impl<L: BeaconLink + Clone + 'static> Drop for PendingLink<L> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let link = self.link.clone();
        let address = std::mem::take(&mut self.address);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                debug!("Abandoned connection to {}, disconnecting", address);
                runtime.spawn(async move {
                    if let Err(e) = link.disconnect().await {
                        warn!("Failed to disconnect abandoned link to {}: {}", address, e);
                    }
                });
            }
            Err(_) => warn!("No runtime to disconnect abandoned link to {}", address),
        }
    }
}

// ----------------------------------------------------------------------------
// Datagram Transport
// ----------------------------------------------------------------------------

/// Destination for serialized envelopes
#[async_trait]
pub trait FrameSink: Send {
    async fn send(&mut self, datagram: &[u8]) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}
