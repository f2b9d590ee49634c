//! Shared fixtures for the pipeline integration tests
//!
//! `MockTransport` advertises a fixed set of beacons round-robin. Each beacon
//! can be told how to answer connection attempts, can push notifications
//! once subscribed, and can drop its link to simulate the device going away.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;
use uuid::Uuid;
use wenet_core::{
    Advertisement, AdvertisementStream, BeaconLink, BeaconTransport, DeviceHandle, FrameSink,
    NotificationStream, PendingLink, RelayConfig, RelayError, Result, ScanFilter, TimeSource,
    WENET_SERVICE_UUID,
};

/// Timestamp stamped on every frame in these tests
pub const FIXED_TIME_MS: u32 = 45_296_789;

pub struct FixedClock;

impl TimeSource for FixedClock {
    fn time_of_day_millis(&self) -> u32 {
        FIXED_TIME_MS
    }
}

/// Config tuned for fast, deterministic runs on a paused clock
pub fn test_config(device_count: usize) -> RelayConfig {
    RelayConfig::default()
        .with_device_count(device_count)
        .with_batch_timeout(Duration::from_secs(10))
        .with_connection_timeout(Duration::from_secs(2))
        .with_liveness_interval(Duration::from_millis(100))
}

/// Poll a condition on the (usually paused) tokio clock
pub async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(120);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Build a raw notification `{id, sequence (LE), payload}`
pub fn notification(id: u8, sequence: u16, payload: &[u8]) -> Vec<u8> {
    let mut data = vec![id];
    data.extend_from_slice(&sequence.to_le_bytes());
    data.extend_from_slice(payload);
    data
}

// ----------------------------------------------------------------------------
// Mock Beacon
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectBehavior {
    Succeed,
    Refuse,
    /// Never answer; only the caller's timeout ends the attempt
    Hang,
    /// Bring the link up, then stall before handing it over
    StallAfterConnect,
}

#[derive(Debug, Default)]
struct LinkState {
    connected: bool,
    notifier: Option<mpsc::UnboundedSender<Vec<u8>>>,
}

#[derive(Debug)]
pub struct MockBeacon {
    pub address: String,
    rssi: Option<i16>,
    services: Vec<Uuid>,
    behavior: Mutex<ConnectBehavior>,
    link: Mutex<LinkState>,
    connect_attempts: AtomicUsize,
    disconnect_calls: AtomicUsize,
}

impl MockBeacon {
    pub fn new(address: &str) -> Arc<Self> {
        Self::with_advertisement(address, Some(-60), vec![WENET_SERVICE_UUID])
    }

    pub fn with_advertisement(address: &str, rssi: Option<i16>, services: Vec<Uuid>) -> Arc<Self> {
        Arc::new(Self {
            address: address.to_string(),
            rssi,
            services,
            behavior: Mutex::new(ConnectBehavior::Succeed),
            link: Mutex::new(LinkState::default()),
            connect_attempts: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
        })
    }

    pub fn set_behavior(&self, behavior: ConnectBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn is_connected(&self) -> bool {
        self.link.lock().unwrap().connected
    }

    /// Connected and subscribed
    pub fn is_streaming(&self) -> bool {
        let link = self.link.lock().unwrap();
        link.connected && link.notifier.is_some()
    }

    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    /// Push a notification to the subscriber; false if nobody is subscribed
    pub fn notify(&self, data: Vec<u8>) -> bool {
        match &self.link.lock().unwrap().notifier {
            Some(notifier) => notifier.send(data).is_ok(),
            None => false,
        }
    }

    /// Simulate the device going out of range
    pub fn drop_link(&self) {
        let mut link = self.link.lock().unwrap();
        link.connected = false;
        link.notifier = None;
    }

    fn advertising(&self) -> bool {
        !self.is_connected()
    }
}

// ----------------------------------------------------------------------------
// Mock Transport
// ----------------------------------------------------------------------------

pub struct MockTransport {
    beacons: Vec<Arc<MockBeacon>>,
    cursor: Arc<AtomicUsize>,
    scanning: Arc<AtomicBool>,
    scan_sessions: AtomicUsize,
    advertising_interval: Duration,
}

impl MockTransport {
    pub fn new(beacons: Vec<Arc<MockBeacon>>) -> Self {
        Self {
            beacons,
            cursor: Arc::new(AtomicUsize::new(0)),
            scanning: Arc::new(AtomicBool::new(false)),
            scan_sessions: AtomicUsize::new(0),
            advertising_interval: Duration::from_millis(20),
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    pub fn scan_sessions(&self) -> usize {
        self.scan_sessions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BeaconTransport for MockTransport {
    type Device = Arc<MockBeacon>;

    async fn start_scan(&self, _filter: &ScanFilter) -> Result<AdvertisementStream<Arc<MockBeacon>>> {
        self.scanning.store(true, Ordering::SeqCst);
        self.scan_sessions.fetch_add(1, Ordering::SeqCst);

        let beacons = self.beacons.clone();
        let cursor = self.cursor.clone();
        let interval = self.advertising_interval;

        let advertisements = stream::unfold((), move |()| {
            let beacons = beacons.clone();
            let cursor = cursor.clone();
            async move {
                loop {
                    tokio::time::sleep(interval).await;
                    if beacons.is_empty() {
                        continue;
                    }
                    let next = cursor.fetch_add(1, Ordering::SeqCst) % beacons.len();
                    let beacon = &beacons[next];
                    if beacon.advertising() {
                        let advertisement = Advertisement {
                            handle: DeviceHandle::new(beacon.clone(), beacon.address.clone()),
                            rssi: beacon.rssi,
                            services: beacon.services.clone(),
                        };
                        return Some((advertisement, ()));
                    }
                }
            }
        });

        Ok(advertisements.boxed())
    }

    async fn stop_scan(&self) -> Result<()> {
        self.scanning.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn connect(&self, device: &Arc<MockBeacon>) -> Result<Box<dyn BeaconLink>> {
        device.connect_attempts.fetch_add(1, Ordering::SeqCst);
        let behavior = *device.behavior.lock().unwrap();

        match behavior {
            ConnectBehavior::Succeed => {
                device.link.lock().unwrap().connected = true;
                Ok(Box::new(MockLink {
                    beacon: device.clone(),
                }))
            }
            ConnectBehavior::Refuse => Err(RelayError::transport("connection refused")),
            ConnectBehavior::Hang => futures::future::pending().await,
            ConnectBehavior::StallAfterConnect => {
                device.link.lock().unwrap().connected = true;
                let link = MockLink {
                    beacon: device.clone(),
                };
                let _pending = PendingLink::new(link, device.address.clone());
                futures::future::pending().await
            }
        }
    }
}

#[derive(Clone)]
struct MockLink {
    beacon: Arc<MockBeacon>,
}

#[async_trait]
impl BeaconLink for MockLink {
    async fn subscribe(&self, _characteristic: Uuid) -> Result<NotificationStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut link = self.beacon.link.lock().unwrap();
            if !link.connected {
                return Err(RelayError::transport("not connected"));
            }
            link.notifier = Some(tx);
        }

        let notifications = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|data| (data, rx))
        });
        Ok(notifications.boxed())
    }

    async fn is_connected(&self) -> bool {
        self.beacon.is_connected()
    }

    async fn disconnect(&self) -> Result<()> {
        self.beacon.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.beacon.drop_link();
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Channel Sink
// ----------------------------------------------------------------------------

/// Frame sink that hands every datagram to the test
pub struct ChannelSink {
    datagrams: mpsc::UnboundedSender<Vec<u8>>,
    closed: Arc<AtomicBool>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vec<u8>>, Arc<AtomicBool>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let sink = Self {
            datagrams: tx,
            closed: closed.clone(),
        };
        (sink, rx, closed)
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send(&mut self, datagram: &[u8]) -> Result<()> {
        self.datagrams
            .send(datagram.to_vec())
            .map_err(|_| RelayError::transport("test receiver dropped"))
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
