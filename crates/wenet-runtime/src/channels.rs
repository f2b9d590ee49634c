//! Pipeline queues and the scanner-to-worker admission handoff
//!
//! Three bounded queues connect the pipeline:
//!
//! ```text
//! Scanner --discovery--> Connection Workers --packet--> Batch Assembler --output--> Frame Sender
//! ```
//!
//! The discovery queue is multi-consumer (any idle worker may take the next
//! device), the packet queue is multi-producer, and the output queue is a
//! single-producer single-consumer pipe of serialized envelopes.

use tokio::sync::{mpsc, oneshot};
use wenet_core::{DeviceHandle, SlotPermit, TelemetryFrame};

// ----------------------------------------------------------------------------
// Admission
// ----------------------------------------------------------------------------

/// How a connection attempt settled, as seen by the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The link is up and notifications are flowing
    Streaming,
    /// The attempt ended without reaching the streaming state
    Failed,
}

/// A discovered device together with the pool slot reserved for it
#[derive(Debug)]
pub struct Admission<D> {
    pub handle: DeviceHandle<D>,
    pub permit: SlotPermit,
    pub settle: SettleSignal,
}

impl<D> Admission<D> {
    /// Pair a device with its slot, returning the receiver the scanner waits on
    pub fn new(
        handle: DeviceHandle<D>,
        permit: SlotPermit,
    ) -> (Self, oneshot::Receiver<AttemptOutcome>) {
        let (tx, rx) = oneshot::channel();
        let admission = Self {
            handle,
            permit,
            settle: SettleSignal(Some(tx)),
        };
        (admission, rx)
    }
}

/// Fires at most once per admission; later calls are no-ops
///
/// Dropping an unfired signal wakes the scanner as well, which treats it as
/// a failed attempt.
#[derive(Debug)]
pub struct SettleSignal(Option<oneshot::Sender<AttemptOutcome>>);

impl SettleSignal {
    pub fn fire(&mut self, outcome: AttemptOutcome) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(outcome);
        }
    }

    pub fn is_fired(&self) -> bool {
        self.0.is_none()
    }
}

// ----------------------------------------------------------------------------
// Queues
// ----------------------------------------------------------------------------

pub type DiscoverySender<D> = async_channel::Sender<Admission<D>>;
pub type DiscoveryReceiver<D> = async_channel::Receiver<Admission<D>>;
pub type PacketSender = mpsc::Sender<TelemetryFrame>;
pub type PacketReceiver = mpsc::Receiver<TelemetryFrame>;
pub type OutputSender = mpsc::Sender<Vec<u8>>;
pub type OutputReceiver = mpsc::Receiver<Vec<u8>>;

/// Both ends of every pipeline queue
pub struct PipelineChannels<D> {
    pub discovery_tx: DiscoverySender<D>,
    pub discovery_rx: DiscoveryReceiver<D>,
    pub packet_tx: PacketSender,
    pub packet_rx: PacketReceiver,
    pub output_tx: OutputSender,
    pub output_rx: OutputReceiver,
}

/// Create the three bounded queues with the same capacity
pub fn create_pipeline_channels<D>(capacity: usize) -> PipelineChannels<D> {
    let (discovery_tx, discovery_rx) = async_channel::bounded(capacity);
    let (packet_tx, packet_rx) = mpsc::channel(capacity);
    let (output_tx, output_rx) = mpsc::channel(capacity);
    PipelineChannels {
        discovery_tx,
        discovery_rx,
        packet_tx,
        packet_rx,
        output_tx,
        output_rx,
    }
}
