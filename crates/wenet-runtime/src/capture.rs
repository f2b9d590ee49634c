//! Packet capture for one live connection
//!
//! Turns raw characteristic notifications into timestamped telemetry frames
//! and hands them to the batch assembler. Sequence tracking is scoped to the
//! connection, so a reconnect starts a fresh baseline.

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use wenet_core::{
    PipelineStats, RelayError, Result, SequenceTracker, TelemetryFrame, TimeSource,
};

use crate::channels::PacketSender;

// ----------------------------------------------------------------------------
// Packet Capture
// ----------------------------------------------------------------------------

pub struct PacketCapture {
    address: String,
    packets: PacketSender,
    stats: Arc<PipelineStats>,
    time: Arc<dyn TimeSource>,
    sequence: SequenceTracker,
}

impl PacketCapture {
    pub fn new(
        address: impl Into<String>,
        packets: PacketSender,
        stats: Arc<PipelineStats>,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            address: address.into(),
            packets,
            stats,
            time,
            sequence: SequenceTracker::new(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Validate, timestamp and enqueue one notification
    ///
    /// Malformed notifications are counted and skipped; the connection stays
    /// up. The only error returned is a closed packet queue, which means the
    /// pipeline is shutting down.
    pub async fn capture(&mut self, data: &[u8]) -> Result<()> {
        PipelineStats::bump(&self.stats.notifications_received);

        let frame = match TelemetryFrame::from_notification(data, self.time.time_of_day_millis()) {
            Ok(frame) => frame,
            Err(e) => {
                PipelineStats::bump(&self.stats.notifications_rejected);
                warn!(
                    "Discarding notification from {} ({} bytes): {}",
                    self.address,
                    data.len(),
                    e
                );
                return Ok(());
            }
        };

        if let Some(gap) = self.sequence.observe(frame.sequence()) {
            PipelineStats::bump(&self.stats.sequence_gaps);
            warn!("Sequence gap on {}: {}", self.address, gap);
        }

        self.enqueue(frame).await
    }

    async fn enqueue(&self, frame: TelemetryFrame) -> Result<()> {
        let frame = match self.packets.try_send(frame) {
            Ok(()) => {
                PipelineStats::bump(&self.stats.frames_enqueued);
                return Ok(());
            }
            Err(TrySendError::Full(frame)) => {
                PipelineStats::bump(&self.stats.queue_saturations);
                debug!("Packet queue full, {} waiting for room", self.address);
                frame
            }
            Err(TrySendError::Closed(_)) => {
                PipelineStats::bump(&self.stats.frames_dropped);
                return Err(RelayError::QueueClosed("packet"));
            }
        };

        match self.packets.send(frame).await {
            Ok(()) => {
                PipelineStats::bump(&self.stats.frames_enqueued);
                Ok(())
            }
            Err(_) => {
                PipelineStats::bump(&self.stats.frames_dropped);
                Err(RelayError::QueueClosed("packet"))
            }
        }
    }
}
