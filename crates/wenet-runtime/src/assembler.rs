//! Batch assembler
//!
//! Collects frames from the packet queue in windows bounded by both size
//! (eleven frames) and time (the batch timeout), packs each non-empty window
//! into a binary payload, wraps it in an envelope and queues the serialized
//! envelope for the sender. When the packet queue closes, whatever is left is
//! flushed and the task ends, which in turn closes the output queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};
use wenet_core::{
    Batch, BinaryPayload, OutputEnvelope, PipelineStats, RelayConfig, RelayError, Result,
    MAX_FRAMES_PER_BATCH,
};

use crate::channels::{OutputSender, PacketReceiver};

// ----------------------------------------------------------------------------
// Envelope Settings
// ----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AssemblerSettings {
    pub batch_timeout: Duration,
    pub envelope_type: String,
    pub envelope_id: u8,
}

impl From<&RelayConfig> for AssemblerSettings {
    fn from(config: &RelayConfig) -> Self {
        Self {
            batch_timeout: config.batch_timeout(),
            envelope_type: config.envelope_type.clone(),
            envelope_id: config.envelope_id,
        }
    }
}

// ----------------------------------------------------------------------------
// Batch Assembler
// ----------------------------------------------------------------------------

pub struct BatchAssembler {
    packets: PacketReceiver,
    output: OutputSender,
    settings: AssemblerSettings,
    stats: Arc<PipelineStats>,
}

impl BatchAssembler {
    pub fn new(
        packets: PacketReceiver,
        output: OutputSender,
        settings: AssemblerSettings,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            packets,
            output,
            settings,
            stats,
        }
    }

    /// Run until the packet queue is closed and drained
    pub async fn run(mut self) -> Result<()> {
        info!(
            "Batch assembler started ({:?} window, up to {} frames)",
            self.settings.batch_timeout, MAX_FRAMES_PER_BATCH
        );

        loop {
            let (batch, open) = self.collect_window().await;

            if !batch.is_empty() {
                if let Err(e) = self.emit(&batch).await {
                    // Only a closed output queue ends up here
                    warn!("Dropping {} frames: {}", batch.len(), e);
                    PipelineStats::add(&self.stats.frames_dropped, batch.len() as u64);
                    break;
                }
            }

            if !open {
                break;
            }
        }

        info!("Batch assembler stopped");
        Ok(())
    }

    /// Gather one window of frames
    ///
    /// The window closes after the batch timeout or once the batch is full.
    /// The flag is false once the packet queue has been closed and drained.
    async fn collect_window(&mut self) -> (Batch, bool) {
        let deadline = Instant::now() + self.settings.batch_timeout;
        let mut batch = Batch::new();

        while batch.len() < MAX_FRAMES_PER_BATCH {
            match timeout_at(deadline, self.packets.recv()).await {
                Ok(Some(frame)) => batch.push(frame),
                Ok(None) => return (batch, false),
                Err(_) => break,
            }
        }

        (batch, true)
    }

    /// Pack, wrap and queue one batch
    ///
    /// A batch that fails to pack is counted as dropped and does not stop the
    /// assembler.
    async fn emit(&self, batch: &Batch) -> Result<()> {
        let payload = match BinaryPayload::from_frames(batch) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to pack batch of {} frames: {}", batch.len(), e);
                PipelineStats::add(&self.stats.frames_dropped, batch.len() as u64);
                return Ok(());
            }
        };

        let envelope =
            OutputEnvelope::new(&self.settings.envelope_type, self.settings.envelope_id, &payload);
        let bytes = match envelope.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to serialize envelope: {}", e);
                PipelineStats::add(&self.stats.frames_dropped, batch.len() as u64);
                return Ok(());
            }
        };

        let bytes = match self.output.try_send(bytes) {
            Ok(()) => None,
            Err(TrySendError::Full(bytes)) => {
                PipelineStats::bump(&self.stats.queue_saturations);
                warn!("Output queue full, waiting for the sender");
                Some(bytes)
            }
            Err(TrySendError::Closed(_)) => return Err(RelayError::QueueClosed("output")),
        };
        if let Some(bytes) = bytes {
            self.output
                .send(bytes)
                .await
                .map_err(|_| RelayError::QueueClosed("output"))?;
        }

        PipelineStats::bump(&self.stats.batches_emitted);
        debug!("Queued batch of {} frames", batch.len());
        Ok(())
    }
}
