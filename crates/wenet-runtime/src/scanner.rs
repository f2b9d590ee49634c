//! Discovery scanner
//!
//! Reserves a connection slot, scans until one advertisement passes the
//! filter, hands the device and its slot to the worker pool, then waits for
//! that attempt to settle before scanning again. While every slot is held the
//! scanner is parked on the limiter and no scan session is running.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::StreamExt;
use tracing::{debug, info, warn};
use wenet_core::{
    BeaconTransport, CapacityLimiter, DeviceHandle, PipelineStats, Result, ScanFilter,
};

use crate::channels::{Admission, AttemptOutcome, DiscoverySender};
use crate::context::PipelineContext;

/// Pause before retrying after a failed attempt or an interrupted scan
pub const DEFAULT_RESCAN_DELAY: Duration = Duration::from_millis(500);

// ----------------------------------------------------------------------------
// Discovery Scanner
// ----------------------------------------------------------------------------

pub struct DiscoveryScanner<T: BeaconTransport> {
    transport: Arc<T>,
    filter: ScanFilter,
    limiter: CapacityLimiter,
    discovered: DiscoverySender<T::Device>,
    context: PipelineContext,
    rescan_delay: Duration,
}

impl<T: BeaconTransport> DiscoveryScanner<T> {
    pub fn new(
        transport: Arc<T>,
        filter: ScanFilter,
        limiter: CapacityLimiter,
        discovered: DiscoverySender<T::Device>,
        context: PipelineContext,
    ) -> Self {
        Self {
            transport,
            filter,
            limiter,
            discovered,
            context,
            rescan_delay: DEFAULT_RESCAN_DELAY,
        }
    }

    pub fn with_rescan_delay(mut self, delay: Duration) -> Self {
        self.rescan_delay = delay;
        self
    }

    /// Run until the shutdown token is cancelled
    pub async fn run(self) -> Result<()> {
        info!(
            "Discovery scanner started (service {}, rssi >= {})",
            self.filter.service, self.filter.rssi_threshold
        );

        loop {
            let permit = tokio::select! {
                biased;
                _ = self.context.cancel.cancelled() => break,
                permit = self.limiter.acquire() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            debug!(
                "Slot reserved ({}/{} active), scanning",
                self.limiter.active(),
                self.limiter.capacity()
            );

            let Some(handle) = self.scan_session().await else {
                break;
            };

            let (admission, settled) = Admission::new(handle, permit);
            if !self.publish(admission).await {
                break;
            }

            let outcome = tokio::select! {
                biased;
                _ = self.context.cancel.cancelled() => break,
                outcome = settled => outcome.unwrap_or(AttemptOutcome::Failed),
            };
            debug!("Connection attempt settled: {:?}", outcome);

            if outcome == AttemptOutcome::Failed && !self.pause().await {
                break;
            }
        }

        info!("Discovery scanner stopped");
        Ok(())
    }

    /// Scan until an advertisement passes the filter
    ///
    /// Returns `None` once shutdown is requested. Scan start failures and
    /// streams that end early are retried after the rescan delay.
    async fn scan_session(&self) -> Option<DeviceHandle<T::Device>> {
        loop {
            let mut advertisements = match self.transport.start_scan(&self.filter).await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("Failed to start scan: {}", e);
                    if !self.pause().await {
                        return None;
                    }
                    continue;
                }
            };

            loop {
                let advertisement = tokio::select! {
                    biased;
                    _ = self.context.cancel.cancelled() => {
                        self.stop_scan().await;
                        return None;
                    }
                    advertisement = advertisements.next() => advertisement,
                };

                let Some(advertisement) = advertisement else {
                    debug!("Advertisement stream ended, restarting scan");
                    break;
                };

                PipelineStats::bump(&self.context.stats.advertisements_seen);
                if !self.filter.accepts(&advertisement) {
                    PipelineStats::bump(&self.context.stats.advertisements_rejected);
                    continue;
                }

                self.stop_scan().await;
                info!(
                    "Discovered {} (rssi {:?})",
                    advertisement.handle.address, advertisement.rssi
                );
                return Some(advertisement.handle);
            }

            self.stop_scan().await;
            if !self.pause().await {
                return None;
            }
        }
    }

    async fn publish(&self, admission: Admission<T::Device>) -> bool {
        let admission = match self.discovered.try_send(admission) {
            Ok(()) => return true,
            Err(async_channel::TrySendError::Full(admission)) => {
                PipelineStats::bump(&self.context.stats.queue_saturations);
                warn!("Discovery queue full, waiting for a worker");
                admission
            }
            Err(async_channel::TrySendError::Closed(_)) => return false,
        };

        tokio::select! {
            biased;
            _ = self.context.cancel.cancelled() => false,
            sent = self.discovered.send(admission) => sent.is_ok(),
        }
    }

    async fn stop_scan(&self) {
        if let Err(e) = self.transport.stop_scan().await {
            warn!("Failed to stop scan: {}", e);
        }
    }

    /// Sleep for the rescan delay; false if shutdown interrupted it
    async fn pause(&self) -> bool {
        tokio::select! {
            biased;
            _ = self.context.cancel.cancelled() => false,
            _ = tokio::time::sleep(self.rescan_delay) => true,
        }
    }
}
