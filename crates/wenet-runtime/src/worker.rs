//! Connection worker
//!
//! One worker per pool slot. Each loops through
//! `AwaitDevice -> Connecting -> Streaming -> Disconnecting` and back. The
//! slot arrives already reserved inside the [`Admission`]; whatever path an
//! attempt takes, the slot is released first and the scanner is signalled
//! second, exactly once.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::StreamExt;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;
use wenet_core::{
    BeaconLink, BeaconTransport, DeviceHandle, PipelineStats, RelayConfig, RelayError, Result,
};

use crate::capture::PacketCapture;
use crate::channels::{Admission, AttemptOutcome, DiscoveryReceiver, PacketSender, SettleSignal};
use crate::context::PipelineContext;

// ----------------------------------------------------------------------------
// Worker State
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    AwaitDevice,
    Connecting,
    Streaming,
    Disconnecting,
}

/// Why a streaming session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamEnd {
    /// The notification stream closed or the liveness check failed
    LinkLost,
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub characteristic: Uuid,
    pub connection_timeout: Duration,
    pub liveness_interval: Duration,
}

impl From<&RelayConfig> for WorkerSettings {
    fn from(config: &RelayConfig) -> Self {
        Self {
            characteristic: config.characteristic_uuid,
            connection_timeout: config.connection_timeout(),
            liveness_interval: config.liveness_interval(),
        }
    }
}

// ----------------------------------------------------------------------------
// Connection Worker
// ----------------------------------------------------------------------------

pub struct ConnectionWorker<T: BeaconTransport> {
    id: usize,
    transport: Arc<T>,
    admissions: DiscoveryReceiver<T::Device>,
    packets: PacketSender,
    settings: WorkerSettings,
    context: PipelineContext,
    state: WorkerState,
}

impl<T: BeaconTransport> ConnectionWorker<T> {
    pub fn new(
        id: usize,
        transport: Arc<T>,
        admissions: DiscoveryReceiver<T::Device>,
        packets: PacketSender,
        settings: WorkerSettings,
        context: PipelineContext,
    ) -> Self {
        Self {
            id,
            transport,
            admissions,
            packets,
            settings,
            context,
            state: WorkerState::AwaitDevice,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Loop until shutdown is requested or the discovery queue closes
    pub async fn run(mut self) -> Result<()> {
        debug!("Worker {} started", self.id);

        loop {
            self.transition(WorkerState::AwaitDevice);
            let admission = tokio::select! {
                biased;
                _ = self.context.cancel.cancelled() => break,
                admission = self.admissions.recv() => match admission {
                    Ok(admission) => admission,
                    Err(_) => break,
                },
            };

            let shutdown = self.serve(admission).await;
            if shutdown {
                break;
            }
        }

        debug!("Worker {} stopped", self.id);
        Ok(())
    }

    /// Take one admission through a full attempt; true if shutdown ended it
    async fn serve(&mut self, admission: Admission<T::Device>) -> bool {
        let Admission {
            handle,
            permit,
            mut settle,
        } = admission;

        let result = self.attempt(&handle, &mut settle).await;

        // Slot release strictly before the scanner is woken
        permit.release();
        settle.fire(AttemptOutcome::Failed);

        match result {
            Ok(StreamEnd::Shutdown) | Err(RelayError::ShutdownRequested) => true,
            Ok(StreamEnd::LinkLost) => {
                info!("Worker {}: link to {} lost", self.id, handle.address);
                false
            }
            Err(RelayError::QueueClosed(queue)) => {
                debug!("Worker {}: {} queue closed", self.id, queue);
                true
            }
            Err(e) => {
                warn!("Worker {}: attempt on {} failed: {}", self.id, handle.address, e);
                false
            }
        }
    }

    async fn attempt(
        &mut self,
        handle: &DeviceHandle<T::Device>,
        settle: &mut SettleSignal,
    ) -> Result<StreamEnd> {
        self.transition(WorkerState::Connecting);
        let link = self.connect(handle).await?;

        self.transition(WorkerState::Streaming);
        let streamed = self.stream(handle, &*link, settle).await;

        self.transition(WorkerState::Disconnecting);
        self.disconnect(handle, &*link).await;

        streamed
    }

    async fn connect(&self, handle: &DeviceHandle<T::Device>) -> Result<Box<dyn BeaconLink>> {
        let bound = self.settings.connection_timeout;
        let connecting = timeout(bound, self.transport.connect(&handle.device));

        let outcome = tokio::select! {
            biased;
            _ = self.context.cancel.cancelled() => return Err(RelayError::ShutdownRequested),
            outcome = connecting => outcome,
        };

        match outcome {
            Ok(Ok(link)) => {
                PipelineStats::bump(&self.context.stats.connections_opened);
                info!("Worker {}: connected to {}", self.id, handle.address);
                Ok(link)
            }
            Ok(Err(e)) => {
                PipelineStats::bump(&self.context.stats.connection_failures);
                Err(e)
            }
            Err(_) => {
                PipelineStats::bump(&self.context.stats.connection_failures);
                Err(RelayError::TransportTimeout(bound))
            }
        }
    }

    async fn stream(
        &self,
        handle: &DeviceHandle<T::Device>,
        link: &dyn BeaconLink,
        settle: &mut SettleSignal,
    ) -> Result<StreamEnd> {
        let mut notifications = link.subscribe(self.settings.characteristic).await?;
        settle.fire(AttemptOutcome::Streaming);
        debug!(
            "Worker {}: streaming {} from {}",
            self.id, self.settings.characteristic, handle.address
        );

        let mut capture = PacketCapture::new(
            handle.address.clone(),
            self.packets.clone(),
            self.context.stats.clone(),
            self.context.time.clone(),
        );

        let mut liveness = interval(self.settings.liveness_interval);
        liveness.set_missed_tick_behavior(MissedTickBehavior::Delay);
        liveness.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = self.context.cancel.cancelled() => return Ok(StreamEnd::Shutdown),
                notification = notifications.next() => match notification {
                    Some(data) => capture.capture(&data).await?,
                    None => return Ok(StreamEnd::LinkLost),
                },
                _ = liveness.tick() => {
                    if !link.is_connected().await {
                        return Ok(StreamEnd::LinkLost);
                    }
                }
            }
        }
    }

    async fn disconnect(&self, handle: &DeviceHandle<T::Device>, link: &dyn BeaconLink) {
        if link.is_connected().await {
            if let Err(e) = link.disconnect().await {
                warn!("Worker {}: disconnect from {} failed: {}", self.id, handle.address, e);
            }
        }
        PipelineStats::bump(&self.context.stats.disconnects);
    }

    fn transition(&mut self, next: WorkerState) {
        if self.state != next {
            debug!("Worker {}: {:?} -> {:?}", self.id, self.state, next);
            self.state = next;
        }
    }
}
