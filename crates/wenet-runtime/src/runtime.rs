//! Relay runtime
//!
//! Wires the pipeline together and owns its lifecycle:
//!
//! - One discovery scanner
//! - One connection worker per pool slot
//! - One batch assembler
//! - One frame sender
//! - A periodic statistics reporter
//!
//! Shutdown cancels the scanner and workers first. Once they have unwound,
//! the packet queue has no producers left, so the assembler flushes and ends,
//! which closes the output queue and lets the sender drain and close the sink.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, timeout_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wenet_core::{
    BeaconTransport, CapacityLimiter, FrameSink, PipelineStats, RelayConfig, Result, ScanFilter,
    StatsSnapshot, TimeSource,
};

use crate::assembler::{AssemblerSettings, BatchAssembler};
use crate::channels::{create_pipeline_channels, PipelineChannels};
use crate::context::PipelineContext;
use crate::scanner::{DiscoveryScanner, DEFAULT_RESCAN_DELAY};
use crate::sender::FrameSender;
use crate::worker::{ConnectionWorker, WorkerSettings};

/// How often the statistics reporter logs a snapshot
pub const STATS_REPORT_INTERVAL: Duration = Duration::from_secs(30);

type TaskHandle = JoinHandle<Result<()>>;

// ----------------------------------------------------------------------------
// Relay Runtime
// ----------------------------------------------------------------------------

/// A configured but not yet started relay
pub struct RelayRuntime<T: BeaconTransport> {
    config: RelayConfig,
    transport: Arc<T>,
    limiter: CapacityLimiter,
    context: PipelineContext,
    rescan_delay: Duration,
}

impl<T: BeaconTransport> RelayRuntime<T> {
    /// Validate the configuration and prepare the shared state
    pub fn new(config: RelayConfig, transport: T) -> Result<Self> {
        config.validate()?;
        let limiter = CapacityLimiter::new(config.device_count);

        Ok(Self {
            config,
            transport: Arc::new(transport),
            limiter,
            context: PipelineContext::default(),
            rescan_delay: DEFAULT_RESCAN_DELAY,
        })
    }

    /// Use a different clock for frame timestamps
    pub fn with_time_source(mut self, time: Arc<dyn TimeSource>) -> Self {
        self.context.time = time;
        self
    }

    pub fn with_rescan_delay(mut self, delay: Duration) -> Self {
        self.rescan_delay = delay;
        self
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Token that stops the relay when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.context.cancel.clone()
    }

    pub fn stats(&self) -> Arc<PipelineStats> {
        self.context.stats.clone()
    }

    pub fn limiter(&self) -> CapacityLimiter {
        self.limiter.clone()
    }

    /// Start every pipeline task
    pub fn spawn<S: FrameSink + 'static>(self, sink: S) -> RelayHandle {
        let PipelineChannels {
            discovery_tx,
            discovery_rx,
            packet_tx,
            packet_rx,
            output_tx,
            output_rx,
        } = create_pipeline_channels(self.config.queue_capacity);

        info!(
            "Starting relay: {} connection slots, {:?} batch window, relay {}:{}",
            self.config.device_count,
            self.config.batch_timeout(),
            self.config.relay_host,
            self.config.relay_port
        );

        let scanner = DiscoveryScanner::new(
            self.transport.clone(),
            ScanFilter::new(self.config.service_uuid, self.config.rssi_threshold),
            self.limiter.clone(),
            discovery_tx,
            self.context.clone(),
        )
        .with_rescan_delay(self.rescan_delay);
        let mut producers = vec![("scanner".to_string(), tokio::spawn(scanner.run()))];

        let settings = WorkerSettings::from(&self.config);
        for id in 0..self.config.device_count {
            let worker = ConnectionWorker::new(
                id,
                self.transport.clone(),
                discovery_rx.clone(),
                packet_tx.clone(),
                settings.clone(),
                self.context.clone(),
            );
            producers.push((format!("worker {}", id), tokio::spawn(worker.run())));
        }

        // Workers hold the only remaining packet senders
        drop(packet_tx);
        drop(discovery_rx);

        let assembler = BatchAssembler::new(
            packet_rx,
            output_tx,
            AssemblerSettings::from(&self.config),
            self.context.stats.clone(),
        );
        let assembler = tokio::spawn(assembler.run());

        let sender = FrameSender::new(output_rx, sink, self.context.stats.clone());
        let sender = tokio::spawn(sender.run());

        let reporter = tokio::spawn(report_stats(
            self.context.clone(),
            self.limiter.clone(),
            STATS_REPORT_INTERVAL,
        ));

        RelayHandle {
            cancel: self.context.cancel,
            limiter: self.limiter,
            stats: self.context.stats,
            grace: self.config.shutdown_grace(),
            producers,
            assembler,
            sender,
            reporter,
        }
    }

    /// Run until the cancellation token fires, then shut down gracefully
    pub async fn run<S: FrameSink + 'static>(self, sink: S) -> StatsSnapshot {
        let handle = self.spawn(sink);
        handle.cancel.cancelled().await;
        handle.shutdown().await
    }
}

// ----------------------------------------------------------------------------
// Relay Handle
// ----------------------------------------------------------------------------

/// A running relay
pub struct RelayHandle {
    cancel: CancellationToken,
    limiter: CapacityLimiter,
    stats: Arc<PipelineStats>,
    grace: Duration,
    producers: Vec<(String, TaskHandle)>,
    assembler: TaskHandle,
    sender: TaskHandle,
    reporter: JoinHandle<()>,
}

impl RelayHandle {
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn stats(&self) -> Arc<PipelineStats> {
        self.stats.clone()
    }

    pub fn limiter(&self) -> &CapacityLimiter {
        &self.limiter
    }

    /// Stop every task and return the final counters
    ///
    /// Each stage gets the grace period to unwind; stragglers are aborted.
    pub async fn shutdown(self) -> StatsSnapshot {
        info!("Shutting down relay");
        self.cancel.cancel();
        self.limiter.close();
        self.reporter.abort();

        join_within(self.producers, self.grace).await;
        join_within(
            vec![
                ("assembler".to_string(), self.assembler),
                ("sender".to_string(), self.sender),
            ],
            self.grace,
        )
        .await;

        let snapshot = self.stats.snapshot();
        info!(
            "Relay stopped: {} (peak connections {})",
            snapshot,
            self.limiter.peak()
        );
        snapshot
    }
}

/// Await tasks against a shared deadline, aborting any that overrun it
async fn join_within(tasks: Vec<(String, TaskHandle)>, grace: Duration) {
    let deadline = Instant::now() + grace;

    for (name, mut task) in tasks {
        match timeout_at(deadline, &mut task).await {
            Ok(Ok(Ok(()))) => debug!("{} stopped", name),
            Ok(Ok(Err(e))) => warn!("{} ended with error: {}", name, e),
            Ok(Err(e)) => error!("{} panicked or was cancelled: {}", name, e),
            Err(_) => {
                warn!("{} did not stop within {:?}, aborting", name, grace);
                task.abort();
            }
        }
    }
}

async fn report_stats(context: PipelineContext, limiter: CapacityLimiter, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = context.cancel.cancelled() => break,
            _ = ticker.tick() => {
                debug!(
                    "Pipeline: {} (active {}/{})",
                    context.stats.snapshot(),
                    limiter.active(),
                    limiter.capacity()
                );
            }
        }
    }
}
