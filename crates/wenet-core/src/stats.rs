//! Pipeline counters
//!
//! Shared, lock-free counters updated by every pipeline task. Nothing that
//! drops or rejects data does so without bumping one of these.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

macro_rules! pipeline_counters {
    ($($(#[$doc:meta])* $name:ident),* $(,)?) => {
        /// Atomic counters for one relay instance
        #[derive(Debug, Default)]
        pub struct PipelineStats {
            $($(#[$doc])* pub $name: AtomicU64,)*
        }

        /// Point-in-time copy of [`PipelineStats`]
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct StatsSnapshot {
            $(pub $name: u64,)*
        }

        impl PipelineStats {
            pub fn snapshot(&self) -> StatsSnapshot {
                StatsSnapshot {
                    $($name: self.$name.load(Ordering::Relaxed),)*
                }
            }
        }
    };
}

pipeline_counters! {
    /// Advertisements delivered by the scanner
    advertisements_seen,
    /// Advertisements below the RSSI threshold or missing the service
    advertisements_rejected,
    connections_opened,
    /// Connection attempts that timed out or failed in the transport
    connection_failures,
    disconnects,
    notifications_received,
    /// Notifications that failed frame validation
    notifications_rejected,
    sequence_gaps,
    frames_enqueued,
    /// Times a producer found a queue full and had to wait
    queue_saturations,
    /// Frames lost because a queue closed underneath them or a batch failed to pack
    frames_dropped,
    batches_emitted,
    datagrams_sent,
    send_failures,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a counter by one
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment a counter by `n`
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "connections={} failures={} frames={} gaps={} rejected={} saturations={} dropped={} batches={} sent={} send_failures={}",
            self.connections_opened,
            self.connection_failures,
            self.frames_enqueued,
            self.sequence_gaps,
            self.notifications_rejected,
            self.queue_saturations,
            self.frames_dropped,
            self.batches_emitted,
            self.datagrams_sent,
            self.send_failures,
        )
    }
}
