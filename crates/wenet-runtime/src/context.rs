//! State shared by every pipeline task

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use wenet_core::{PipelineStats, SystemTimeSource, TimeSource};

/// Counters, clock and shutdown token handed to each task
#[derive(Clone)]
pub struct PipelineContext {
    pub stats: Arc<PipelineStats>,
    pub time: Arc<dyn TimeSource>,
    pub cancel: CancellationToken,
}

impl PipelineContext {
    pub fn new(time: Arc<dyn TimeSource>) -> Self {
        Self {
            stats: Arc::new(PipelineStats::new()),
            time,
            cancel: CancellationToken::new(),
        }
    }
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new(Arc::new(SystemTimeSource::new()))
    }
}
