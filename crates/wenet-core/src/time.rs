//! Time-of-day stamping for captured frames

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds in one UTC day
pub const MILLIS_PER_DAY: u64 = 86_400_000;

/// Source of frame timestamps
pub trait TimeSource: Send + Sync {
    /// Milliseconds elapsed since UTC midnight
    fn time_of_day_millis(&self) -> u32;
}

/// Wall-clock time source
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl SystemTimeSource {
    pub fn new() -> Self {
        Self
    }
}

impl TimeSource for SystemTimeSource {
    fn time_of_day_millis(&self) -> u32 {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        millis_since_midnight(since_epoch.as_millis() as u64)
    }
}

/// Fold a Unix millisecond timestamp into milliseconds since UTC midnight
pub fn millis_since_midnight(unix_millis: u64) -> u32 {
    (unix_millis % MILLIS_PER_DAY) as u32
}
