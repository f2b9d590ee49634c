//! Connection capacity limiter
//!
//! A counting admission gate sized to the configured device count. Slots are
//! handed out as [`SlotPermit`]s; a slot returns to the pool exactly once,
//! when its permit is released or dropped.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::debug;

use crate::errors::{RelayError, Result};

// ----------------------------------------------------------------------------
// Capacity Limiter
// ----------------------------------------------------------------------------

/// Bounds the number of concurrently open beacon connections
#[derive(Debug, Clone)]
pub struct CapacityLimiter {
    inner: Arc<LimiterState>,
}

#[derive(Debug)]
struct LimiterState {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl CapacityLimiter {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(LimiterState {
                semaphore: Arc::new(Semaphore::new(capacity)),
                capacity,
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }),
        }
    }

    /// Wait for a free slot
    ///
    /// Suspends while the pool is exhausted. Fails only once the limiter has
    /// been closed for shutdown.
    pub async fn acquire(&self) -> Result<SlotPermit> {
        let permit = self
            .inner
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| RelayError::ShutdownRequested)?;
        Ok(self.admit(permit))
    }

    /// Take a slot without waiting, if one is free
    pub fn try_acquire(&self) -> Option<SlotPermit> {
        match self.inner.semaphore.clone().try_acquire_owned() {
            Ok(permit) => Some(self.admit(permit)),
            Err(TryAcquireError::NoPermits) | Err(TryAcquireError::Closed) => None,
        }
    }

    /// Wake every waiter with a shutdown error and refuse further acquisitions
    pub fn close(&self) {
        self.inner.semaphore.close();
        debug!(
            "Capacity limiter closed with {} of {} slots held",
            self.active(),
            self.inner.capacity
        );
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Slots currently held
    pub fn active(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Highest number of slots ever held at once
    pub fn peak(&self) -> usize {
        self.inner.peak.load(Ordering::SeqCst)
    }

    pub fn available(&self) -> usize {
        self.inner.semaphore.available_permits()
    }

    fn admit(&self, permit: OwnedSemaphorePermit) -> SlotPermit {
        let active = self.inner.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak.fetch_max(active, Ordering::SeqCst);
        SlotPermit {
            _permit: permit,
            state: self.inner.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Slot Permit
// ----------------------------------------------------------------------------

/// One held connection slot
#[derive(Debug)]
pub struct SlotPermit {
    _permit: OwnedSemaphorePermit,
    state: Arc<LimiterState>,
}

impl SlotPermit {
    /// Return the slot to the pool
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for SlotPermit {
    fn drop(&mut self) {
        // The semaphore permit is returned right after this, when `_permit` drops.
        self.state.active.fetch_sub(1, Ordering::SeqCst);
    }
}
