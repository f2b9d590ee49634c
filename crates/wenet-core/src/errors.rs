//! Error types for the Wenet BLE relay
//!
//! `FrameError` covers everything that can go wrong while turning a raw
//! notification into a frame or a batch of frames into a payload. `RelayError`
//! is the crate-wide error that unifies framing, transport, queue and
//! configuration failures.

use std::time::Duration;

use thiserror::Error;

// ----------------------------------------------------------------------------
// Framing Errors
// ----------------------------------------------------------------------------

/// Framing errors raised by packet capture and batch assembly
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("Notification too short: {len} bytes (header needs {min})")]
    TooShort { len: usize, min: usize },

    #[error("Notification payload too long: {len} bytes (slot holds {max})")]
    PayloadTooLong { len: usize, max: usize },

    #[error("Cannot assemble an empty batch")]
    EmptyBatch,

    #[error("Batch overflow: {count} frames (max {max})")]
    BatchOverflow { count: usize, max: usize },
}

// ----------------------------------------------------------------------------
// Relay Errors
// ----------------------------------------------------------------------------

/// Errors produced anywhere in the relay pipeline
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Transport timeout after {}ms", .0.as_millis())]
    TransportTimeout(Duration),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed notification: {0}")]
    MalformedNotification(#[from] FrameError),

    #[error("Queue closed: {0}")]
    QueueClosed(&'static str),

    #[error("Shutdown requested")]
    ShutdownRequested,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RelayError {
    /// Create a transport error from anything displayable
    pub fn transport(reason: impl std::fmt::Display) -> Self {
        Self::Transport(reason.to_string())
    }

    /// Whether a connection worker can recover from this error by returning to idle
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::TransportTimeout(_) | Self::Transport(_) | Self::MalformedNotification(_)
        )
    }
}

/// Result type for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;
