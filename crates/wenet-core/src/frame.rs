//! Telemetry frame codec
//!
//! A beacon notification is `id (1) ‖ sequence (2, little-endian) ‖ payload`.
//! Each accepted notification becomes a fixed 23-byte [`TelemetryFrame`]:
//!
//! ```text
//! +----+----------+----------------+------------------------------+
//! | id | sequence | timestamp (ms) | payload, 0xFF padded         |
//! | 1  | 2 (LE)   | 4 (LE)         | 16                           |
//! +----+----------+----------------+------------------------------+
//! ```
//!
//! Payloads longer than the 16-byte slot are rejected rather than truncated.

use crate::errors::FrameError;

// ----------------------------------------------------------------------------
// Layout Constants
// ----------------------------------------------------------------------------

/// Notification header: 1-byte id followed by a 2-byte sequence number
pub const HEADER_LEN: usize = 3;

/// Millisecond time-of-day stamp
pub const TIMESTAMP_LEN: usize = 4;

/// Fixed payload slot inside a frame
pub const PAYLOAD_SLOT_LEN: usize = 16;

/// Total encoded frame size
pub const FRAME_LEN: usize = HEADER_LEN + TIMESTAMP_LEN + PAYLOAD_SLOT_LEN;

/// Filler for unused payload bytes
pub const PAYLOAD_PAD_BYTE: u8 = 0xFF;

const TIMESTAMP_OFFSET: usize = HEADER_LEN;
const PAYLOAD_OFFSET: usize = HEADER_LEN + TIMESTAMP_LEN;

// ----------------------------------------------------------------------------
// Raw Notification
// ----------------------------------------------------------------------------

/// Decoded view over a raw characteristic notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawNotification<'a> {
    pub id: u8,
    pub sequence: u16,
    pub payload: &'a [u8],
}

impl<'a> RawNotification<'a> {
    /// Split a notification into header fields and payload
    pub fn parse(data: &'a [u8]) -> Result<Self, FrameError> {
        if data.len() < HEADER_LEN {
            return Err(FrameError::TooShort {
                len: data.len(),
                min: HEADER_LEN,
            });
        }

        let payload = &data[HEADER_LEN..];
        if payload.len() > PAYLOAD_SLOT_LEN {
            return Err(FrameError::PayloadTooLong {
                len: payload.len(),
                max: PAYLOAD_SLOT_LEN,
            });
        }

        Ok(Self {
            id: data[0],
            sequence: u16::from_le_bytes([data[1], data[2]]),
            payload,
        })
    }
}

// ----------------------------------------------------------------------------
// Telemetry Frame
// ----------------------------------------------------------------------------

/// Fixed-size telemetry record forwarded downstream
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TelemetryFrame([u8; FRAME_LEN]);

impl TelemetryFrame {
    /// Build a frame from a parsed notification and a time-of-day stamp
    pub fn new(notification: &RawNotification<'_>, timestamp_ms: u32) -> Self {
        let mut bytes = [PAYLOAD_PAD_BYTE; FRAME_LEN];
        bytes[0] = notification.id;
        bytes[1..HEADER_LEN].copy_from_slice(&notification.sequence.to_le_bytes());
        bytes[TIMESTAMP_OFFSET..PAYLOAD_OFFSET].copy_from_slice(&timestamp_ms.to_le_bytes());
        bytes[PAYLOAD_OFFSET..PAYLOAD_OFFSET + notification.payload.len()]
            .copy_from_slice(notification.payload);
        Self(bytes)
    }

    /// Parse raw notification bytes and build a frame in one step
    pub fn from_notification(data: &[u8], timestamp_ms: u32) -> Result<Self, FrameError> {
        let notification = RawNotification::parse(data)?;
        Ok(Self::new(&notification, timestamp_ms))
    }

    pub fn id(&self) -> u8 {
        self.0[0]
    }

    pub fn sequence(&self) -> u16 {
        u16::from_le_bytes([self.0[1], self.0[2]])
    }

    pub fn timestamp_ms(&self) -> u32 {
        let mut stamp = [0u8; TIMESTAMP_LEN];
        stamp.copy_from_slice(&self.0[TIMESTAMP_OFFSET..PAYLOAD_OFFSET]);
        u32::from_le_bytes(stamp)
    }

    /// Padded payload slot
    pub fn payload(&self) -> &[u8] {
        &self.0[PAYLOAD_OFFSET..]
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }
}

impl AsRef<[u8]> for TelemetryFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for TelemetryFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryFrame")
            .field("id", &self.id())
            .field("sequence", &self.sequence())
            .field("timestamp_ms", &self.timestamp_ms())
            .finish()
    }
}
