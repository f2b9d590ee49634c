//! Batched binary payload
//!
//! Up to [`MAX_FRAMES_PER_BATCH`] frames are packed into a fixed 254-byte
//! record: a 1-byte frame count followed by the concatenated frames, with the
//! remainder zero-filled.

use smallvec::SmallVec;

use crate::errors::FrameError;
use crate::frame::{TelemetryFrame, FRAME_LEN};

/// Most frames a single payload can carry
pub const MAX_FRAMES_PER_BATCH: usize = 11;

/// Space for frame bytes after the count byte
pub const PAYLOAD_BODY_LEN: usize = 253;

/// Total payload size
pub const BINARY_PAYLOAD_LEN: usize = 1 + PAYLOAD_BODY_LEN;

// 11 frames must always fit the body
const _: () = assert!(MAX_FRAMES_PER_BATCH * FRAME_LEN <= PAYLOAD_BODY_LEN);

/// Frames collected in one assembly window, in arrival order
pub type Batch = SmallVec<[TelemetryFrame; MAX_FRAMES_PER_BATCH]>;

/// Fixed 254-byte payload carried inside an output envelope
#[derive(Clone, PartialEq, Eq)]
pub struct BinaryPayload([u8; BINARY_PAYLOAD_LEN]);

impl BinaryPayload {
    /// Pack a batch of 1 to 11 frames, preserving arrival order
    pub fn from_frames(frames: &[TelemetryFrame]) -> Result<Self, FrameError> {
        if frames.is_empty() {
            return Err(FrameError::EmptyBatch);
        }
        if frames.len() > MAX_FRAMES_PER_BATCH {
            return Err(FrameError::BatchOverflow {
                count: frames.len(),
                max: MAX_FRAMES_PER_BATCH,
            });
        }

        let mut bytes = [0u8; BINARY_PAYLOAD_LEN];
        bytes[0] = frames.len() as u8;
        for (slot, frame) in bytes[1..].chunks_exact_mut(FRAME_LEN).zip(frames) {
            slot.copy_from_slice(frame.as_bytes());
        }
        Ok(Self(bytes))
    }

    /// Number of frames packed into the payload
    pub fn frame_count(&self) -> usize {
        self.0[0] as usize
    }

    /// Frame bytes actually in use, excluding the zero tail
    pub fn frame_bytes(&self) -> &[u8] {
        &self.0[1..1 + self.frame_count() * FRAME_LEN]
    }

    pub fn as_bytes(&self) -> &[u8; BINARY_PAYLOAD_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for BinaryPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryPayload")
            .field("frames", &self.frame_count())
            .finish()
    }
}
