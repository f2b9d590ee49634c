//! Output envelope sent to the downstream relay
//!
//! The relay expects a JSON object of the form
//! `{"type": "...", "id": N, "repeats": 1, "packet": [254 integers]}`.

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::payload::BinaryPayload;

/// Default envelope tag understood by the downstream relay
pub const DEFAULT_ENVELOPE_TYPE: &str = "WENET_TX_SEC_PAYLOAD";

/// Default payload identifier
pub const DEFAULT_ENVELOPE_ID: u8 = 1;

/// Serialized wrapper around a [`BinaryPayload`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: u8,
    pub repeats: u32,
    pub packet: Vec<u8>,
}

impl OutputEnvelope {
    /// Wrap a payload for a single transmission
    pub fn new(kind: impl Into<String>, id: u8, payload: &BinaryPayload) -> Self {
        Self {
            kind: kind.into(),
            id,
            repeats: 1,
            packet: payload.as_bytes().to_vec(),
        }
    }

    /// Encode as the JSON datagram body
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
