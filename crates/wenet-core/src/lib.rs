//! Wenet BLE relay core
//!
//! Platform-independent pieces of the relay: the telemetry frame and batch
//! payload codecs, the output envelope, per-connection sequence tracking, the
//! connection capacity limiter, pipeline counters, configuration, and the
//! traits the wireless and datagram transports implement.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod config;
pub mod envelope;
pub mod errors;
pub mod frame;
pub mod limiter;
pub mod payload;
pub mod sequence;
pub mod stats;
pub mod time;
pub mod transport;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::{RelayConfig, WENET_SENSOR_CHARACTERISTIC_UUID, WENET_SERVICE_UUID};
pub use envelope::OutputEnvelope;
pub use errors::{FrameError, RelayError, Result};
pub use frame::{RawNotification, TelemetryFrame, FRAME_LEN};
pub use limiter::{CapacityLimiter, SlotPermit};
pub use payload::{Batch, BinaryPayload, BINARY_PAYLOAD_LEN, MAX_FRAMES_PER_BATCH};
pub use sequence::{SequenceGap, SequenceTracker};
pub use stats::{PipelineStats, StatsSnapshot};
pub use time::{SystemTimeSource, TimeSource};
pub use transport::{
    Advertisement, AdvertisementStream, BeaconLink, BeaconTransport, DeviceHandle, FrameSink,
    NotificationStream, PendingLink, ScanFilter,
};
