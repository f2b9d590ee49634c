//! Connection pool orchestration and packet reassembly for the Wenet relay
//!
//! ```text
//! Scanner -> discovery queue -> Connection Workers -> packet queue
//!         -> Batch Assembler -> output queue -> Frame Sender -> UDP
//! ```
//!
//! [`RelayRuntime`] builds the queues and spawns one task per stage on the
//! current tokio runtime. The tasks are transport-agnostic: the wireless side
//! is any [`wenet_core::BeaconTransport`] and the downstream side any
//! [`wenet_core::FrameSink`].

pub mod assembler;
pub mod capture;
pub mod channels;
pub mod context;
pub mod runtime;
pub mod scanner;
pub mod sender;
pub mod worker;

pub use assembler::{AssemblerSettings, BatchAssembler};
pub use capture::PacketCapture;
pub use channels::{create_pipeline_channels, Admission, AttemptOutcome, PipelineChannels};
pub use context::PipelineContext;
pub use runtime::{RelayHandle, RelayRuntime};
pub use scanner::DiscoveryScanner;
pub use sender::{FrameSender, UdpFrameSink};
pub use worker::{ConnectionWorker, WorkerSettings, WorkerState};

// Re-export for callers that only depend on the runtime crate
pub use tokio_util::sync::CancellationToken;
