//! # mic-recorder-core
//!
//! Platform-agnostic microphone recording core library.
//!
//! Provides the capture graph, sample buffering, float WAV output and the
//! recording state machine. Audio backends (cpal, test mocks) implement the
//! `AudioGraphRuntime` trait and plug into the generic `RecordingController`.
//!
//! ## Architecture
//!
//! ```text
//! mic-recorder-core (this crate)
//! ├── traits/       ← AudioGraphRuntime, LogSink
//! ├── models/       ← errors, RecordingState, RecorderConfig, AudioFormatDescriptor, etc.
//! ├── processing/   ← SampleBuffer, GainStage, WAV header generation
//! ├── graph/        ← AudioGraph (input → gain → capture tap)
//! ├── session/      ← RecordingController (generic orchestrator)
//! ├── storage/      ← FileWriter, metadata sidecar
//! └── runtime/      ← MockRuntime for tests and demos
//! ```

pub mod graph;
pub mod models;
pub mod processing;
pub mod runtime;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use graph::audio_graph::{AudioGraph, BlockOutcome, BlockSink};
pub use models::config::RecorderConfig;
pub use models::diagnostics::CaptureDiagnostics;
pub use models::error::{AudioGraphError, ConfigError, FileWriteError, MetadataError, StartError};
pub use models::format::AudioFormatDescriptor;
pub use models::recording_result::{RecordingMetadata, RecordingResult};
pub use models::state::{AtomicRecordingState, RecordingState};
pub use processing::gain::GainStage;
pub use processing::sample_buffer::{Overflow, SampleBuffer};
pub use processing::wav_format::WavHeader;
pub use runtime::mock::{MockContext, MockFailure, MockHardware, MockRuntime};
pub use session::controller::RecordingController;
pub use storage::file_writer::{FileWriter, WriteSummary};
pub use traits::log_sink::{CollectingLogSink, LogCrateSink, LogSink};
pub use traits::runtime::{AudioGraphRuntime, BlockCallback, NodeId};
