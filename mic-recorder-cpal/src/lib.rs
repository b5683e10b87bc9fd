//! # mic-recorder-cpal
//!
//! cpal backend for mic-recorder.
//!
//! Provides:
//! - `CpalRuntime`: `AudioGraphRuntime` over the default input device of the default host
//! - `logging`: console plus rotating-file logging for the `record` binary
//!
//! ## Usage
//! ```ignore
//! use mic_recorder_core::{RecorderConfig, RecordingController};
//! use mic_recorder_cpal::CpalRuntime;
//!
//! let mut recorder = RecordingController::new(CpalRuntime::new(), RecorderConfig::default()).unwrap();
//! recorder.start().unwrap();
//! ```

pub mod logging;
pub mod runtime;

pub use runtime::{CpalContext, CpalRuntime};
