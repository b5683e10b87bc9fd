use std::path::PathBuf;

use thiserror::Error;

use super::state::RecordingState;

/// Failures while building or driving the capture graph.
///
/// The graph releases anything it partially created before returning one of these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AudioGraphError {
    #[error("no audio input device available")]
    DeviceNotAvailable,

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("audio context failed: {0}")]
    ContextFailed(String),

    #[error("audio node failed: {0}")]
    NodeFailed(String),
}

/// Failures while persisting captured samples.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FileWriteError {
    #[error("cannot write {}: {reason}", path.display())]
    NotWritable { path: PathBuf, reason: String },

    #[error("short write to {}: expected {expected} bytes, wrote {actual}", path.display())]
    ShortWrite {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("sample data too large for a WAV container: {0} bytes")]
    TooLarge(u64),
}

/// Why `start()` did not begin a new session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StartError {
    #[error("recorder is already {0}")]
    AlreadyActive(RecordingState),

    #[error(transparent)]
    Graph(#[from] AudioGraphError),
}

/// Invalid recorder configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("sample rate must be positive")]
    ZeroSampleRate,

    #[error("channel count must be positive")]
    ZeroChannels,

    #[error("output channel count must be positive")]
    ZeroOutputChannels,

    #[error("gain must be finite and non-negative, got {0}")]
    InvalidGain(f32),

    #[error("buffer duration must be finite and non-negative, got {0}")]
    InvalidBufferDuration(f64),

    #[error("unsupported capture format: {0}")]
    UnsupportedFormat(String),

    #[error("reserving {0}s up front exceeds the {max}s cap", max = super::config::MAX_RESERVE_SECS)]
    ReserveTooLarge(f64),

    #[error("buffer limit of {0}s exceeds what one WAV file can hold")]
    BufferTooLarge(f64),
}

/// Failures reading or writing a metadata sidecar.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata io error for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("metadata serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}
