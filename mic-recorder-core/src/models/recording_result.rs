use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::format::AudioFormatDescriptor;

/// Result returned when a stop wrote a recording to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub file_path: PathBuf,
    pub format: AudioFormatDescriptor,
    pub sample_count: usize,
    pub duration_secs: f64,
    pub bytes_written: u64,
    pub checksum: String,
    pub metadata: Option<RecordingMetadata>,
}

impl RecordingResult {
    /// Complete frames (one sample per channel).
    pub fn frame_count(&self) -> usize {
        self.sample_count / self.format.channel_count.max(1) as usize
    }
}

/// Metadata stored alongside a recording.
///
/// Serializable for JSON export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub created_at: String,
    pub file_path: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub sample_count: usize,
    pub duration_secs: f64,
    pub checksum: String,
}

impl RecordingMetadata {
    pub fn new(
        file_path: &Path,
        format: AudioFormatDescriptor,
        sample_count: usize,
        checksum: &str,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            file_path: file_path.to_string_lossy().to_string(),
            sample_rate: format.sample_rate,
            channels: format.channel_count,
            bits_per_sample: format.bits_per_sample(),
            sample_count,
            duration_secs: format.duration_secs(sample_count),
            checksum: checksum.to_string(),
        }
    }
}
