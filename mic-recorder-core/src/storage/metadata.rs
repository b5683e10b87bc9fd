use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::MetadataError;
use crate::models::recording_result::RecordingMetadata;

/// Sidecar path for a recording: `take.wav` → `take.metadata.json`.
pub fn metadata_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("metadata.json")
}

/// Write recording metadata as a JSON sidecar file.
pub fn write_metadata(metadata: &RecordingMetadata, recording_path: &Path) -> Result<PathBuf, MetadataError> {
    let path = metadata_path(recording_path);
    let json = serde_json::to_string_pretty(metadata)?;
    fs::write(&path, json).map_err(|source| MetadataError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Read recording metadata from a JSON sidecar file.
pub fn read_metadata(recording_path: &Path) -> Result<RecordingMetadata, MetadataError> {
    let path = metadata_path(recording_path);
    let json = fs::read_to_string(&path).map_err(|source| MetadataError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(serde_json::from_str(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::format::AudioFormatDescriptor;

    #[test]
    fn sidecar_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("take.wav");
        let meta = RecordingMetadata::new(&wav, AudioFormatDescriptor::mono(16000), 16000, "deadbeef");

        let written = write_metadata(&meta, &wav).unwrap();
        assert_eq!(written, dir.path().join("take.metadata.json"));
        assert_eq!(read_metadata(&wav).unwrap(), meta);
    }

    #[test]
    fn missing_sidecar_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_metadata(&dir.path().join("absent.wav")).unwrap_err();
        assert!(matches!(err, MetadataError::Io { .. }));
    }
}
