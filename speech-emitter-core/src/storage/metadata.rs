use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::models::session_summary::SessionSummary;

/// Sidecar path for a recording: `speech.wav` → `speech.session.json`.
pub fn metadata_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("session.json")
}

/// Write a session summary as a JSON sidecar next to the recording.
pub fn write_metadata(summary: &SessionSummary, recording_path: &Path) -> Result<PathBuf, CaptureError> {
    let path = metadata_path(recording_path);
    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| CaptureError::StorageError(format!("failed to serialize summary: {}", e)))?;
    fs::write(&path, json)
        .map_err(|e| CaptureError::StorageError(format!("failed to write summary: {}", e)))?;
    Ok(path)
}

/// Read a session summary back from its JSON sidecar.
pub fn read_metadata(recording_path: &Path) -> Result<SessionSummary, CaptureError> {
    let json = fs::read_to_string(metadata_path(recording_path))
        .map_err(|e| CaptureError::StorageError(format!("failed to read summary: {}", e)))?;
    serde_json::from_str(&json)
        .map_err(|e| CaptureError::StorageError(format!("failed to parse summary: {}", e)))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::models::audio_models::SessionStats;

    #[test]
    fn sidecar_sits_next_to_recording() {
        assert_eq!(
            metadata_path(Path::new("/tmp/out/speech.wav")),
            PathBuf::from("/tmp/out/speech.session.json")
        );
    }

    #[test]
    fn summary_survives_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let recording = dir.path().join("speech.wav");
        let summary = SessionSummary {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            sample_rate: 22050,
            duration_secs: 1.5,
            stats: SessionStats {
                ticks: 30,
                chunks_delivered: 12,
                speech_detected_at_tick: Some(19),
                ..Default::default()
            },
        };

        let written = write_metadata(&summary, &recording).unwrap();
        assert!(written.exists());
        assert_eq!(read_metadata(&recording).unwrap(), summary);
    }

    #[test]
    fn missing_sidecar_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_metadata(&dir.path().join("nothing.wav")).unwrap_err();
        assert!(matches!(err, CaptureError::StorageError(_)));
    }
}
