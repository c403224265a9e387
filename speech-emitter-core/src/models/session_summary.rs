use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::audio_models::SessionStats;

/// Summary of a finished capture session, returned by `SpeechEmitter::stop`.
///
/// Serializable for JSON export next to a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub sample_rate: u32,
    pub duration_secs: f64,
    pub stats: SessionStats,
}

impl SessionSummary {
    /// Whether the voice gate ever opened during the session.
    pub fn speech_detected(&self) -> bool {
        self.stats.speech_detected_at_tick.is_some()
    }

    /// Seconds of audio handed to the subscriber, assuming 16-bit frames of `channels`.
    pub fn delivered_secs(&self, channels: u16) -> f64 {
        let frame_bytes = 2 * u64::from(channels.max(1));
        if self.sample_rate == 0 {
            return 0.0;
        }
        (self.stats.bytes_delivered / frame_bytes) as f64 / f64::from(self.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(bytes_delivered: u64, speech_tick: Option<u64>) -> SessionSummary {
        SessionSummary {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            sample_rate: 16000,
            duration_secs: 2.0,
            stats: SessionStats {
                ticks: 40,
                bytes_read: 64000,
                bytes_delivered,
                chunks_delivered: 10,
                speech_detected_at_tick: speech_tick,
                ..Default::default()
            },
        }
    }

    #[test]
    fn delivered_secs_uses_mono_frames() {
        let s = summary(32000, Some(3));
        assert!((s.delivered_secs(1) - 1.0).abs() < 1e-9);
        assert!(s.speech_detected());
    }

    #[test]
    fn serializes_to_json() {
        let s = summary(0, None);
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"sample_rate\":16000"));
        let back: SessionSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
        assert!(!back.speech_detected());
    }
}
