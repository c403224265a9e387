use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// Sample rates tried during negotiation, highest first.
pub const DEFAULT_SAMPLE_RATE_CANDIDATES: [u32; 4] = [44100, 22050, 16000, 11025];

/// Period between two capture ticks.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 50;

/// Approximate 16-bit magnitude above which a sample counts as voice.
pub const DEFAULT_AMPLITUDE_THRESHOLD: u16 = 1500;

/// Consecutive empty ticks before a stall is reported (2 s at the default period).
pub const DEFAULT_STALLED_READ_TICKS: u64 = 40;

/// Highest candidate sample rate accepted by `validate()`.
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// What the platform should tune the input for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioSourceKind {
    Default,
    Microphone,
    VoiceRecognition,
    VoiceCommunication,
}

/// Sample encoding of the captured stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleEncoding {
    /// Signed 16-bit little-endian PCM.
    Pcm16Bit,
}

impl SampleEncoding {
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            Self::Pcm16Bit => 2,
        }
    }

    pub fn bit_depth(&self) -> u16 {
        match self {
            Self::Pcm16Bit => 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelLayout {
    Mono,
    Stereo,
}

impl ChannelLayout {
    pub fn channel_count(&self) -> u16 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }
}

/// Configuration for a speech emitter. Fixed once the emitter is built.
///
/// Missing JSON fields fall back to the defaults, so `{}` is a valid file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfiguration {
    /// Input tuning requested from the platform (default: voice recognition).
    pub audio_source: AudioSourceKind,

    /// Sample encoding (default: 16-bit PCM).
    pub encoding: SampleEncoding,

    /// Channel layout (default: mono). The voice gate assumes mono.
    pub channel_layout: ChannelLayout,

    /// Candidate sample rates in priority order.
    pub sample_rate_candidates: Vec<u32>,

    /// Capture tick period in milliseconds (default: 50).
    pub tick_interval_ms: u64,

    /// Voice gate threshold (default: 1500).
    pub amplitude_threshold: u16,

    /// Consecutive empty reads before a stall is reported (default: 40).
    pub stalled_read_ticks: u64,
}

impl CaptureConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate_candidates.is_empty() {
            return Err("at least one candidate sample rate is required".into());
        }
        if let Some(rate) = self
            .sample_rate_candidates
            .iter()
            .find(|r| **r == 0 || **r > MAX_SAMPLE_RATE)
        {
            return Err(format!("invalid candidate sample rate: {}", rate));
        }
        // The voice gate reads the buffer as one channel of samples.
        if self.channel_layout != ChannelLayout::Mono {
            return Err("only mono capture is supported".into());
        }
        if self.tick_interval_ms == 0 {
            return Err("tick interval must be positive".into());
        }
        if self.stalled_read_ticks == 0 {
            return Err("stalled read threshold must be positive".into());
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, CaptureError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CaptureError::ConfigurationFailed(format!("invalid configuration: {}", e)))?;
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, CaptureError> {
        let json = fs::read_to_string(path).map_err(|e| {
            CaptureError::ConfigurationFailed(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// Bytes per frame for the configured layout and encoding.
    pub fn frame_size(&self) -> usize {
        self.channel_layout.channel_count() as usize * self.encoding.bytes_per_sample()
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            audio_source: AudioSourceKind::VoiceRecognition,
            encoding: SampleEncoding::Pcm16Bit,
            channel_layout: ChannelLayout::Mono,
            sample_rate_candidates: DEFAULT_SAMPLE_RATE_CANDIDATES.to_vec(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            amplitude_threshold: DEFAULT_AMPLITUDE_THRESHOLD,
            stalled_read_ticks: DEFAULT_STALLED_READ_TICKS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid_voice_recognition_mono() {
        let config = CaptureConfiguration::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.audio_source, AudioSourceKind::VoiceRecognition);
        assert_eq!(config.sample_rate_candidates, vec![44100, 22050, 16000, 11025]);
        assert_eq!(config.frame_size(), 2);
    }

    #[test]
    fn rejects_empty_candidates_and_zero_values() {
        let mut config = CaptureConfiguration {
            sample_rate_candidates: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.sample_rate_candidates = vec![16000, 0];
        assert!(config.validate().is_err());

        config.sample_rate_candidates = vec![16000];
        config.tick_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = CaptureConfiguration::from_json_str(
            r#"{ "sample_rate_candidates": [16000], "channel_layout": "mono" }"#,
        )
        .unwrap();

        assert_eq!(config.sample_rate_candidates, vec![16000]);
        assert_eq!(config.channel_layout, ChannelLayout::Mono);
        assert_eq!(config.tick_interval_ms, DEFAULT_TICK_INTERVAL_MS);
        assert_eq!(config.amplitude_threshold, DEFAULT_AMPLITUDE_THRESHOLD);
        assert_eq!(config.frame_size(), 2);
    }

    #[test]
    fn rejects_stereo_and_out_of_range_rates() {
        let err = CaptureConfiguration::from_json_str(r#"{ "channel_layout": "stereo" }"#).unwrap_err();
        assert!(matches!(err, CaptureError::ConfigurationFailed(_)));

        let mut config = CaptureConfiguration {
            sample_rate_candidates: vec![44100, MAX_SAMPLE_RATE + 1],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.sample_rate_candidates = vec![MAX_SAMPLE_RATE];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_json_is_a_configuration_error() {
        let err = CaptureConfiguration::from_json_str(r#"{ "sample_rate_candidates": [] }"#)
            .unwrap_err();
        assert!(matches!(err, CaptureError::ConfigurationFailed(_)));

        let err = CaptureConfiguration::from_json_str("not json").unwrap_err();
        assert!(matches!(err, CaptureError::ConfigurationFailed(_)));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.json");
        fs::write(&path, r#"{ "audio_source": "microphone", "tick_interval_ms": 20 }"#).unwrap();

        let config = CaptureConfiguration::from_json_file(&path).unwrap();
        assert_eq!(config.audio_source, AudioSourceKind::Microphone);
        assert_eq!(config.tick_interval_ms, 20);
    }
}
