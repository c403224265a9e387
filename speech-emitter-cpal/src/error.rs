use thiserror::Error;

use speech_emitter_core::CaptureError;

/// Failures while talking to cpal, before they are folded into `CaptureError`.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no input device available{}", .0.as_deref().map(|n| format!(" named '{}'", n)).unwrap_or_default())]
    NoDevice(Option<String>),

    #[error("{0} Hz is not supported by the input device")]
    RateUnsupported(u32),

    #[error("failed to enumerate devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to query input configs: {0}")]
    Configs(#[from] cpal::SupportedStreamConfigsError),

    #[error("failed to build input stream: {0}")]
    Build(#[from] cpal::BuildStreamError),

    #[error("failed to start input stream: {0}")]
    Play(#[from] cpal::PlayStreamError),

    #[error("failed to pause input stream: {0}")]
    Pause(#[from] cpal::PauseStreamError),

    #[error("stream thread is gone")]
    StreamThreadGone,
}

impl From<BackendError> for CaptureError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::RateUnsupported(sample_rate) => {
                CaptureError::UnsupportedConfiguration { sample_rate }
            }
            BackendError::NoDevice(_) => CaptureError::DeviceUnavailable,
            other => CaptureError::DeviceFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_capture_errors() {
        assert_eq!(
            CaptureError::from(BackendError::RateUnsupported(44100)),
            CaptureError::UnsupportedConfiguration { sample_rate: 44100 }
        );
        assert_eq!(
            CaptureError::from(BackendError::NoDevice(None)),
            CaptureError::DeviceUnavailable
        );
        assert!(matches!(
            CaptureError::from(BackendError::StreamThreadGone),
            CaptureError::DeviceFailed(_)
        ));
    }

    #[test]
    fn names_missing_device() {
        assert_eq!(
            BackendError::NoDevice(Some("USB Mic".into())).to_string(),
            "no input device available named 'USB Mic'"
        );
        assert_eq!(BackendError::NoDevice(None).to_string(), "no input device available");
    }
}
