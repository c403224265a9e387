use thiserror::Error;

/// Errors produced while negotiating, running or tearing down a capture session.
///
/// Only `DeviceUnavailable`, `AlreadyRecording`, `ConfigurationFailed`,
/// `DeviceFailed` and `Unknown` ever surface from the session controller.
/// The per-tick variants are swallowed by the capture loop and only reach
/// the delegate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The platform rejected one candidate configuration. Negotiation moves on.
    #[error("unsupported configuration: {sample_rate} Hz")]
    UnsupportedConfiguration { sample_rate: u32 },

    /// Every candidate sample rate was rejected or failed to initialize.
    #[error("no capture device could be initialized")]
    DeviceUnavailable,

    #[error("a capture session is already recording")]
    AlreadyRecording,

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("device failed: {0}")]
    DeviceFailed(String),

    #[error("read failed: {0}")]
    ReadFailed(String),

    /// No data arrived for `ticks` consecutive ticks.
    #[error("capture stalled for {ticks} ticks")]
    ReadStalled { ticks: u64 },

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl CaptureError {
    /// Whether the error ends the session (as opposed to a single tick or candidate).
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::UnsupportedConfiguration { .. } | Self::ReadFailed(_) | Self::ReadStalled { .. }
        )
    }
}
