/// Observable state of a `SpeechEmitter`.
///
/// State transitions:
/// ```text
/// idle → negotiating → ready → recording → idle
///              ↓                   ↑
///              └───────────────────┘   (start() on an idle emitter)
/// ```
/// `Ready` is only visible when the device was acquired ahead of `start()`,
/// e.g. by asking for the sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Negotiating,
    Ready { sample_rate: u32 },
    Recording { sample_rate: u32, speaking: bool },
}

impl CaptureState {
    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording { .. })
    }

    pub fn is_speaking(&self) -> bool {
        matches!(self, Self::Recording { speaking: true, .. })
    }

    /// The negotiated sample rate, if a device is currently held.
    pub fn sample_rate(&self) -> Option<u32> {
        match self {
            Self::Ready { sample_rate } | Self::Recording { sample_rate, .. } => Some(*sample_rate),
            Self::Idle | Self::Negotiating => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Negotiating => "negotiating",
            Self::Ready { .. } => "ready",
            Self::Recording { speaking: false, .. } => "listening",
            Self::Recording { speaking: true, .. } => "streaming",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_rate_only_when_device_held() {
        assert_eq!(CaptureState::Idle.sample_rate(), None);
        assert_eq!(CaptureState::Negotiating.sample_rate(), None);
        assert_eq!(CaptureState::Ready { sample_rate: 16000 }.sample_rate(), Some(16000));
        assert_eq!(
            CaptureState::Recording { sample_rate: 22050, speaking: false }.sample_rate(),
            Some(22050)
        );
    }

    #[test]
    fn labels_distinguish_listening_from_streaming() {
        let listening = CaptureState::Recording { sample_rate: 44100, speaking: false };
        let streaming = CaptureState::Recording { sample_rate: 44100, speaking: true };
        assert_eq!(listening.label(), "listening");
        assert_eq!(streaming.label(), "streaming");
        assert!(streaming.is_speaking());
        assert!(!listening.is_speaking());
    }
}
