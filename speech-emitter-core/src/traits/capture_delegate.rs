use crate::models::error::CaptureError;
use crate::models::state::CaptureState;

/// Event delegate for speech emitter notifications.
///
/// State changes fire from the thread driving the emitter, speech onset and
/// errors from the capture thread. Implementations should marshal to a UI
/// thread if needed and must return quickly.
pub trait CaptureDelegate: Send + Sync {
    /// Called when the emitter state changes.
    fn on_state_changed(&self, state: &CaptureState);

    /// Called once per session when the voice gate latches.
    fn on_speech_started(&self, sample_rate: u32) {
        let _ = sample_rate;
    }

    /// Called for non-fatal errors raised while capturing.
    fn on_error(&self, error: &CaptureError) {
        let _ = error;
    }
}
