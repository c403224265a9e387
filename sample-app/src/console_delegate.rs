use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use speech_emitter_core::{CaptureDelegate, CaptureError, CaptureState};

/// CaptureDelegate that reports lifecycle events on the console.
pub struct ConsoleDelegate {
    speech_started: AtomicBool,
}

impl ConsoleDelegate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            speech_started: AtomicBool::new(false),
        })
    }

    pub fn speech_started(&self) -> bool {
        self.speech_started.load(Ordering::Acquire)
    }
}

impl CaptureDelegate for ConsoleDelegate {
    fn on_state_changed(&self, state: &CaptureState) {
        match state.sample_rate() {
            Some(rate) => log::info!("State: {} ({} Hz)", state.label(), rate),
            None => log::info!("State: {}", state.label()),
        }
    }

    fn on_speech_started(&self, sample_rate: u32) {
        self.speech_started.store(true, Ordering::Release);
        println!("Speech detected, streaming at {} Hz", sample_rate);
    }

    fn on_error(&self, error: &CaptureError) {
        if error.is_fatal() {
            log::error!("Capture error: {}", error);
        } else {
            log::warn!("Capture warning: {}", error);
        }
    }
}
