use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::models::audio_models::{AudioChunk, SessionStats};
use crate::models::error::CaptureError;
use crate::models::state::CaptureState;
use crate::processing::voice_gate::SpeechLatch;
use crate::session::negotiator::NegotiatedDevice;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::capture_platform::{CaptureDevice, ChunkCallback};

/// Cancellation flag the capture thread can sleep on.
#[derive(Default)]
pub(crate) struct CancelToken {
    cancelled: Mutex<bool>,
    condvar: Condvar,
}

impl CancelToken {
    pub(crate) fn cancel(&self) {
        *self.cancelled.lock() = true;
        self.condvar.notify_all();
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        *self.cancelled.lock()
    }

    /// Sleep for `timeout` unless cancelled first. Returns true if cancelled.
    pub(crate) fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut cancelled = self.cancelled.lock();
        while !*cancelled {
            if self.condvar.wait_until(&mut cancelled, deadline).timed_out() {
                break;
            }
        }
        *cancelled
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    /// The read produced no bytes (or failed).
    NoData,
    /// Bytes were read but the gate is still closed.
    Gated,
    /// A chunk of this many bytes went to the subscriber.
    Delivered(usize),
}

/// State of one start/stop cycle, owned by the capture thread.
pub(crate) struct CaptureSession {
    latch: SpeechLatch,
    sample_rate: u32,
    stalled_read_ticks: u64,
    empty_streak: u64,
    stats: Arc<Mutex<SessionStats>>,
    speaking: Arc<AtomicBool>,
    delegate: Option<Arc<dyn CaptureDelegate>>,
}

impl CaptureSession {
    pub(crate) fn new(
        sample_rate: u32,
        amplitude_threshold: u16,
        stalled_read_ticks: u64,
        delegate: Option<Arc<dyn CaptureDelegate>>,
    ) -> Self {
        Self {
            latch: SpeechLatch::new(amplitude_threshold),
            sample_rate,
            stalled_read_ticks,
            empty_streak: 0,
            stats: Arc::new(Mutex::new(SessionStats::default())),
            speaking: Arc::new(AtomicBool::new(false)),
            delegate,
        }
    }

    pub(crate) fn stats_handle(&self) -> Arc<Mutex<SessionStats>> {
        Arc::clone(&self.stats)
    }

    pub(crate) fn speaking_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.speaking)
    }

    /// Read once, run the gate until it latches, forward once latched.
    ///
    /// An empty or failed read never reaches the gate and never reaches the
    /// subscriber.
    pub(crate) fn tick<D: CaptureDevice>(
        &mut self,
        negotiated: &mut NegotiatedDevice<D>,
        subscriber: &mut ChunkCallback,
    ) -> TickOutcome {
        let NegotiatedDevice { device, buffer } = negotiated;

        let read = match device.read(buffer) {
            Ok(n) => n.min(buffer.len()),
            Err(e) => {
                log::debug!("Capture read failed: {}", e);
                0
            }
        };

        let tick = {
            let mut stats = self.stats.lock();
            stats.ticks += 1;
            stats.bytes_read += read as u64;
            if read == 0 {
                stats.empty_reads += 1;
            }
            stats.ticks
        };

        if read == 0 {
            self.note_empty_read();
            return TickOutcome::NoData;
        }
        if self.empty_streak >= self.stalled_read_ticks {
            log::info!("Capture resumed after {} empty ticks", self.empty_streak);
        }
        self.empty_streak = 0;

        if self.latch.observe(&buffer[..], read) {
            self.on_speech_started(tick);
        }
        if !self.latch.is_speaking() {
            return TickOutcome::Gated;
        }

        (*subscriber)(AudioChunk::new(&buffer[..], read));

        let mut stats = self.stats.lock();
        stats.chunks_delivered += 1;
        stats.bytes_delivered += read as u64;
        TickOutcome::Delivered(read)
    }

    fn on_speech_started(&self, tick: u64) {
        self.speaking.store(true, Ordering::SeqCst);
        self.stats.lock().speech_detected_at_tick = Some(tick);
        log::info!("Voice detected on tick {}, streaming", tick);

        if let Some(ref delegate) = self.delegate {
            delegate.on_speech_started(self.sample_rate);
            delegate.on_state_changed(&CaptureState::Recording {
                sample_rate: self.sample_rate,
                speaking: true,
            });
        }
    }

    fn note_empty_read(&mut self) {
        self.empty_streak += 1;
        if self.empty_streak != self.stalled_read_ticks {
            return;
        }
        let error = CaptureError::ReadStalled {
            ticks: self.empty_streak,
        };
        log::warn!("{}", error);
        if let Some(ref delegate) = self.delegate {
            delegate.on_error(&error);
        }
    }
}

/// Run ticks at a fixed rate until cancelled, then hand the device back.
///
/// The first tick runs immediately. A tick that overruns its slot is
/// followed by the next one right away and the schedule re-anchors, so
/// late ticks are never run back to back to catch up.
pub(crate) fn run_capture_loop<D: CaptureDevice>(
    mut negotiated: NegotiatedDevice<D>,
    mut session: CaptureSession,
    mut subscriber: ChunkCallback,
    cancel: Arc<CancelToken>,
    period: Duration,
) -> NegotiatedDevice<D> {
    let mut next = Instant::now();
    while !cancel.is_cancelled() {
        session.tick(&mut negotiated, &mut subscriber);

        next += period;
        let now = Instant::now();
        if next > now {
            if cancel.wait(next - now) {
                break;
            }
        } else {
            next = now;
        }
    }
    log::debug!("Capture loop exited");
    negotiated
}
