use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::audio_models::{AudioChunk, AudioSource, SessionStats};
use crate::models::config::CaptureConfiguration;
use crate::models::error::CaptureError;
use crate::models::session_summary::SessionSummary;
use crate::models::state::CaptureState;
use crate::session::capture_loop::{run_capture_loop, CancelToken, CaptureSession};
use crate::session::negotiator::{negotiate, NegotiatedDevice};
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::capture_platform::{CaptureDevice, CapturePlatform, ChunkCallback, ReadInterrupt};

/// Bookkeeping for a running session. The device itself lives on the worker.
struct ActiveSession<D> {
    id: Uuid,
    started_at: DateTime<Utc>,
    started: Instant,
    sample_rate: u32,
    cancel: Arc<CancelToken>,
    interrupt: Option<ReadInterrupt>,
    worker: thread::JoinHandle<Option<NegotiatedDevice<D>>>,
    stats: Arc<Mutex<SessionStats>>,
    speaking: Arc<AtomicBool>,
}

/// Who holds the capture device right now.
enum Slot<D> {
    Idle,
    Ready(NegotiatedDevice<D>),
    Recording(ActiveSession<D>),
}

/// Session controller: streams microphone audio once speech is heard.
///
/// ```text
/// start() → negotiate (first use) → device.start() → capture thread
///                                        every tick: read → gate → subscriber
/// stop()  → cancel + join capture thread → device.stop() → device.release()
/// ```
///
/// The controller is not shared across threads by itself; wrap it in a
/// `Mutex` (as an app state would) to call `stop()` from elsewhere.
pub struct SpeechEmitter<P: CapturePlatform> {
    platform: P,
    config: CaptureConfiguration,
    slot: Slot<P::Device>,
    delegate: Option<Arc<dyn CaptureDelegate>>,
}

impl<P: CapturePlatform> SpeechEmitter<P> {
    pub fn new(platform: P, config: CaptureConfiguration) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(Self {
            platform,
            config,
            slot: Slot::Idle,
            delegate: None,
        })
    }

    /// Takes effect from the next `start()` for speech and error events.
    pub fn set_delegate(&mut self, delegate: Arc<dyn CaptureDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn configuration(&self) -> &CaptureConfiguration {
        &self.config
    }

    pub fn state(&self) -> CaptureState {
        match &self.slot {
            Slot::Idle => CaptureState::Idle,
            Slot::Ready(negotiated) => CaptureState::Ready {
                sample_rate: negotiated.sample_rate(),
            },
            Slot::Recording(active) => CaptureState::Recording {
                sample_rate: active.sample_rate,
                speaking: active.speaking.load(Ordering::SeqCst),
            },
        }
    }

    /// Live counters of the running session.
    pub fn stats(&self) -> Option<SessionStats> {
        match &self.slot {
            Slot::Recording(active) => Some(active.stats.lock().clone()),
            _ => None,
        }
    }

    pub fn available_audio_sources(&self) -> Result<Vec<AudioSource>, CaptureError> {
        self.platform.available_sources()
    }

    /// Negotiated sample rate. Opens the device first if nothing is open yet.
    pub fn sample_rate(&mut self) -> Result<u32, CaptureError> {
        self.acquire_device()
    }

    /// Start streaming to `subscriber`. Nothing is delivered until voice is detected.
    ///
    /// Fails with `AlreadyRecording` while a session runs, and with
    /// `DeviceUnavailable` when no candidate rate works. In both cases no
    /// capture thread is started.
    pub fn start<F>(&mut self, subscriber: F) -> Result<(), CaptureError>
    where
        F: FnMut(AudioChunk<'_>) + Send + 'static,
    {
        if matches!(self.slot, Slot::Recording(_)) {
            return Err(CaptureError::AlreadyRecording);
        }
        self.acquire_device()?;

        let mut negotiated = match mem::replace(&mut self.slot, Slot::Idle) {
            Slot::Ready(negotiated) => negotiated,
            other => {
                self.slot = other;
                return Err(CaptureError::Unknown("device vanished before start".into()));
            }
        };

        if let Err(e) = negotiated.device.start() {
            log::error!("Failed to start capture device: {}", e);
            self.slot = Slot::Ready(negotiated);
            return Err(e);
        }

        let sample_rate = negotiated.sample_rate();
        let session = CaptureSession::new(
            sample_rate,
            self.config.amplitude_threshold,
            self.config.stalled_read_ticks,
            self.delegate.clone(),
        );
        let stats = session.stats_handle();
        let speaking = session.speaking_handle();
        let cancel = Arc::new(CancelToken::default());
        let period = Duration::from_millis(self.config.tick_interval_ms);
        let callback: ChunkCallback = Box::new(subscriber);
        let interrupt = negotiated.device.read_interrupt();

        // Announced before the thread exists so it cannot trail the speech event.
        self.notify(&CaptureState::Recording {
            sample_rate,
            speaking: false,
        });

        // Parked here so a failed spawn can give the device back.
        let handoff = Arc::new(Mutex::new(Some((negotiated, session))));

        let spawned = thread::Builder::new().name("speech-capture".into()).spawn({
            let handoff = Arc::clone(&handoff);
            let cancel = Arc::clone(&cancel);
            move || {
                let (negotiated, session) = handoff.lock().take()?;
                Some(run_capture_loop(negotiated, session, callback, cancel, period))
            }
        });

        let worker = match spawned {
            Ok(worker) => worker,
            Err(e) => {
                if let Some((mut negotiated, _)) = handoff.lock().take() {
                    if let Err(stop_err) = negotiated.device.stop() {
                        log::warn!("Failed to stop device after spawn failure: {}", stop_err);
                    }
                    self.slot = Slot::Ready(negotiated);
                }
                self.notify_state();
                return Err(CaptureError::Unknown(format!(
                    "failed to spawn capture thread: {}",
                    e
                )));
            }
        };

        let active = ActiveSession {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            started: Instant::now(),
            sample_rate,
            cancel,
            interrupt,
            worker,
            stats,
            speaking,
        };
        log::info!(
            "Capture session {} started at {} Hz, tick {:?}",
            active.id,
            sample_rate,
            period
        );
        self.slot = Slot::Recording(active);
        Ok(())
    }

    /// Stop capturing and release the device. Idempotent.
    ///
    /// Waits for an in-flight subscriber call to finish; a blocked read is
    /// interrupted when the device supports it. No chunk is delivered after
    /// this returns. Returns the session summary
    /// when a session was running.
    pub fn stop(&mut self) -> Option<SessionSummary> {
        match mem::replace(&mut self.slot, Slot::Idle) {
            Slot::Idle => None,
            Slot::Ready(mut negotiated) => {
                negotiated.device.release();
                log::debug!("Released idle capture device");
                self.notify_state();
                None
            }
            Slot::Recording(active) => {
                let summary = self.finish_session(active);
                self.notify_state();
                Some(summary)
            }
        }
    }

    // --- Internal helpers ---

    fn finish_session(&self, active: ActiveSession<P::Device>) -> SessionSummary {
        active.cancel.cancel();
        if let Some(interrupt) = &active.interrupt {
            interrupt();
        }

        match active.worker.join() {
            Ok(Some(mut negotiated)) => {
                if let Err(e) = negotiated.device.stop() {
                    log::warn!("Failed to stop capture device: {}", e);
                }
                negotiated.device.release();
            }
            Ok(None) => log::warn!("Capture thread never received the device"),
            Err(_) => log::error!("Capture thread panicked; device dropped without release"),
        }

        let summary = SessionSummary {
            id: active.id,
            started_at: active.started_at,
            sample_rate: active.sample_rate,
            duration_secs: active.started.elapsed().as_secs_f64(),
            stats: active.stats.lock().clone(),
        };
        log::info!(
            "Capture session {} stopped after {:.2}s: {} ticks, {} chunks delivered",
            summary.id,
            summary.duration_secs,
            summary.stats.ticks,
            summary.stats.chunks_delivered
        );
        summary
    }

    /// Negotiate on first use; later calls return the held device's rate.
    fn acquire_device(&mut self) -> Result<u32, CaptureError> {
        match &self.slot {
            Slot::Ready(negotiated) => return Ok(negotiated.sample_rate()),
            Slot::Recording(active) => return Ok(active.sample_rate),
            Slot::Idle => {}
        }

        self.notify(&CaptureState::Negotiating);
        match negotiate(&self.platform, &self.config) {
            Ok(negotiated) => {
                let rate = negotiated.sample_rate();
                self.slot = Slot::Ready(negotiated);
                self.notify_state();
                Ok(rate)
            }
            Err(e) => {
                self.notify_state();
                if let Some(ref delegate) = self.delegate {
                    delegate.on_error(&e);
                }
                Err(e)
            }
        }
    }

    fn notify_state(&self) {
        self.notify(&self.state());
    }

    fn notify(&self, state: &CaptureState) {
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(state);
        }
    }
}

impl<P: CapturePlatform> Drop for SpeechEmitter<P> {
    fn drop(&mut self) {
        self.stop();
    }
}
