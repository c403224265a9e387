use std::sync::Arc;

use crate::models::audio_models::{AudioChunk, AudioSource};
use crate::models::config::{AudioSourceKind, ChannelLayout, SampleEncoding};
use crate::models::error::CaptureError;

/// Subscriber receiving gated audio.
///
/// Runs on the capture thread, once per tick after speech was detected.
/// Blocking here delays the next read and `SpeechEmitter::stop`.
pub type ChunkCallback = Box<dyn FnMut(AudioChunk<'_>) + Send + 'static>;

/// Wakes a `read` blocked on another thread so it returns promptly.
pub type ReadInterrupt = Arc<dyn Fn() + Send + Sync>;

/// Parameters for opening a capture device at one negotiated sample rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceParams {
    pub audio_source: AudioSourceKind,
    pub sample_rate: u32,
    pub channel_layout: ChannelLayout,
    pub encoding: SampleEncoding,
    /// Size in bytes of the buffer the caller reads into.
    pub buffer_size: usize,
}

/// Post-construction state of a device handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Uninitialized,
    Initialized,
}

/// Platform capture API: buffer-size queries and device construction.
///
/// Implemented by:
/// - `CpalPlatform` (speech-emitter-cpal)
///
/// Whatever construction path a platform needs internally, the core only
/// calls these two operations during negotiation.
pub trait CapturePlatform: Send + Sync {
    type Device: CaptureDevice;

    /// Minimum buffer size in bytes for the given format.
    ///
    /// Returns `CaptureError::UnsupportedConfiguration` when the platform
    /// cannot capture at this combination.
    fn min_buffer_size(
        &self,
        sample_rate: u32,
        channel_layout: ChannelLayout,
        encoding: SampleEncoding,
    ) -> Result<usize, CaptureError>;

    /// Open and configure a device. Callers must still check `state()`.
    fn open(&self, params: &DeviceParams) -> Result<Self::Device, CaptureError>;

    /// Input devices this platform could capture from.
    fn available_sources(&self) -> Result<Vec<AudioSource>, CaptureError> {
        Ok(Vec::new())
    }
}

/// An opened capture stream at a fixed sample rate.
///
/// Owned by exactly one thread at a time; the session controller moves it
/// into the capture thread while recording.
pub trait CaptureDevice: Send + 'static {
    fn state(&self) -> DeviceState;

    fn sample_rate(&self) -> u32;

    /// Begin recording.
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Blocking read into `buffer`. Returns the number of valid bytes;
    /// `Ok(0)` means no data this time.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, CaptureError>;

    /// Handle that unblocks a pending `read` while the device is owned by
    /// the capture thread. Devices whose reads return quickly need none.
    ///
    /// After an interrupt, reads may fail until the next `start()`.
    fn read_interrupt(&self) -> Option<ReadInterrupt> {
        None
    }

    /// Stop recording. The device may be started again.
    fn stop(&mut self) -> Result<(), CaptureError>;

    /// Release platform resources. The handle is unusable afterwards.
    fn release(&mut self);
}
