//! # speech-emitter-core
//!
//! Platform-agnostic core for streaming microphone audio to a recognizer
//! only once someone starts speaking.
//!
//! Platform backends (cpal today) implement the `CapturePlatform` and
//! `CaptureDevice` traits and plug into the generic `SpeechEmitter`.
//!
//! ## Architecture
//!
//! ```text
//! speech-emitter-core (this crate)
//! ├── traits/       ← CapturePlatform, CaptureDevice, CaptureDelegate
//! ├── models/       ← CaptureError, CaptureState, CaptureConfiguration, AudioChunk, SessionSummary
//! ├── processing/   ← voice gate, RingBuffer, WAV header
//! ├── session/      ← negotiator, capture loop, SpeechEmitter (controller)
//! └── storage/      ← WavFileWriter, JSON session sidecar
//! ```
//!
//! ## Usage
//! ```ignore
//! use speech_emitter_core::{CaptureConfiguration, SpeechEmitter};
//!
//! let mut emitter = SpeechEmitter::new(platform, CaptureConfiguration::default())?;
//! emitter.start(|chunk| recognizer.send(chunk.bytes()))?;
//! // ...
//! let summary = emitter.stop();
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioChunk, AudioSource, SessionStats};
pub use models::config::{AudioSourceKind, CaptureConfiguration, ChannelLayout, SampleEncoding};
pub use models::error::CaptureError;
pub use models::session_summary::SessionSummary;
pub use models::state::CaptureState;
pub use processing::ring_buffer::RingBuffer;
pub use processing::voice_gate::{exceeds_amplitude, is_voice_detected, SpeechLatch};
pub use processing::wav_format::WavSpec;
pub use session::emitter::SpeechEmitter;
pub use session::negotiator::{negotiate, NegotiatedDevice, BUFFER_SIZE_MULTIPLIER};
pub use storage::wav_writer::{wav_sink, WavFileWriter, WrittenWav};
pub use traits::capture_delegate::CaptureDelegate;
pub use traits::capture_platform::{
    CaptureDevice, CapturePlatform, ChunkCallback, DeviceParams, DeviceState, ReadInterrupt,
};
