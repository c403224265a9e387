//! # speech-emitter-cpal
//!
//! Cross-platform input backend for speech-emitter, built on cpal.
//!
//! Provides:
//! - `CpalPlatform`: `CapturePlatform` over the default cpal host
//! - `CpalCaptureDevice`: blocking-read device fed by a cpal input stream
//! - `device_enumerator`: input device lookup and config selection
//!
//! ## Usage
//! ```ignore
//! use speech_emitter_core::{CaptureConfiguration, SpeechEmitter};
//! use speech_emitter_cpal::CpalPlatform;
//!
//! let mut emitter = SpeechEmitter::new(CpalPlatform::default_device(), CaptureConfiguration::default())?;
//! emitter.start(|chunk| println!("{} bytes of speech", chunk.len()))?;
//! ```

pub mod cpal_capture;
pub mod device_enumerator;
pub mod error;
pub mod pcm;

pub use cpal_capture::{CpalCaptureDevice, CpalPlatform};
pub use device_enumerator::{find_input_device, list_input_devices};
pub use error::BackendError;
