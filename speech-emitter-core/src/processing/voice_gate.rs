//! Energy-threshold voice gate.
//!
//! Not a real VAD: each 16-bit little-endian sample is reduced to a rough
//! magnitude and compared against a fixed threshold. One loud sample is
//! enough to open the gate. The session-level latch keeps it open.

use crate::models::config::DEFAULT_AMPLITUDE_THRESHOLD;

/// Approximate magnitude of one little-endian 16-bit sample.
///
/// Both bytes are read as signed, so the result is `|hi| << 8 + |lo|`
/// rather than `|sample|`. The low byte's sign makes the value off by up
/// to 256, which is irrelevant next to the threshold.
#[inline]
pub fn approximate_magnitude(lo: u8, hi: u8) -> u32 {
    let hi = (hi as i8).unsigned_abs() as u32;
    let lo = (lo as i8).unsigned_abs() as u32;
    (hi << 8) + lo
}

/// Whether any sample in the first `valid_len` bytes exceeds `threshold`.
///
/// `valid_len` is clamped to the buffer; a trailing odd byte is ignored.
pub fn exceeds_amplitude(buffer: &[u8], valid_len: usize, threshold: u16) -> bool {
    let valid = valid_len.min(buffer.len());
    buffer[..valid]
        .chunks_exact(2)
        .any(|pair| approximate_magnitude(pair[0], pair[1]) > u32::from(threshold))
}

/// Whether the chunk is loud enough to be speech, using the default threshold.
pub fn is_voice_detected(buffer: &[u8], valid_len: usize) -> bool {
    exceeds_amplitude(buffer, valid_len, DEFAULT_AMPLITUDE_THRESHOLD)
}

/// One-way "is speaking" flag for a session.
#[derive(Debug, Clone)]
pub struct SpeechLatch {
    threshold: u16,
    speaking: bool,
}

impl SpeechLatch {
    pub fn new(threshold: u16) -> Self {
        Self {
            threshold,
            speaking: false,
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    /// Feed one chunk. Returns true only on the call that latches.
    pub fn observe(&mut self, buffer: &[u8], valid_len: usize) -> bool {
        if self.speaking {
            return false;
        }
        self.speaking = exceeds_amplitude(buffer, valid_len, self.threshold);
        self.speaking
    }
}

impl Default for SpeechLatch {
    fn default() -> Self {
        Self::new(DEFAULT_AMPLITUDE_THRESHOLD)
    }
}
