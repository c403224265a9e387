use serde::{Deserialize, Serialize};

/// An input device the platform can capture from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSource {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

/// One tick's worth of captured audio, lent to the subscriber.
///
/// The underlying buffer is reused on the next tick, so the chunk cannot
/// outlive the callback. Copy the bytes out if they are needed later.
#[derive(Debug, Clone, Copy)]
pub struct AudioChunk<'a> {
    buffer: &'a [u8],
    valid_len: usize,
}

impl<'a> AudioChunk<'a> {
    /// `valid_len` is clamped to the buffer length.
    pub fn new(buffer: &'a [u8], valid_len: usize) -> Self {
        Self {
            buffer,
            valid_len: valid_len.min(buffer.len()),
        }
    }

    /// The valid bytes of this chunk.
    pub fn bytes(&self) -> &'a [u8] {
        &self.buffer[..self.valid_len]
    }

    /// The whole read buffer, including bytes past `len()` left over from earlier ticks.
    pub fn buffer(&self) -> &'a [u8] {
        self.buffer
    }

    pub fn len(&self) -> usize {
        self.valid_len
    }

    pub fn is_empty(&self) -> bool {
        self.valid_len == 0
    }
}

/// Per-session counters, updated by the capture thread.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub ticks: u64,
    pub bytes_read: u64,
    pub empty_reads: u64,
    pub chunks_delivered: u64,
    pub bytes_delivered: u64,
    /// Tick (1-based) on which the voice gate latched, if it did.
    pub speech_detected_at_tick: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_exposes_only_valid_bytes() {
        let buffer = [1u8, 2, 3, 4, 5, 6];
        let chunk = AudioChunk::new(&buffer, 4);

        assert_eq!(chunk.len(), 4);
        assert_eq!(chunk.bytes(), &[1, 2, 3, 4]);
        assert_eq!(chunk.buffer().len(), 6);
    }

    #[test]
    fn chunk_clamps_valid_len() {
        let buffer = [1u8, 2];
        let chunk = AudioChunk::new(&buffer, 10);
        assert_eq!(chunk.len(), 2);
        assert!(!chunk.is_empty());
        assert!(AudioChunk::new(&buffer, 0).is_empty());
    }
}
