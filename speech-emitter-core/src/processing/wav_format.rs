//! RIFF/WAVE header for 16-bit PCM streams.
//!
//! The header is written with a zero data size when a file is opened and
//! patched in place once the stream ends.

use crate::models::config::CaptureConfiguration;

/// Size of the canonical PCM WAV header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Offset of the RIFF chunk size field.
pub const RIFF_SIZE_OFFSET: u64 = 4;

/// Offset of the data chunk size field.
pub const DATA_SIZE_OFFSET: u64 = 40;

/// Format fields of a PCM WAV stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
}

impl WavSpec {
    pub fn for_capture(config: &CaptureConfiguration, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: config.channel_layout.channel_count(),
            bit_depth: config.encoding.bit_depth(),
        }
    }

    pub fn block_align(&self) -> u16 {
        self.channels * self.bit_depth / 8
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * u32::from(self.block_align())
    }

    /// Build the header for `data_size` bytes of samples.
    ///
    /// ```text
    /// [0-3]   "RIFF"     [4-7]   36 + data_size
    /// [8-11]  "WAVE"     [12-15] "fmt "
    /// [16-19] 16         [20-21] 1 (PCM)
    /// [22-23] channels   [24-27] sample_rate
    /// [28-31] byte_rate  [32-33] block_align
    /// [34-35] bit_depth  [36-39] "data"
    /// [40-43] data_size
    /// ```
    pub fn header(&self, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
        let mut header = [0u8; WAV_HEADER_SIZE];
        header[0..4].copy_from_slice(b"RIFF");
        header[4..8].copy_from_slice(&riff_size(data_size).to_le_bytes());
        header[8..12].copy_from_slice(b"WAVE");
        header[12..16].copy_from_slice(b"fmt ");
        header[16..20].copy_from_slice(&16u32.to_le_bytes());
        header[20..22].copy_from_slice(&1u16.to_le_bytes());
        header[22..24].copy_from_slice(&self.channels.to_le_bytes());
        header[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        header[28..32].copy_from_slice(&self.byte_rate().to_le_bytes());
        header[32..34].copy_from_slice(&self.block_align().to_le_bytes());
        header[34..36].copy_from_slice(&self.bit_depth.to_le_bytes());
        header[36..40].copy_from_slice(b"data");
        header[40..44].copy_from_slice(&data_size.to_le_bytes());
        header
    }

    /// Read the format back from a header. Returns `None` for anything but PCM WAV.
    pub fn parse(header: &[u8]) -> Option<(Self, u32)> {
        if header.len() < WAV_HEADER_SIZE
            || &header[0..4] != b"RIFF"
            || &header[8..12] != b"WAVE"
            || &header[36..40] != b"data"
            || u16::from_le_bytes([header[20], header[21]]) != 1
        {
            return None;
        }
        let spec = Self {
            channels: u16::from_le_bytes([header[22], header[23]]),
            sample_rate: u32::from_le_bytes([header[24], header[25], header[26], header[27]]),
            bit_depth: u16::from_le_bytes([header[34], header[35]]),
        };
        let data_size = u32::from_le_bytes([header[40], header[41], header[42], header[43]]);
        Some((spec, data_size))
    }
}

/// RIFF chunk size for a given data size. Saturates past 4 GiB.
pub fn riff_size(data_size: u32) -> u32 {
    data_size.saturating_add(36)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let spec = WavSpec { sample_rate: 16000, channels: 1, bit_depth: 16 };
        let header = spec.header(3200);

        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..16], b"WAVEfmt ");
        assert_eq!(u32::from_le_bytes([header[4], header[5], header[6], header[7]]), 3236);
        assert_eq!(u32::from_le_bytes([header[28], header[29], header[30], header[31]]), 32000);
        assert_eq!(u16::from_le_bytes([header[32], header[33]]), 2);
    }

    #[test]
    fn parse_reads_back_format() {
        let spec = WavSpec { sample_rate: 22050, channels: 2, bit_depth: 16 };
        let (parsed, data_size) = WavSpec::parse(&spec.header(441)).unwrap();
        assert_eq!(parsed, spec);
        assert_eq!(data_size, 441);
        assert_eq!(parsed.block_align(), 4);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(WavSpec::parse(&[0u8; 44]).is_none());
        assert!(WavSpec::parse(b"RIFF").is_none());
    }

    #[test]
    fn spec_from_capture_configuration() {
        let spec = WavSpec::for_capture(&CaptureConfiguration::default(), 44100);
        assert_eq!(spec, WavSpec { sample_rate: 44100, channels: 1, bit_depth: 16 });
        assert_eq!(spec.byte_rate(), 88200);
    }

    #[test]
    fn riff_size_saturates() {
        assert_eq!(riff_size(0), 36);
        assert_eq!(riff_size(u32::MAX), u32::MAX);
    }
}
