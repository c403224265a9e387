//! Conversion from native cpal samples to interleaved 16-bit LE PCM.

use cpal::{FromSample, Sample};

/// Append `data` (interleaved, `in_channels` wide) to `out` as 16-bit LE
/// PCM with `out_channels` per frame.
///
/// Mono output averages all input channels. Wider output copies matching
/// channels and repeats the last input channel when the input is narrower.
/// A trailing partial frame is dropped.
pub fn append_pcm16<T>(out: &mut Vec<u8>, data: &[T], in_channels: usize, out_channels: usize)
where
    T: Sample,
    i16: FromSample<T>,
{
    let in_channels = in_channels.max(1);
    let out_channels = out_channels.max(1);
    out.reserve(data.len() / in_channels * out_channels * 2);

    for frame in data.chunks_exact(in_channels) {
        if out_channels == 1 {
            let sum: i32 = frame.iter().map(|s| i32::from(s.to_sample::<i16>())).sum();
            let mono = (sum / in_channels as i32) as i16;
            out.extend_from_slice(&mono.to_le_bytes());
            continue;
        }
        for channel in 0..out_channels {
            let sample = frame[channel.min(in_channels - 1)].to_sample::<i16>();
            out.extend_from_slice(&sample.to_le_bytes());
        }
    }
}
