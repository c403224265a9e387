//! Input device lookup via the cpal default host.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, SampleFormat, SampleRate, SupportedBufferSize, SupportedStreamConfig};

use speech_emitter_core::AudioSource;

use crate::error::BackendError;

/// Resolve the input device: the named one, or the host default.
pub fn find_input_device(name: Option<&str>) -> Result<Device, BackendError> {
    let host = cpal::default_host();
    match name {
        Some(name) => host
            .input_devices()?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| BackendError::NoDevice(Some(name.to_string()))),
        None => host.default_input_device().ok_or(BackendError::NoDevice(None)),
    }
}

/// Active input devices, default first.
pub fn list_input_devices() -> Result<Vec<AudioSource>, BackendError> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let mut sources: Vec<AudioSource> = host
        .input_devices()?
        .filter_map(|d| d.name().ok())
        .map(|name| AudioSource {
            id: name.clone(),
            is_default: default_name.as_deref() == Some(name.as_str()),
            name,
        })
        .collect();
    sources.sort_by_key(|s| !s.is_default);
    Ok(sources)
}

/// Rank of a sample format; lower is preferred. `None` if we cannot convert it.
pub(crate) fn format_rank(format: SampleFormat) -> Option<u8> {
    match format {
        SampleFormat::I16 => Some(0),
        SampleFormat::F32 => Some(1),
        SampleFormat::I32 => Some(2),
        SampleFormat::U16 => Some(3),
        _ => None,
    }
}

/// Best input configuration at exactly `sample_rate`.
///
/// Prefers the fewest channels, then the format closest to 16-bit PCM.
pub fn select_input_config(device: &Device, sample_rate: u32) -> Result<SupportedStreamConfig, BackendError> {
    device
        .supported_input_configs()?
        .filter(|range| range.min_sample_rate().0 <= sample_rate && sample_rate <= range.max_sample_rate().0)
        .filter_map(|range| format_rank(range.sample_format()).map(|rank| (range, rank)))
        .min_by_key(|(range, rank)| (range.channels(), *rank))
        .map(|(range, _)| range.with_sample_rate(SampleRate(sample_rate)))
        .ok_or(BackendError::RateUnsupported(sample_rate))
}

/// Smallest period the host reports for a config, in frames. Zero when unknown.
pub fn min_period_frames(config: &SupportedStreamConfig) -> u32 {
    match config.buffer_size() {
        SupportedBufferSize::Range { min, .. } => *min,
        SupportedBufferSize::Unknown => 0,
    }
}
