use crate::models::config::CaptureConfiguration;
use crate::models::error::CaptureError;
use crate::traits::capture_platform::{CaptureDevice, CapturePlatform, DeviceParams, DeviceState};

/// Read buffer size as a multiple of the platform minimum.
pub const BUFFER_SIZE_MULTIPLIER: usize = 4;

/// An initialized device together with the buffer it is read into.
pub struct NegotiatedDevice<D> {
    pub device: D,
    pub buffer: Vec<u8>,
}

impl<D: CaptureDevice> NegotiatedDevice<D> {
    pub fn sample_rate(&self) -> u32 {
        self.device.sample_rate()
    }
}

/// Walk the candidate rates in order and keep the first device that initializes.
///
/// A rate is skipped when the platform rejects its buffer-size query, when
/// `open` fails, or when the opened device reports it is not initialized
/// (that half-built device is released first). Fails with
/// `DeviceUnavailable` once every candidate is exhausted.
pub fn negotiate<P: CapturePlatform>(
    platform: &P,
    config: &CaptureConfiguration,
) -> Result<NegotiatedDevice<P::Device>, CaptureError> {
    for &sample_rate in &config.sample_rate_candidates {
        let min_size = match platform.min_buffer_size(sample_rate, config.channel_layout, config.encoding) {
            Ok(0) => {
                log::debug!("{} Hz: platform reported a zero buffer size, skipping", sample_rate);
                continue;
            }
            Ok(size) => size,
            Err(e) => {
                log::debug!("{} Hz: {}", sample_rate, e);
                continue;
            }
        };

        let params = DeviceParams {
            audio_source: config.audio_source,
            sample_rate,
            channel_layout: config.channel_layout,
            encoding: config.encoding,
            buffer_size: min_size * BUFFER_SIZE_MULTIPLIER,
        };

        let mut device = match platform.open(&params) {
            Ok(device) => device,
            Err(e) => {
                log::debug!("{} Hz: open failed: {}", sample_rate, e);
                continue;
            }
        };

        if device.state() != DeviceState::Initialized {
            log::debug!("{} Hz: device did not initialize, releasing", sample_rate);
            device.release();
            continue;
        }

        log::info!(
            "Capture device ready at {} Hz, buffer {} bytes ({}x minimum)",
            device.sample_rate(),
            params.buffer_size,
            BUFFER_SIZE_MULTIPLIER
        );
        return Ok(NegotiatedDevice {
            device,
            buffer: vec![0u8; params.buffer_size],
        });
    }

    log::warn!(
        "No capture device could be initialized for rates {:?}",
        config.sample_rate_candidates
    );
    Err(CaptureError::DeviceUnavailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::fake::{FakePlatform, RateBehavior};

    #[test]
    fn picks_first_working_rate() {
        let platform = FakePlatform::new();
        let negotiated = negotiate(&platform, &CaptureConfiguration::default()).unwrap();

        assert_eq!(negotiated.sample_rate(), 44100);
        assert_eq!(negotiated.buffer.len(), 4 * FakePlatform::min_buffer_for(44100));
        assert_eq!(platform.opened_rates(), vec![44100]);
    }

    #[test]
    fn falls_back_past_unsupported_rate() {
        let platform = FakePlatform::new().with_rate(44100, RateBehavior::Unsupported);
        let negotiated = negotiate(&platform, &CaptureConfiguration::default()).unwrap();

        assert_eq!(negotiated.sample_rate(), 22050);
        assert_eq!(platform.opened_rates(), vec![22050]);
    }

    #[test]
    fn releases_device_that_failed_to_initialize() {
        let platform = FakePlatform::new()
            .with_rate(44100, RateBehavior::Uninitialized)
            .with_rate(22050, RateBehavior::OpenFails);
        let negotiated = negotiate(&platform, &CaptureConfiguration::default()).unwrap();

        assert_eq!(negotiated.sample_rate(), 16000);
        assert_eq!(platform.opened_rates(), vec![44100, 16000]);
        assert_eq!(platform.released_rates(), vec![44100]);
    }

    #[test]
    fn zero_buffer_size_counts_as_unsupported() {
        let platform = FakePlatform::new().with_rate(44100, RateBehavior::ZeroBuffer);
        let negotiated = negotiate(&platform, &CaptureConfiguration::default()).unwrap();
        assert_eq!(negotiated.sample_rate(), 22050);
    }

    #[test]
    fn exhausting_candidates_is_device_unavailable() {
        let platform = FakePlatform::new()
            .with_rate(44100, RateBehavior::Unsupported)
            .with_rate(22050, RateBehavior::Uninitialized)
            .with_rate(16000, RateBehavior::OpenFails)
            .with_rate(11025, RateBehavior::Unsupported);

        let result = negotiate(&platform, &CaptureConfiguration::default());

        assert!(matches!(result, Err(CaptureError::DeviceUnavailable)));
        assert_eq!(platform.released_rates(), vec![22050]);
    }

    #[test]
    fn honors_configured_candidate_order() {
        let platform = FakePlatform::new();
        let config = CaptureConfiguration {
            sample_rate_candidates: vec![16000, 44100],
            ..Default::default()
        };
        let negotiated = negotiate(&platform, &config).unwrap();
        assert_eq!(negotiated.sample_rate(), 16000);
    }
}
