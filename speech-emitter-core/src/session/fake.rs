//! Scripted platform used by the session tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::models::config::{ChannelLayout, SampleEncoding};
use crate::models::error::CaptureError;
use crate::traits::capture_platform::{
    CaptureDevice, CapturePlatform, DeviceParams, DeviceState, ReadInterrupt,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RateBehavior {
    Works,
    Unsupported,
    ZeroBuffer,
    OpenFails,
    Uninitialized,
}

/// What one `read` call returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReadStep {
    Samples(Vec<i16>),
    Empty,
    Error,
    /// Block until interrupted, or give up empty after five seconds.
    Block,
}

impl ReadStep {
    pub(crate) fn silence(samples: usize) -> Self {
        Self::Samples(vec![3; samples])
    }

    pub(crate) fn voice(samples: usize) -> Self {
        let mut s = vec![3; samples];
        if let Some(last) = s.last_mut() {
            *last = 12000;
        }
        Self::Samples(s)
    }
}

#[derive(Default)]
struct Shared {
    behaviors: HashMap<u32, RateBehavior>,
    script: VecDeque<ReadStep>,
    opened: Vec<u32>,
    released: Vec<u32>,
    starts: u32,
    stops: u32,
    reads: u64,
    fail_start: bool,
    interrupted: bool,
}

#[derive(Clone, Default)]
pub(crate) struct FakePlatform {
    shared: Arc<Mutex<Shared>>,
}

impl FakePlatform {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn min_buffer_for(sample_rate: u32) -> usize {
        (sample_rate / 20) as usize * 2
    }

    pub(crate) fn with_rate(self, rate: u32, behavior: RateBehavior) -> Self {
        self.shared.lock().behaviors.insert(rate, behavior);
        self
    }

    pub(crate) fn with_failing_start(self) -> Self {
        self.shared.lock().fail_start = true;
        self
    }

    /// Queue reads; once the script runs out every read is empty.
    pub(crate) fn push_reads(&self, steps: impl IntoIterator<Item = ReadStep>) {
        self.shared.lock().script.extend(steps);
    }

    pub(crate) fn opened_rates(&self) -> Vec<u32> {
        self.shared.lock().opened.clone()
    }

    pub(crate) fn released_rates(&self) -> Vec<u32> {
        self.shared.lock().released.clone()
    }

    pub(crate) fn starts(&self) -> u32 {
        self.shared.lock().starts
    }

    pub(crate) fn stops(&self) -> u32 {
        self.shared.lock().stops
    }

    pub(crate) fn reads(&self) -> u64 {
        self.shared.lock().reads
    }

    pub(crate) fn script_is_empty(&self) -> bool {
        self.shared.lock().script.is_empty()
    }

    fn behavior(&self, rate: u32) -> RateBehavior {
        self.shared
            .lock()
            .behaviors
            .get(&rate)
            .copied()
            .unwrap_or(RateBehavior::Works)
    }
}

impl CapturePlatform for FakePlatform {
    type Device = FakeDevice;

    fn min_buffer_size(
        &self,
        sample_rate: u32,
        _channel_layout: ChannelLayout,
        _encoding: SampleEncoding,
    ) -> Result<usize, CaptureError> {
        match self.behavior(sample_rate) {
            RateBehavior::Unsupported => Err(CaptureError::UnsupportedConfiguration { sample_rate }),
            RateBehavior::ZeroBuffer => Ok(0),
            _ => Ok(Self::min_buffer_for(sample_rate)),
        }
    }

    fn open(&self, params: &DeviceParams) -> Result<FakeDevice, CaptureError> {
        let behavior = self.behavior(params.sample_rate);
        if behavior == RateBehavior::OpenFails {
            return Err(CaptureError::DeviceFailed("open refused".into()));
        }
        self.shared.lock().opened.push(params.sample_rate);
        Ok(FakeDevice {
            shared: Arc::clone(&self.shared),
            sample_rate: params.sample_rate,
            state: if behavior == RateBehavior::Uninitialized {
                DeviceState::Uninitialized
            } else {
                DeviceState::Initialized
            },
        })
    }
}

pub(crate) struct FakeDevice {
    shared: Arc<Mutex<Shared>>,
    sample_rate: u32,
    state: DeviceState,
}

impl CaptureDevice for FakeDevice {
    fn state(&self) -> DeviceState {
        self.state
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        let mut shared = self.shared.lock();
        if shared.fail_start {
            return Err(CaptureError::DeviceFailed("start refused".into()));
        }
        shared.starts += 1;
        shared.interrupted = false;
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, CaptureError> {
        let step = {
            let mut shared = self.shared.lock();
            shared.reads += 1;
            shared.script.pop_front()
        };
        match step {
            Some(ReadStep::Samples(samples)) => {
                let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
                let n = bytes.len().min(buffer.len());
                buffer[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Some(ReadStep::Error) => Err(CaptureError::ReadFailed("scripted".into())),
            Some(ReadStep::Block) => {
                let deadline = Instant::now() + Duration::from_secs(5);
                while Instant::now() < deadline {
                    if self.shared.lock().interrupted {
                        return Err(CaptureError::ReadFailed("interrupted".into()));
                    }
                    thread::sleep(Duration::from_millis(1));
                }
                Ok(0)
            }
            Some(ReadStep::Empty) | None => {
                // Stand in for a blocking read that found nothing.
                thread::sleep(Duration::from_millis(1));
                Ok(0)
            }
        }
    }

    fn read_interrupt(&self) -> Option<ReadInterrupt> {
        let shared = Arc::clone(&self.shared);
        Some(Arc::new(move || shared.lock().interrupted = true))
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.shared.lock().stops += 1;
        Ok(())
    }

    fn release(&mut self) {
        self.shared.lock().released.push(self.sample_rate);
    }
}

/// Poll `condition` until it holds or two seconds pass.
pub(crate) fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}
