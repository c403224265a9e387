//! cpal-backed capture device.
//!
//! cpal pushes audio from its own callback thread, while the speech emitter
//! pulls one buffer per tick with a blocking read. A bounded byte queue sits
//! in between. The `cpal::Stream` is not `Send` on every host, so it lives on
//! a dedicated stream thread and is driven through a command channel.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, StreamConfig};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};

use speech_emitter_core::{
    AudioSource, CaptureDevice, CaptureError, CapturePlatform, ChannelLayout, DeviceParams, DeviceState,
    ReadInterrupt, RingBuffer, SampleEncoding,
};

use crate::device_enumerator::{self, find_input_device, min_period_frames, select_input_config};
use crate::error::BackendError;
use crate::pcm::append_pcm16;

/// Smallest buffer reported to the negotiator, so one read spans a few ticks.
pub const MIN_BUFFER_DURATION_MS: u32 = 40;

/// Upper bound on a single blocking read.
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Queue capacity as a multiple of the read buffer.
const QUEUE_BUFFERS: usize = 4;

/// Capture platform over the cpal default host.
#[derive(Debug, Clone, Default)]
pub struct CpalPlatform {
    device_name: Option<String>,
}

impl CpalPlatform {
    /// Capture from the host's default input device.
    pub fn default_device() -> Self {
        Self::default()
    }

    /// Capture from a specific input device by name.
    pub fn with_device(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
        }
    }

    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }
}

impl CapturePlatform for CpalPlatform {
    type Device = CpalCaptureDevice;

    fn min_buffer_size(
        &self,
        sample_rate: u32,
        channel_layout: ChannelLayout,
        encoding: SampleEncoding,
    ) -> Result<usize, CaptureError> {
        let device = find_input_device(self.device_name.as_deref()).map_err(|e| {
            log::debug!("{}", e);
            CaptureError::UnsupportedConfiguration { sample_rate }
        })?;
        let config = select_input_config(&device, sample_rate)?;

        Ok(buffer_bytes(
            min_period_frames(&config),
            sample_rate,
            channel_layout,
            encoding,
        ))
    }

    fn open(&self, params: &DeviceParams) -> Result<CpalCaptureDevice, CaptureError> {
        CpalCaptureDevice::open(self.device_name.clone(), params)
    }

    fn available_sources(&self) -> Result<Vec<AudioSource>, CaptureError> {
        Ok(device_enumerator::list_input_devices()?)
    }
}

/// Bytes for the larger of the host period and `MIN_BUFFER_DURATION_MS`.
fn buffer_bytes(period_frames: u32, sample_rate: u32, channel_layout: ChannelLayout, encoding: SampleEncoding) -> usize {
    let floor = u64::from(sample_rate) * u64::from(MIN_BUFFER_DURATION_MS) / 1000;
    let frames = u64::from(period_frames).max(floor) as usize;
    frames * channel_layout.channel_count() as usize * encoding.bytes_per_sample()
}

struct QueueState {
    ring: RingBuffer<u8>,
    recording: bool,
    closed: bool,
}

/// Bytes produced by the cpal callback, waiting for the next read.
struct ByteQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl ByteQueue {
    fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                ring: RingBuffer::new(capacity),
                recording: false,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    fn push(&self, bytes: &[u8]) {
        let mut state = self.state.lock();
        if !state.recording {
            return;
        }
        state.ring.write(bytes);
        drop(state);
        self.available.notify_all();
    }

    fn set_recording(&self, recording: bool) {
        let mut state = self.state.lock();
        state.recording = recording;
        if recording {
            state.ring.reset();
        }
        drop(state);
        self.available.notify_all();
    }

    fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_all();
    }

    /// Block until `out` can be filled, recording stops, the stream closes,
    /// or `timeout` passes. Returns the bytes copied.
    fn read(&self, out: &mut [u8], timeout: Duration) -> Result<usize, CaptureError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.recording && !state.closed && state.ring.count() < out.len() {
            if self.available.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }

        let copied = state.ring.read_into(out);
        if copied == 0 && state.closed {
            return Err(CaptureError::ReadFailed("input stream closed".into()));
        }
        if copied == 0 && !state.recording {
            return Err(CaptureError::ReadFailed("device is not recording".into()));
        }
        Ok(copied)
    }

    fn dropped(&self) -> u64 {
        self.state.lock().ring.dropped()
    }
}

enum StreamCommand {
    Play(Sender<Result<(), BackendError>>),
    Pause(Sender<Result<(), BackendError>>),
}

/// Input stream opened at one negotiated rate.
pub struct CpalCaptureDevice {
    sample_rate: u32,
    state: DeviceState,
    queue: Arc<ByteQueue>,
    commands: Option<Sender<StreamCommand>>,
    stream_thread: Option<thread::JoinHandle<()>>,
}

impl CpalCaptureDevice {
    fn open(device_name: Option<String>, params: &DeviceParams) -> Result<Self, CaptureError> {
        let queue = Arc::new(ByteQueue::new(params.buffer_size.max(1) * QUEUE_BUFFERS));
        let (command_tx, command_rx) = unbounded();
        let (ready_tx, ready_rx) = bounded(1);

        let stream_thread = thread::Builder::new()
            .name("cpal-input-stream".into())
            .spawn({
                let queue = Arc::clone(&queue);
                let sample_rate = params.sample_rate;
                let out_channels = params.channel_layout.channel_count() as usize;
                move || stream_thread_main(device_name, sample_rate, out_channels, queue, ready_tx, command_rx)
            })
            .map_err(|e| CaptureError::Unknown(format!("failed to spawn stream thread: {}", e)))?;

        let state = match ready_rx.recv() {
            Ok(Ok(())) => DeviceState::Initialized,
            Ok(Err(e)) => {
                log::debug!("{} Hz: {}", params.sample_rate, e);
                DeviceState::Uninitialized
            }
            Err(_) => DeviceState::Uninitialized,
        };

        Ok(Self {
            sample_rate: params.sample_rate,
            state,
            queue,
            commands: Some(command_tx),
            stream_thread: Some(stream_thread),
        })
    }

    /// Bytes discarded because reads fell behind the stream.
    pub fn dropped_bytes(&self) -> u64 {
        self.queue.dropped()
    }

    fn send(&self, command: impl FnOnce(Sender<Result<(), BackendError>>) -> StreamCommand) -> Result<(), BackendError> {
        let commands = self.commands.as_ref().ok_or(BackendError::StreamThreadGone)?;
        let (reply_tx, reply_rx) = bounded(1);
        commands
            .send(command(reply_tx))
            .map_err(|_| BackendError::StreamThreadGone)?;
        reply_rx.recv().map_err(|_| BackendError::StreamThreadGone)?
    }
}

impl CaptureDevice for CpalCaptureDevice {
    fn state(&self) -> DeviceState {
        self.state
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        if self.state != DeviceState::Initialized {
            return Err(CaptureError::DeviceFailed("device is not initialized".into()));
        }
        self.queue.set_recording(true);
        if let Err(e) = self.send(StreamCommand::Play) {
            self.queue.set_recording(false);
            return Err(e.into());
        }
        log::debug!("Input stream playing at {} Hz", self.sample_rate);
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, CaptureError> {
        self.queue.read(buffer, READ_TIMEOUT)
    }

    fn read_interrupt(&self) -> Option<ReadInterrupt> {
        let queue = Arc::clone(&self.queue);
        Some(Arc::new(move || queue.set_recording(false)))
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.queue.set_recording(false);
        self.send(StreamCommand::Pause)?;
        let dropped = self.dropped_bytes();
        if dropped > 0 {
            log::warn!("Input stream overran the read queue; {} bytes dropped", dropped);
        }
        Ok(())
    }

    fn release(&mut self) {
        // Dropping the sender ends the stream thread, which drops the stream.
        self.commands = None;
        self.queue.close();
        if let Some(handle) = self.stream_thread.take() {
            if handle.join().is_err() {
                log::error!("Input stream thread panicked");
            }
        }
        self.state = DeviceState::Uninitialized;
    }
}

impl Drop for CpalCaptureDevice {
    fn drop(&mut self) {
        if self.stream_thread.is_some() {
            self.release();
        }
    }
}

/// Owns the `cpal::Stream` for its whole life.
fn stream_thread_main(
    device_name: Option<String>,
    sample_rate: u32,
    out_channels: usize,
    queue: Arc<ByteQueue>,
    ready: Sender<Result<(), BackendError>>,
    commands: Receiver<StreamCommand>,
) {
    let stream = match build_stream(device_name.as_deref(), sample_rate, out_channels, &queue) {
        Ok(stream) => {
            let _ = ready.send(Ok(()));
            stream
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    for command in commands.iter() {
        match command {
            StreamCommand::Play(reply) => {
                let _ = reply.send(stream.play().map_err(BackendError::from));
            }
            StreamCommand::Pause(reply) => {
                let _ = reply.send(stream.pause().map_err(BackendError::from));
            }
        }
    }
    log::debug!("Input stream at {} Hz closed", sample_rate);
}

fn build_stream(
    device_name: Option<&str>,
    sample_rate: u32,
    out_channels: usize,
    queue: &Arc<ByteQueue>,
) -> Result<cpal::Stream, BackendError> {
    let device = find_input_device(device_name)?;
    let supported = select_input_config(&device, sample_rate)?;
    let format = supported.sample_format();
    let config: StreamConfig = supported.into();

    log::debug!(
        "Opening '{}': format={:?} sample_rate={}Hz channels={}",
        device.name().unwrap_or_else(|_| "unknown input device".into()),
        format,
        config.sample_rate.0,
        config.channels
    );

    match format {
        SampleFormat::I16 => build_typed::<i16>(&device, &config, out_channels, queue),
        SampleFormat::F32 => build_typed::<f32>(&device, &config, out_channels, queue),
        SampleFormat::I32 => build_typed::<i32>(&device, &config, out_channels, queue),
        SampleFormat::U16 => build_typed::<u16>(&device, &config, out_channels, queue),
        _ => Err(BackendError::RateUnsupported(sample_rate)),
    }
}

fn build_typed<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    out_channels: usize,
    queue: &Arc<ByteQueue>,
) -> Result<cpal::Stream, BackendError>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let in_channels = config.channels as usize;
    let data_queue = Arc::clone(queue);
    let error_queue = Arc::clone(queue);
    let mut scratch = Vec::new();

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            scratch.clear();
            append_pcm16(&mut scratch, data, in_channels, out_channels);
            data_queue.push(&scratch);
        },
        move |err| {
            log::warn!("Input stream error: {}", err);
            if matches!(err, cpal::StreamError::DeviceNotAvailable) {
                error_queue.close();
            }
        },
        None,
    )?;
    Ok(stream)
}
