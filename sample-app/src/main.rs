mod console_delegate;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use parking_lot::Mutex;

use speech_emitter_core::storage::metadata::write_metadata;
use speech_emitter_core::{wav_sink, CaptureConfiguration, SpeechEmitter, WavFileWriter, WavSpec};
use speech_emitter_cpal::{list_input_devices, CpalPlatform};

use console_delegate::ConsoleDelegate;

/// Wait for speech on an input device and stream it to a WAV file.
#[derive(Debug, Parser)]
#[command(name = "speech-emitter-sample", version)]
struct Args {
    /// Input device name (default: host default input)
    #[arg(long)]
    device: Option<String>,

    /// JSON capture configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds to listen before stopping
    #[arg(long, default_value_t = 10)]
    seconds: u64,

    /// Output WAV path
    #[arg(long, default_value = "speech.wav")]
    output: PathBuf,

    /// List input devices and exit
    #[arg(long)]
    list_devices: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.list_devices {
        return list_devices();
    }

    let config = match &args.config {
        Some(path) => CaptureConfiguration::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => CaptureConfiguration::default(),
    };

    let platform = match &args.device {
        Some(name) => CpalPlatform::with_device(name.clone()),
        None => CpalPlatform::default_device(),
    };

    let mut emitter = SpeechEmitter::new(platform, config)?;
    let delegate = ConsoleDelegate::new();
    emitter.set_delegate(delegate.clone());

    let sample_rate = emitter.sample_rate().context("no supported capture configuration")?;
    println!("Negotiated {} Hz", sample_rate);

    let spec = WavSpec::for_capture(emitter.configuration(), sample_rate);
    let writer = Arc::new(Mutex::new(WavFileWriter::create(&args.output, spec)?));
    emitter.start(wav_sink(Arc::clone(&writer)))?;

    println!("Listening for {} s, speak to start recording...", args.seconds);
    thread::sleep(Duration::from_secs(args.seconds));

    let Some(summary) = emitter.stop() else {
        bail!("capture session ended before it was stopped");
    };
    let written = writer.lock().close()?;
    let sidecar = write_metadata(&summary, &written.path)?;

    if !delegate.speech_started() {
        println!("No speech detected.");
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);
    println!(
        "Wrote {} ({:.2} s of audio, sha256 {})",
        written.path.display(),
        summary.delivered_secs(spec.channels),
        written.checksum
    );
    println!("Metadata: {}", sidecar.display());
    Ok(())
}

fn list_devices() -> Result<()> {
    let sources = list_input_devices().context("failed to enumerate input devices")?;
    if sources.is_empty() {
        println!("No input devices found.");
    }
    for source in sources {
        let marker = if source.is_default { " (default)" } else { "" };
        println!("{}{}", source.name, marker);
    }
    Ok(())
}
