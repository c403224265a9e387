use std::fs::{self, File};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::models::audio_models::AudioChunk;
use crate::models::error::CaptureError;
use crate::processing::wav_format::{self, WavSpec, WAV_HEADER_SIZE};

/// Largest data chunk whose RIFF size still fits the 32-bit header field.
pub const MAX_DATA_SIZE: u64 = u32::MAX as u64 - 36;

/// A finalized WAV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenWav {
    pub path: PathBuf,
    pub spec: WavSpec,
    pub data_size: u64,
    /// SHA-256 of the complete file, lowercase hex.
    pub checksum: String,
}

/// Streaming PCM WAV writer.
///
/// ## File Format
/// ```text
/// [44-byte WAV header, sizes patched on close]
/// [raw 16-bit PCM data...]
/// ```
/// Protect with a `Mutex` to feed it from the capture thread; see [`wav_sink`].
pub struct WavFileWriter {
    path: PathBuf,
    spec: WavSpec,
    file: Option<BufWriter<File>>,
    data_size: u64,
}

impl WavFileWriter {
    /// Create the file (and missing parent directories) and write a placeholder header.
    pub fn create(path: impl Into<PathBuf>, spec: WavSpec) -> Result<Self, CaptureError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| storage_error("failed to create directory", e))?;
        }

        let file = File::create(&path).map_err(|e| storage_error("failed to create file", e))?;
        let mut file = BufWriter::new(file);
        file.write_all(&spec.header(0))
            .map_err(|e| storage_error("failed to write header", e))?;

        Ok(Self {
            path,
            spec,
            file: Some(file),
            data_size: 0,
        })
    }

    pub fn write(&mut self, pcm: &[u8]) -> Result<(), CaptureError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::StorageError("file is already closed".into()))?;
        if self.data_size + pcm.len() as u64 > MAX_DATA_SIZE {
            return Err(CaptureError::StorageError(format!(
                "WAV data would exceed {} bytes",
                MAX_DATA_SIZE
            )));
        }
        file.write_all(pcm)
            .map_err(|e| storage_error("write failed", e))?;
        self.data_size += pcm.len() as u64;
        Ok(())
    }

    /// Patch the header sizes, flush, and checksum the file.
    pub fn close(&mut self) -> Result<WrittenWav, CaptureError> {
        let file = self
            .file
            .take()
            .ok_or_else(|| CaptureError::StorageError("file is already closed".into()))?;
        let mut file = file
            .into_inner()
            .map_err(|e| storage_error("flush failed", e.into_error()))?;

        let data_size = u32::try_from(self.data_size)
            .map_err(|_| CaptureError::StorageError("WAV data size exceeds 32 bits".into()))?;
        patch_u32(&mut file, wav_format::RIFF_SIZE_OFFSET, wav_format::riff_size(data_size))?;
        patch_u32(&mut file, wav_format::DATA_SIZE_OFFSET, data_size)?;
        file.sync_all().map_err(|e| storage_error("sync failed", e))?;
        drop(file);

        let checksum = sha256_file(&self.path)?;
        log::debug!(
            "Closed {} ({} data bytes, sha256 {})",
            self.path.display(),
            self.data_size,
            checksum
        );
        Ok(WrittenWav {
            path: self.path.clone(),
            spec: self.spec,
            data_size: self.data_size,
            checksum,
        })
    }

    /// Data bytes written so far, excluding the header.
    pub fn data_size(&self) -> u64 {
        self.data_size
    }

    /// Total file size so far.
    pub fn file_size(&self) -> u64 {
        WAV_HEADER_SIZE as u64 + self.data_size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }
}

/// Subscriber that appends every delivered chunk to a shared writer.
///
/// Write failures are logged; the capture loop keeps running.
pub fn wav_sink(writer: Arc<Mutex<WavFileWriter>>) -> impl FnMut(AudioChunk<'_>) + Send + 'static {
    move |chunk: AudioChunk<'_>| {
        if let Err(e) = writer.lock().write(chunk.bytes()) {
            log::error!("Failed to write audio chunk: {}", e);
        }
    }
}

fn patch_u32(file: &mut File, offset: u64, value: u32) -> Result<(), CaptureError> {
    file.seek(SeekFrom::Start(offset))
        .and_then(|_| file.write_all(&value.to_le_bytes()))
        .map_err(|e| storage_error("failed to patch header", e))
}

fn sha256_file(path: &Path) -> Result<String, CaptureError> {
    let mut file = File::open(path).map_err(|e| storage_error("failed to open file for checksum", e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| storage_error("failed to read file for checksum", e))?;
    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect())
}

fn storage_error(context: &str, e: io::Error) -> CaptureError {
    CaptureError::StorageError(format!("{}: {}", context, e))
}
