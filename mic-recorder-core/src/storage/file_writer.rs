use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::models::error::FileWriteError;
use crate::models::format::AudioFormatDescriptor;
use crate::processing::wav_format::{self, MAX_DATA_SIZE, WAV_HEADER_SIZE};
use crate::traits::log_sink::LogSink;

/// Samples encoded per write call.
const ENCODE_CHUNK: usize = 1024;

/// Outcome of a [`FileWriter::write`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub path: PathBuf,
    /// Header plus sample bytes. Zero when there was nothing to write.
    pub bytes_written: u64,
    pub sample_count: usize,
    /// SHA-256 hex digest of the file contents. `None` when nothing was written.
    pub checksum: Option<String>,
}

/// Writes captured samples as a float WAV file.
///
/// ## File Format
/// ```text
/// [44-byte WAV header, format code 3]
/// [interleaved little-endian f32 samples...]
/// ```
pub struct FileWriter {
    log: Arc<dyn LogSink>,
}

impl FileWriter {
    pub fn new(log: Arc<dyn LogSink>) -> Self {
        Self { log }
    }

    /// Write `samples` to `target`, replacing any existing file.
    ///
    /// An empty `samples` slice is a successful no-op and leaves the file system untouched.
    /// Missing parent directories are created. On failure the partial file is removed.
    pub fn write(
        &self,
        format: &AudioFormatDescriptor,
        samples: &[f32],
        target: &Path,
    ) -> Result<WriteSummary, FileWriteError> {
        self.write_with(format, samples, target, BufWriter::new)
    }

    /// `write`, with the created file wrapped by `wrap` before encoding.
    fn write_with<W, F>(
        &self,
        format: &AudioFormatDescriptor,
        samples: &[f32],
        target: &Path,
        wrap: F,
    ) -> Result<WriteSummary, FileWriteError>
    where
        W: CommitWrite,
        F: FnOnce(File) -> W,
    {
        if samples.is_empty() {
            self.log
                .debug(&format!("no samples to write, leaving {} untouched", target.display()));
            return Ok(WriteSummary {
                path: target.to_path_buf(),
                bytes_written: 0,
                sample_count: 0,
                checksum: None,
            });
        }

        let data_size = data_size_for(samples.len())?;
        let expected = WAV_HEADER_SIZE as u64 + data_size as u64;

        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| not_writable(target, &e))?;
        }
        let file = File::create(target).map_err(|e| not_writable(target, &e))?;

        match encode(wrap(file), format, samples, data_size, target, expected) {
            Ok(checksum) => {
                self.log.info(&format!(
                    "saved {} samples ({}) to {}",
                    samples.len(),
                    format,
                    target.display()
                ));
                Ok(WriteSummary {
                    path: target.to_path_buf(),
                    bytes_written: expected,
                    sample_count: samples.len(),
                    checksum: Some(checksum),
                })
            }
            Err(e) => {
                self.log.error(&format!("failed to write recording: {}", e));
                let _ = fs::remove_file(target);
                Err(e)
            }
        }
    }
}

/// A sink that can be made durable once encoding finishes.
trait CommitWrite: Write {
    /// Flush everything to storage and report the stored length.
    fn commit(self) -> io::Result<u64>;
}

impl CommitWrite for BufWriter<File> {
    fn commit(self) -> io::Result<u64> {
        let file = self.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(file.metadata()?.len())
    }
}

/// Stream header and samples into `out`, hashing exactly what it accepted.
///
/// Any mismatch between accepted, stored and expected byte counts is a short write.
fn encode<W: CommitWrite>(
    out: W,
    format: &AudioFormatDescriptor,
    samples: &[f32],
    data_size: u32,
    target: &Path,
    expected: u64,
) -> Result<String, FileWriteError> {
    let mut writer = HashingWriter::new(out);
    let short = |actual: u64| FileWriteError::ShortWrite {
        path: target.to_path_buf(),
        expected,
        actual,
    };

    if write_stream(&mut writer, format, samples, data_size).is_err() {
        return Err(short(writer.count));
    }

    let HashingWriter {
        inner,
        hasher,
        count,
    } = writer;
    let stored = inner.commit().map_err(|_| short(count))?;
    if count != expected || stored != expected {
        return Err(short(stored.min(count)));
    }

    Ok(hex_encode(&hasher.finalize()))
}

fn write_stream<W: Write>(
    out: &mut W,
    format: &AudioFormatDescriptor,
    samples: &[f32],
    data_size: u32,
) -> io::Result<()> {
    out.write_all(&wav_format::generate_wav_header(format, data_size))?;

    let mut bytes = [0u8; ENCODE_CHUNK * 4];
    for chunk in samples.chunks(ENCODE_CHUNK) {
        for (slot, sample) in bytes.chunks_exact_mut(4).zip(chunk) {
            slot.copy_from_slice(&sample.to_le_bytes());
        }
        out.write_all(&bytes[..chunk.len() * 4])?;
    }
    Ok(())
}

fn data_size_for(sample_count: usize) -> Result<u32, FileWriteError> {
    let bytes = sample_count as u64 * 4;
    if bytes > MAX_DATA_SIZE as u64 {
        return Err(FileWriteError::TooLarge(bytes));
    }
    Ok(bytes as u32)
}

fn not_writable(path: &Path, err: &io::Error) -> FileWriteError {
    FileWriteError::NotWritable {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

/// Counts and hashes exactly the bytes the inner writer accepted.
struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
    count: u64,
}

impl<W: Write> HashingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            count: 0,
        }
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
