//! Console plus rotating-file logging for the `record` binary.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use env_logger::{Env, Target};

/// Default log file, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = "logs/recorder.log";

/// Size at which the active log file is rotated.
pub const MAX_LOG_BYTES: u64 = 5 * 1024 * 1024;

/// Rotated files kept next to the active one.
pub const MAX_LOG_BACKUPS: usize = 3;

/// Route `log` records to stderr and to `log_file`, at debug level unless `RUST_LOG` says otherwise.
pub fn init(log_file: &Path) -> io::Result<()> {
    let file = RotatingFile::open(log_file, MAX_LOG_BYTES, MAX_LOG_BACKUPS)?;
    env_logger::Builder::from_env(Env::default().default_filter_or("debug"))
        .target(Target::Pipe(Box::new(ConsoleAndFile { file })))
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))
}

/// Append-only log file that rolls over to `name.1.ext`, `name.2.ext`, ...
pub struct RotatingFile {
    path: PathBuf,
    file: File,
    max_bytes: u64,
    max_backups: usize,
    written: u64,
}

impl RotatingFile {
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64, max_backups: usize) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path,
            file,
            max_bytes,
            max_backups,
            written,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `logs/recorder.log` → `logs/recorder.<index>.log`
    pub fn backup_path(&self, index: usize) -> PathBuf {
        let stem = self.path.file_stem().and_then(|s| s.to_str()).unwrap_or("log");
        let name = match self.path.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}.{}.{}", stem, index, ext),
            None => format!("{}.{}", stem, index),
        };
        self.path.with_file_name(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.max_backups > 0 {
            let _ = fs::remove_file(self.backup_path(self.max_backups));
            for index in (1..self.max_backups).rev() {
                let from = self.backup_path(index);
                if from.exists() {
                    fs::rename(&from, self.backup_path(index + 1))?;
                }
            }
            fs::rename(&self.path, self.backup_path(1))?;
        }
        self.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written.saturating_add(buf.len() as u64) > self.max_bytes {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

struct ConsoleAndFile {
    file: RotatingFile,
}

impl Write for ConsoleAndFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Console output is best effort; the file is the record.
        let _ = io::stderr().write_all(buf);
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = io::stderr().flush();
        self.file.flush()
    }
}
