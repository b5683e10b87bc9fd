use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::graph::audio_graph::{AudioGraph, BlockOutcome, BlockSink};
use crate::models::config::RecorderConfig;
use crate::models::diagnostics::CaptureDiagnostics;
use crate::models::error::{ConfigError, FileWriteError, StartError};
use crate::models::recording_result::{RecordingMetadata, RecordingResult};
use crate::models::state::{AtomicRecordingState, RecordingState};
use crate::processing::sample_buffer::SampleBuffer;
use crate::storage::file_writer::FileWriter;
use crate::storage::metadata;
use crate::traits::log_sink::{LogCrateSink, LogSink};
use crate::traits::runtime::AudioGraphRuntime;

/// Microphone recorder: state machine and public API.
///
/// Generic over the audio backend via the `AudioGraphRuntime` trait.
/// Data flow:
/// ```text
/// [Runtime thread] → capture tap → (state == Recording?) → [SampleBuffer]
/// [Control thread] → stop() → drain → [FileWriter] → float WAV
/// ```
///
/// Callers serialize control calls; the struct is driven through `&mut self`.
/// Dropping a controller that is recording or paused stops it and flushes to disk.
pub struct RecordingController<R: AudioGraphRuntime> {
    config: RecorderConfig,
    state: Arc<AtomicRecordingState>,
    buffer: Arc<SampleBuffer>,
    graph: AudioGraph<R>,
    writer: FileWriter,
    log: Arc<dyn LogSink>,
}

impl<R: AudioGraphRuntime> RecordingController<R> {
    /// Create a recorder logging through the `log` facade.
    pub fn new(runtime: R, config: RecorderConfig) -> Result<Self, ConfigError> {
        Self::with_log_sink(runtime, config, Arc::new(LogCrateSink::default()))
    }

    pub fn with_log_sink(runtime: R, config: RecorderConfig, log: Arc<dyn LogSink>) -> Result<Self, ConfigError> {
        config.validate()?;

        let buffer = SampleBuffer::with_limit(config.reserve_samples(), config.max_samples());
        let graph = AudioGraph::new(runtime, config.output_channels, config.gain, Arc::clone(&log));
        let writer = FileWriter::new(Arc::clone(&log));

        log.info(&format!(
            "recorder created ({}, gain {}, output {})",
            config.format,
            config.gain,
            config.output_path.display()
        ));

        Ok(Self {
            config,
            state: Arc::new(AtomicRecordingState::new(RecordingState::Stopped)),
            buffer: Arc::new(buffer),
            graph,
            writer,
            log,
        })
    }

    pub fn state(&self) -> RecordingState {
        self.state.load()
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn output_path(&self) -> &Path {
        &self.config.output_path
    }

    /// Set where the next `stop()` writes. Takes effect at stop time.
    pub fn set_output_path(&mut self, path: impl Into<PathBuf>) {
        self.config.output_path = path.into();
        self.log
            .info(&format!("output path set to: {}", self.config.output_path.display()));
    }

    /// Samples captured so far in the current session.
    pub fn buffered_samples(&self) -> usize {
        self.buffer.len()
    }

    pub fn diagnostics(&self) -> CaptureDiagnostics {
        CaptureDiagnostics {
            overflowed_samples: self.buffer.overflowed_samples(),
            ..self.graph.diagnostics()
        }
    }

    /// Start a new session. Transitions: stopped → recording.
    ///
    /// Fails without changing state when already recording or paused, or when
    /// the capture graph cannot be built.
    pub fn start(&mut self) -> Result<(), StartError> {
        let current = self.state.load();
        match current {
            RecordingState::Stopped => {}
            RecordingState::Recording => {
                self.log.warn("cannot start: already recording");
                return Err(StartError::AlreadyActive(current));
            }
            RecordingState::Paused => {
                self.log.warn("cannot start: recorder is paused, resume or stop first");
                return Err(StartError::AlreadyActive(current));
            }
        }

        // The graph logs which step failed.
        self.graph.initialize(self.config.format, self.block_sink())?;

        self.state.store(RecordingState::Recording);
        self.log.info(&format!("recording started ({})", self.config.format));
        Ok(())
    }

    /// Transitions: recording → paused. Returns whether the transition happened.
    ///
    /// The graph keeps running; blocks are ignored until `resume()`.
    pub fn pause(&mut self) -> bool {
        if self.state.load() != RecordingState::Recording {
            self.log.warn("cannot pause: recorder is not recording");
            return false;
        }
        self.state.store(RecordingState::Paused);
        self.log.info("recording paused");
        true
    }

    /// Transitions: paused → recording. Returns whether the transition happened.
    pub fn resume(&mut self) -> bool {
        if self.state.load() != RecordingState::Paused {
            self.log.warn("cannot resume: recorder is not paused");
            return false;
        }
        self.state.store(RecordingState::Recording);
        self.log.info("recording resumed");
        true
    }

    /// Stop the session, tear down the graph and write captured audio.
    /// Transitions: recording/paused → stopped.
    ///
    /// Returns `Ok(None)` when already stopped or when nothing was captured.
    /// The state is stopped afterwards even if the write fails; the samples of a
    /// failed write are discarded.
    pub fn stop(&mut self) -> Result<Option<RecordingResult>, FileWriteError> {
        let previous = self.state.swap(RecordingState::Stopped);
        if previous.is_stopped() {
            self.log.warn("recorder is already stopped");
            return Ok(None);
        }

        self.graph.teardown();

        let diagnostics = self.diagnostics();
        if diagnostics.has_drops() {
            self.log.warn(&format!(
                "{} blocks dropped during capture ({} samples over buffer limit)",
                diagnostics.blocks_dropped, diagnostics.overflowed_samples
            ));
        }

        let samples = self.buffer.drain_all();
        if samples.is_empty() {
            self.log.warn("recording stopped with no audio data, nothing written");
            return Ok(None);
        }

        let format = self.config.format;
        let path = self.config.output_path.clone();
        let summary = match self.writer.write(&format, &samples, &path) {
            Ok(summary) => summary,
            Err(e) => {
                self.log.warn(&format!(
                    "recording stopped, {} samples discarded",
                    samples.len()
                ));
                return Err(e);
            }
        };

        let checksum = summary.checksum.unwrap_or_default();
        let metadata = if self.config.write_metadata {
            self.write_sidecar(&path, samples.len(), &checksum)
        } else {
            None
        };

        self.log.info(&format!("recording stopped and saved to {}", path.display()));
        Ok(Some(RecordingResult {
            file_path: path,
            format,
            sample_count: samples.len(),
            duration_secs: format.duration_secs(samples.len()),
            bytes_written: summary.bytes_written,
            checksum,
            metadata,
        }))
    }

    /// Real-time consumer: append while recording, ignore otherwise.
    fn block_sink(&self) -> BlockSink {
        let state = Arc::clone(&self.state);
        let buffer = Arc::clone(&self.buffer);
        Arc::new(move |block: &[f32]| {
            if state.load() != RecordingState::Recording {
                return BlockOutcome::Skipped;
            }
            match buffer.append(block) {
                Ok(()) => BlockOutcome::Captured,
                Err(_) => BlockOutcome::Dropped,
            }
        })
    }

    fn write_sidecar(&self, path: &Path, sample_count: usize, checksum: &str) -> Option<RecordingMetadata> {
        let meta = RecordingMetadata::new(path, self.config.format, sample_count, checksum);
        match metadata::write_metadata(&meta, path) {
            Ok(sidecar) => {
                self.log.debug(&format!("metadata written to {}", sidecar.display()));
                Some(meta)
            }
            Err(e) => {
                self.log.warn(&format!("failed to write metadata: {}", e));
                None
            }
        }
    }
}

impl<R: AudioGraphRuntime> Drop for RecordingController<R> {
    fn drop(&mut self) {
        if self.state.load().is_active() {
            self.log.info("recorder dropped while active, stopping");
            if let Err(e) = self.stop() {
                self.log.error(&format!("final flush failed: {}", e));
            }
        }
        self.log.debug("recorder destroyed");
    }
}
