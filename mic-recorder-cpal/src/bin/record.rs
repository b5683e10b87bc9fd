use std::path::Path;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use mic_recorder_core::{RecorderConfig, RecordingController};
use mic_recorder_cpal::{logging, CpalRuntime};

const RECORD_FOR: Duration = Duration::from_secs(5);

fn main() -> ExitCode {
    if let Err(e) = logging::init(Path::new(logging::DEFAULT_LOG_FILE)) {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
        log::warn!("cannot open {}, logging to console only: {}", logging::DEFAULT_LOG_FILE, e);
    }
    log::info!("application started");

    let mut recorder = match RecordingController::new(CpalRuntime::new(), RecorderConfig::default()) {
        Ok(recorder) => recorder,
        Err(e) => {
            log::error!("invalid recorder configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    recorder.set_output_path("output.wav");

    if let Err(e) = recorder.start() {
        log::error!("failed to start recording: {}", e);
        return ExitCode::FAILURE;
    }

    log::info!("recording for {} seconds...", RECORD_FOR.as_secs());
    thread::sleep(RECORD_FOR);

    match recorder.stop() {
        Ok(Some(result)) => {
            log::info!(
                "wrote {:.2}s ({} bytes, sha256 {}) to {}",
                result.duration_secs,
                result.bytes_written,
                result.checksum,
                result.file_path.display()
            );
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("failed to save recording: {}", e);
            ExitCode::FAILURE
        }
    }
}
