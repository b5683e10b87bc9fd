use std::path::PathBuf;

use super::error::ConfigError;
use super::format::AudioFormatDescriptor;
use crate::processing::wav_format::MAX_SAMPLES;

/// Upper bound on `reserve_secs`. Longer sessions grow the buffer on demand.
pub const MAX_RESERVE_SECS: f64 = 3600.0;

/// Configuration for a recorder.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderConfig {
    /// Capture format (default: 44100 Hz mono).
    pub format: AudioFormatDescriptor,

    /// Channel count of the runtime's output side (default: 2).
    ///
    /// Independent of `format.channel_count`; capture never plays back.
    pub output_channels: u16,

    /// Linear gain applied by the gain stage (default: 1.0).
    pub gain: f32,

    /// Where `stop()` writes the recording (default: `recording.wav`).
    pub output_path: PathBuf,

    /// Seconds of audio to reserve up front in the sample buffer (default: 60).
    pub reserve_secs: f64,

    /// Hard limit on buffered audio in seconds (None = unbounded).
    pub max_buffer_secs: Option<f64>,

    /// Write `<output>.metadata.json` next to each recording (default: false).
    pub write_metadata: bool,
}

impl RecorderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.format.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if self.format.channel_count == 0 {
            return Err(ConfigError::ZeroChannels);
        }
        self.format.validate().map_err(ConfigError::UnsupportedFormat)?;
        if self.output_channels == 0 {
            return Err(ConfigError::ZeroOutputChannels);
        }
        if !self.gain.is_finite() || self.gain < 0.0 {
            return Err(ConfigError::InvalidGain(self.gain));
        }
        if !self.reserve_secs.is_finite() || self.reserve_secs < 0.0 {
            return Err(ConfigError::InvalidBufferDuration(self.reserve_secs));
        }
        if self.reserve_secs > MAX_RESERVE_SECS {
            return Err(ConfigError::ReserveTooLarge(self.reserve_secs));
        }
        if let Some(max) = self.max_buffer_secs {
            if !max.is_finite() || max < 0.0 {
                return Err(ConfigError::InvalidBufferDuration(max));
            }
            if self.format.samples_for_secs(max) > MAX_SAMPLES {
                return Err(ConfigError::BufferTooLarge(max));
            }
        }
        Ok(())
    }

    /// Samples to pre-reserve, capped by the hard limit when one is set and
    /// by what a single file can hold.
    pub fn reserve_samples(&self) -> usize {
        let reserve = self.format.samples_for_secs(self.reserve_secs).min(MAX_SAMPLES);
        match self.max_samples() {
            Some(max) => reserve.min(max),
            None => reserve,
        }
    }

    pub fn max_samples(&self) -> Option<usize> {
        self.max_buffer_secs
            .map(|secs| self.format.samples_for_secs(secs))
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            format: AudioFormatDescriptor::default(),
            output_channels: 2,
            gain: 1.0,
            output_path: PathBuf::from("recording.wav"),
            reserve_secs: 60.0,
            max_buffer_secs: None,
            write_metadata: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RecorderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.format, AudioFormatDescriptor::mono(44100));
        assert_eq!(config.output_channels, 2);
        assert_eq!(config.reserve_samples(), 44100 * 60);
        assert_eq!(config.max_samples(), None);
    }

    #[test]
    fn reserve_capped_by_limit() {
        let config = RecorderConfig {
            max_buffer_secs: Some(1.0),
            ..Default::default()
        };
        assert_eq!(config.max_samples(), Some(44100));
        assert_eq!(config.reserve_samples(), 44100);
    }

    #[test]
    fn rejects_bad_values() {
        let bad_gain = RecorderConfig {
            gain: f32::NAN,
            ..Default::default()
        };
        assert!(matches!(bad_gain.validate(), Err(ConfigError::InvalidGain(_))));

        let no_output = RecorderConfig {
            output_channels: 0,
            ..Default::default()
        };
        assert_eq!(no_output.validate(), Err(ConfigError::ZeroOutputChannels));

        let bad_limit = RecorderConfig {
            max_buffer_secs: Some(-1.0),
            ..Default::default()
        };
        assert_eq!(bad_limit.validate(), Err(ConfigError::InvalidBufferDuration(-1.0)));

        let zero_rate = RecorderConfig {
            format: AudioFormatDescriptor::new(0, 1),
            ..Default::default()
        };
        assert_eq!(zero_rate.validate(), Err(ConfigError::ZeroSampleRate));
    }

    #[test]
    fn rejects_formats_the_header_cannot_hold() {
        for format in [
            AudioFormatDescriptor::new(44100, 20000),
            AudioFormatDescriptor::new(200_000_000, 8),
        ] {
            let config = RecorderConfig {
                format,
                reserve_secs: 0.0,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(ConfigError::UnsupportedFormat(_))));
        }
    }

    #[test]
    fn rejects_oversized_buffers() {
        let huge_reserve = RecorderConfig {
            reserve_secs: 1e300,
            ..Default::default()
        };
        assert_eq!(huge_reserve.validate(), Err(ConfigError::ReserveTooLarge(1e300)));

        // 44.1 kHz mono overflows a WAV data chunk after about 6.7 hours.
        let huge_limit = RecorderConfig {
            max_buffer_secs: Some(7.0 * 3600.0),
            ..Default::default()
        };
        assert_eq!(huge_limit.validate(), Err(ConfigError::BufferTooLarge(7.0 * 3600.0)));

        let hour = RecorderConfig {
            reserve_secs: MAX_RESERVE_SECS,
            max_buffer_secs: Some(6.0 * 3600.0),
            ..Default::default()
        };
        assert!(hour.validate().is_ok());
        assert_eq!(hour.reserve_samples(), 44100 * 3600);
    }
}
