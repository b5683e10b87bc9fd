use std::fmt;

use serde::{Deserialize, Serialize};

/// Bytes per sample for 32-bit float PCM.
pub const BYTES_PER_SAMPLE: u16 = 4;

/// Sample format of a capture session: interleaved 32-bit float PCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioFormatDescriptor {
    pub sample_rate: u32,
    pub channel_count: u16,
}

impl AudioFormatDescriptor {
    pub const BITS_PER_SAMPLE: u16 = 32;

    pub fn new(sample_rate: u32, channel_count: u16) -> Self {
        Self {
            sample_rate,
            channel_count,
        }
    }

    pub fn mono(sample_rate: u32) -> Self {
        Self::new(sample_rate, 1)
    }

    pub fn stereo(sample_rate: u32) -> Self {
        Self::new(sample_rate, 2)
    }

    pub fn bits_per_sample(&self) -> u16 {
        Self::BITS_PER_SAMPLE
    }

    /// `channels * 4`, or `None` if it does not fit the 16-bit header field.
    pub fn checked_block_align(&self) -> Option<u16> {
        self.channel_count.checked_mul(BYTES_PER_SAMPLE)
    }

    /// `sample_rate * channels * 4`, or `None` if it does not fit the 32-bit header field.
    pub fn checked_byte_rate(&self) -> Option<u32> {
        self.sample_rate.checked_mul(self.checked_block_align()? as u32)
    }

    /// `channels * 4`. Saturates for formats `validate()` rejects.
    pub fn block_align(&self) -> u16 {
        self.checked_block_align().unwrap_or(u16::MAX)
    }

    /// `sample_rate * channels * 4`. Saturates for formats `validate()` rejects.
    pub fn byte_rate(&self) -> u32 {
        self.checked_byte_rate().unwrap_or(u32::MAX)
    }

    /// Same rate with a different channel layout.
    pub fn with_channels(&self, channel_count: u16) -> Self {
        Self::new(self.sample_rate, channel_count)
    }

    /// Duration covered by `sample_count` interleaved samples.
    pub fn duration_secs(&self, sample_count: usize) -> f64 {
        if self.sample_rate == 0 || self.channel_count == 0 {
            return 0.0;
        }
        sample_count as f64 / (self.sample_rate as f64 * self.channel_count as f64)
    }

    /// Number of interleaved samples covering `secs` seconds.
    ///
    /// Negative and NaN durations give zero; the float cast saturates at `usize::MAX`.
    pub fn samples_for_secs(&self, secs: f64) -> usize {
        (secs * self.sample_rate as f64 * self.channel_count as f64) as usize
    }

    /// Reject formats a float WAV header cannot describe.
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.channel_count == 0 {
            return Err("channel count must be positive".into());
        }
        if self.checked_block_align().is_none() {
            return Err(format!("{} channels overflow the block align field", self.channel_count));
        }
        if self.checked_byte_rate().is_none() {
            return Err(format!(
                "{} Hz x {} ch overflows the byte rate field",
                self.sample_rate, self.channel_count
            ));
        }
        Ok(())
    }
}

impl Default for AudioFormatDescriptor {
    fn default() -> Self {
        Self::mono(44100)
    }
}

impl fmt::Display for AudioFormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {} ch, f32",
            self.sample_rate, self.channel_count
        )
    }
}
