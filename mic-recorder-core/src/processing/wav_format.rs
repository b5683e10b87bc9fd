//! WAV file format utilities for 32-bit IEEE float PCM.
//!
//! Generates and parses the standard 44-byte RIFF header.

use crate::models::format::AudioFormatDescriptor;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// `WAVE_FORMAT_IEEE_FLOAT`
pub const FORMAT_IEEE_FLOAT: u16 = 3;

/// Largest data chunk whose RIFF chunk size (`36 + data`) still fits in 32 bits.
pub const MAX_DATA_SIZE: u32 = u32::MAX - 36;

/// Most f32 samples a single file can hold.
pub const MAX_SAMPLES: usize = (MAX_DATA_SIZE / 4) as usize;

/// Generate a 44-byte WAV RIFF header for float PCM.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    36 + data_size
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (format chunk size)
/// [20-21]  3 (IEEE float)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * 4
/// [32-33]  block_align = channels * 4
/// [34-35]  32
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(format: &AudioFormatDescriptor, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let chunk_size = 36 + data_size;

    let mut header = [0u8; WAV_HEADER_SIZE];

    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&FORMAT_IEEE_FLOAT.to_le_bytes());
    header[22..24].copy_from_slice(&format.channel_count.to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&format.byte_rate().to_le_bytes());
    header[32..34].copy_from_slice(&format.block_align().to_le_bytes());
    header[34..36].copy_from_slice(&format.bits_per_sample().to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Fields decoded from a 44-byte header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub chunk_size: u32,
    pub format_code: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_size: u32,
}

impl WavHeader {
    /// Parse the canonical 44-byte layout written by [`generate_wav_header`].
    pub fn parse(bytes: &[u8]) -> Result<Self, String> {
        if bytes.len() < WAV_HEADER_SIZE {
            return Err(format!("header too short: {} bytes", bytes.len()));
        }
        if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            return Err("missing RIFF/WAVE magic".into());
        }
        if &bytes[12..16] != b"fmt " || &bytes[36..40] != b"data" {
            return Err("unexpected chunk layout".into());
        }

        let u16_at = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);
        let u32_at = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);

        Ok(Self {
            chunk_size: u32_at(4),
            format_code: u16_at(20),
            channels: u16_at(22),
            sample_rate: u32_at(24),
            byte_rate: u32_at(28),
            block_align: u16_at(32),
            bits_per_sample: u16_at(34),
            data_size: u32_at(40),
        })
    }

    pub fn format(&self) -> AudioFormatDescriptor {
        AudioFormatDescriptor::new(self.sample_rate, self.channels)
    }

    pub fn sample_count(&self) -> usize {
        self.data_size as usize / 4
    }
}

/// Decode little-endian f32 samples following the header.
pub fn decode_samples(data: &[u8]) -> Vec<f32> {
    data.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_size_is_44_bytes() {
        let header = generate_wav_header(&AudioFormatDescriptor::stereo(48000), 0);
        assert_eq!(header.len(), 44);
    }

    #[test]
    fn header_riff_magic() {
        let header = generate_wav_header(&AudioFormatDescriptor::mono(44100), 0);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(&header[12..16], b"fmt ");
        assert_eq!(&header[36..40], b"data");
    }

    #[test]
    fn header_float_format() {
        let header = generate_wav_header(&AudioFormatDescriptor::mono(44100), 0);
        assert_eq!(u16::from_le_bytes([header[20], header[21]]), 3);
        assert_eq!(u32::from_le_bytes([header[16], header[17], header[18], header[19]]), 16);
        assert_eq!(u16::from_le_bytes([header[34], header[35]]), 32);
    }

    #[test]
    fn header_48khz_stereo() {
        let header = generate_wav_header(&AudioFormatDescriptor::stereo(48000), 9600);
        let parsed = WavHeader::parse(&header).unwrap();

        assert_eq!(parsed.channels, 2);
        assert_eq!(parsed.sample_rate, 48000);
        assert_eq!(parsed.byte_rate, 384_000); // 48000 * 2 * 4
        assert_eq!(parsed.block_align, 8); // 2 * 4
        assert_eq!(parsed.data_size, 9600);
        assert_eq!(parsed.chunk_size, 36 + 9600);
        assert_eq!(parsed.sample_count(), 2400);
        assert_eq!(parsed.format(), AudioFormatDescriptor::stereo(48000));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(WavHeader::parse(&[0u8; 10]).is_err());
        assert!(WavHeader::parse(&[0u8; 44]).is_err());
    }

    #[test]
    fn decode_ignores_trailing_partial_sample() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0.25f32.to_le_bytes());
        bytes.extend_from_slice(&(-1.0f32).to_le_bytes());
        bytes.push(0xFF);
        assert_eq!(decode_samples(&bytes), vec![0.25, -1.0]);
    }
}
