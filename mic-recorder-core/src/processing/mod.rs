pub mod gain;
pub mod sample_buffer;
pub mod wav_format;
