use std::sync::atomic::{AtomicU32, Ordering};

/// Gain stage shared between a control thread and a render thread.
///
/// The factor is stored as raw `f32` bits so the render side reads it without a lock.
#[derive(Debug)]
pub struct GainStage {
    bits: AtomicU32,
}

impl GainStage {
    pub fn new(gain: f32) -> Self {
        Self {
            bits: AtomicU32::new(gain.to_bits()),
        }
    }

    pub fn gain(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn set_gain(&self, gain: f32) {
        self.bits.store(gain.to_bits(), Ordering::Relaxed);
    }

    /// Scale `input` into `output`, reusing `output`'s allocation.
    pub fn process_into(&self, input: &[f32], output: &mut Vec<f32>) {
        let gain = self.gain();
        output.clear();
        output.extend(input.iter().map(|&s| s * gain));
    }
}

impl Default for GainStage {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Scale samples in place.
pub fn apply_gain(samples: &mut [f32], gain: f32) {
    if gain == 1.0 {
        return;
    }
    for sample in samples {
        *sample *= gain;
    }
}
