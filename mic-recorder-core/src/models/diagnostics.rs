/// Counters for debugging a capture session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureDiagnostics {
    /// Blocks delivered by the runtime to the capture tap.
    pub blocks_received: u64,
    /// Blocks appended to the sample buffer.
    pub blocks_captured: u64,
    /// Blocks ignored because the recorder was not recording.
    pub blocks_skipped: u64,
    /// Blocks discarded because of a fault or buffer overflow.
    pub blocks_dropped: u64,
    pub samples_captured: u64,
    pub overflowed_samples: u64,
}

impl CaptureDiagnostics {
    pub fn has_drops(&self) -> bool {
        self.blocks_dropped > 0
    }
}
