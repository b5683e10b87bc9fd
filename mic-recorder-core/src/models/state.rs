use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Recorder state machine.
///
/// State transitions:
/// ```text
/// stopped → recording ↔ paused
///    ↑          ↓         ↓
///    └──────── stop ←─────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecordingState {
    #[default]
    Stopped,
    Recording,
    Paused,
}

impl RecordingState {
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused)
    }

    /// Recording or paused: a graph is live and a stop will flush.
    pub fn is_active(&self) -> bool {
        !self.is_stopped()
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Stopped => 0,
            Self::Recording => 1,
            Self::Paused => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Recording,
            2 => Self::Paused,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Recording => "recording",
            Self::Paused => "paused",
        };
        f.write_str(name)
    }
}

/// Lock-free cell holding a [`RecordingState`].
///
/// Written by the control thread, read by the real-time callback on every block.
#[derive(Debug, Default)]
pub struct AtomicRecordingState(AtomicU8);

impl AtomicRecordingState {
    pub fn new(state: RecordingState) -> Self {
        Self(AtomicU8::new(state.as_u8()))
    }

    pub fn load(&self) -> RecordingState {
        RecordingState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, state: RecordingState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }

    /// Stores `state` and returns the value it replaced.
    pub fn swap(&self, state: RecordingState) -> RecordingState {
        RecordingState::from_u8(self.0.swap(state.as_u8(), Ordering::AcqRel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_stopped() {
        assert_eq!(RecordingState::default(), RecordingState::Stopped);
        assert_eq!(AtomicRecordingState::default().load(), RecordingState::Stopped);
    }

    #[test]
    fn atomic_round_trips_every_state() {
        let cell = AtomicRecordingState::new(RecordingState::Stopped);
        for state in [RecordingState::Recording, RecordingState::Paused, RecordingState::Stopped] {
            cell.store(state);
            assert_eq!(cell.load(), state);
        }
    }

    #[test]
    fn swap_returns_previous() {
        let cell = AtomicRecordingState::new(RecordingState::Paused);
        assert_eq!(cell.swap(RecordingState::Stopped), RecordingState::Paused);
        assert_eq!(cell.load(), RecordingState::Stopped);
    }

    #[test]
    fn active_states() {
        assert!(!RecordingState::Stopped.is_active());
        assert!(RecordingState::Recording.is_active());
        assert!(RecordingState::Paused.is_active());
        assert_eq!(RecordingState::Paused.to_string(), "paused");
    }
}
