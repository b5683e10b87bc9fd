use log::Level;
use parking_lot::Mutex;

/// Destination for recorder log events.
///
/// Passed to each component at construction instead of a process-wide logger.
/// Only called from the control thread, never from the real-time callback.
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }
}

/// Forwards to the `log` facade under a fixed target.
#[derive(Debug, Clone, Copy)]
pub struct LogCrateSink {
    target: &'static str,
}

impl LogCrateSink {
    pub const fn new(target: &'static str) -> Self {
        Self { target }
    }
}

impl Default for LogCrateSink {
    fn default() -> Self {
        Self::new("mic_recorder")
    }
}

impl LogSink for LogCrateSink {
    fn log(&self, level: Level, message: &str) {
        log::log!(target: self.target, level, "{}", message);
    }
}

/// Keeps every event in memory. Useful in tests.
#[derive(Debug, Default)]
pub struct CollectingLogSink {
    events: Mutex<Vec<(Level, String)>>,
}

impl CollectingLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(Level, String)> {
        self.events.lock().clone()
    }

    /// Messages logged at exactly `level`.
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl LogSink for CollectingLogSink {
    fn log(&self, level: Level, message: &str) {
        self.events.lock().push((level, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_sink_filters_by_level() {
        let sink = CollectingLogSink::new();
        sink.info("hello");
        sink.warn("careful");
        sink.warn("again");

        assert_eq!(sink.events().len(), 3);
        assert_eq!(sink.messages_at(Level::Warn), vec!["careful", "again"]);
        assert!(sink.messages_at(Level::Error).is_empty());

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn log_crate_sink_does_not_panic_without_logger() {
        LogCrateSink::default().error("no logger installed");
    }
}
