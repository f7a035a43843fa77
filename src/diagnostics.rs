//! Diagnostics sinks injected into the sort and restore engines.
//!
//! The core never talks to a process-wide logger directly. Callers hand an
//! engine a `&dyn DiagnosticsSink`; the default forwards to `tracing`, so a
//! binary that installs a subscriber sees every event.

use std::sync::Mutex;
use tracing::Level;

/// Receives human-readable events emitted while a run progresses.
pub trait DiagnosticsSink {
    fn event(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.event(Level::DEBUG, message);
    }

    fn info(&self, message: &str) {
        self.event(Level::INFO, message);
    }

    fn warn(&self, message: &str) {
        self.event(Level::WARN, message);
    }

    fn error(&self, message: &str) {
        self.event(Level::ERROR, message);
    }
}

/// Forwards events to the `tracing` macros under the `trieur` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn event(&self, level: Level, message: &str) {
        match level {
            Level::ERROR => tracing::error!(target: "trieur", "{message}"),
            Level::WARN => tracing::warn!(target: "trieur", "{message}"),
            Level::INFO => tracing::info!(target: "trieur", "{message}"),
            Level::DEBUG => tracing::debug!(target: "trieur", "{message}"),
            _ => tracing::trace!(target: "trieur", "{message}"),
        }
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticsSink for NullSink {
    fn event(&self, _level: Level, _message: &str) {}
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events.
    pub fn events(&self) -> Vec<(Level, String)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Messages recorded at `level`.
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }
}

impl DiagnosticsSink for MemorySink {
    fn event(&self, level: Level, message: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push((level, message.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemorySink::new();
        sink.info("first");
        sink.warn("second");
        sink.info("third");

        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1], (Level::WARN, "second".to_string()));
        assert_eq!(sink.messages_at(Level::INFO), vec!["first", "third"]);
    }

    #[test]
    fn test_null_sink_accepts_events() {
        let sink = NullSink;
        sink.error("ignored");
    }
}
