//! Log sink trait and implementations.
//!
//! Every step, group, loop and store receives a [`Logger`] handle through
//! `add_logger`, so nested compositions log through the same sink. The
//! default sink forwards to the `tracing` framework.

use std::fmt::Debug;
use std::sync::Arc;

pub use tracing::Level;

/// A shared handle to a log sink.
pub type Logger = Arc<dyn LogSink>;

/// Trait for sinks that receive leveled log messages.
pub trait LogSink: Send + Sync + Debug {
    /// Writes a message at the given level.
    fn log(&self, level: Level, message: &str);

    /// Writes a debug-level message.
    fn debug(&self, message: &str) {
        self.log(Level::DEBUG, message);
    }

    /// Writes an info-level message.
    fn info(&self, message: &str) {
        self.log(Level::INFO, message);
    }

    /// Writes a warn-level message.
    fn warn(&self, message: &str) {
        self.log(Level::WARN, message);
    }

    /// Writes an error-level message.
    fn error(&self, message: &str) {
        self.log(Level::ERROR, message);
    }
}

/// A sink that forwards messages to the `tracing` framework.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::TRACE => tracing::trace!("{message}"),
            Level::DEBUG => tracing::debug!("{message}"),
            Level::INFO => tracing::info!("{message}"),
            Level::WARN => tracing::warn!("{message}"),
            Level::ERROR => tracing::error!("{message}"),
        }
    }
}

/// A no-op sink that discards all messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogSink;

impl LogSink for NoOpLogSink {
    fn log(&self, _level: Level, _message: &str) {
        // Intentionally empty - discards all messages
    }
}

/// A collecting sink for testing purposes.
///
/// Records every message in order, which makes call-ordering properties of
/// the lazy cascade observable in tests.
#[derive(Debug, Default)]
pub struct CollectingLogSink {
    messages: parking_lot::RwLock<Vec<(Level, String)>>,
}

impl CollectingLogSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected messages.
    #[must_use]
    pub fn messages(&self) -> Vec<(Level, String)> {
        self.messages.read().clone()
    }

    /// Returns just the message texts, in order.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.messages.read().iter().map(|(_, m)| m.clone()).collect()
    }

    /// Returns the number of collected messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    /// Returns true if no messages have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }

    /// Clears all collected messages.
    pub fn clear(&self) {
        self.messages.write().clear();
    }
}

impl LogSink for CollectingLogSink {
    fn log(&self, level: Level, message: &str) {
        self.messages.write().push((level, message.to_string()));
    }
}

/// Returns the default logger handle.
#[must_use]
pub fn default_logger() -> Logger {
    Arc::new(TracingLogSink)
}
