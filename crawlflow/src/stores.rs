//! Stores receive finalized result records at the end of each lineage.

use crate::logging::{default_logger, Logger};
use crate::result::CrawlResult;
use parking_lot::Mutex;
use std::fmt::Debug;
use std::io::Write;

/// Receives one call per finalized result record.
pub trait Store: Send + Sync + Debug {
    /// Persists a record.
    fn store(&self, result: &CrawlResult);

    /// Sets the logger handle. The default ignores it.
    fn add_logger(&mut self, logger: Logger) {
        let _ = logger;
    }
}

/// Shared store handles work as stores; the logger stays whatever the
/// inner store was built with.
impl<S: Store> Store for std::sync::Arc<S> {
    fn store(&self, result: &CrawlResult) {
        (**self).store(result);
    }
}

/// Keeps all records in memory.
#[derive(Debug, Default)]
pub struct CollectingStore {
    records: Mutex<Vec<CrawlResult>>,
}

impl CollectingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all stored records.
    #[must_use]
    pub fn records(&self) -> Vec<CrawlResult> {
        self.records.lock().clone()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether no record was stored yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl Store for CollectingStore {
    fn store(&self, result: &CrawlResult) {
        self.records.lock().push(result.clone());
    }
}

/// Writes each record as one JSON line.
pub struct JsonLinesStore<W: Write + Send> {
    writer: Mutex<W>,
    logger: Logger,
}

impl<W: Write + Send> JsonLinesStore<W> {
    /// Wraps a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            logger: default_logger(),
        }
    }

    /// Consumes the store and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> Debug for JsonLinesStore<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JsonLinesStore")
    }
}

impl<W: Write + Send> Store for JsonLinesStore<W> {
    fn store(&self, result: &CrawlResult) {
        let line = match serde_json::to_string(result) {
            Ok(line) => line,
            Err(err) => {
                self.logger.error(&format!("failed to serialize record: {err}"));
                return;
            }
        };
        let mut writer = self.writer.lock();
        if let Err(err) = writeln!(writer, "{line}") {
            self.logger.error(&format!("failed to write record: {err}"));
        }
    }

    fn add_logger(&mut self, logger: Logger) {
        self.logger = logger;
    }
}
