//! The result record accumulated along a crawl lineage.
//!
//! A [`CrawlResult`] is created lazily by the first step that writes a field,
//! then threaded by reference through every later step of the same lineage
//! (see [`SharedResult`]). Insertion order of fields is preserved so
//! serialized records are deterministic.

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// A result accumulator shared across all steps of one lineage.
///
/// Execution is single-threaded and cooperative, so the mutex is never
/// contended; it exists to give the lineage a single mutable accumulator
/// behind shared ownership.
pub type SharedResult = Arc<Mutex<CrawlResult>>;

/// An ordered mapping of named fields making up one crawl result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CrawlResult {
    data: serde_json::Map<String, Value>,
}

impl CrawlResult {
    /// Creates an empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new shared accumulator for a lineage.
    #[must_use]
    pub fn new_shared() -> SharedResult {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Builds a record straight from a terminal output value.
    ///
    /// Used when no step in the chain composes a result: a JSON object's
    /// entries become the record as-is, any other value is stored under the
    /// `"unnamed"` key.
    #[must_use]
    pub fn from_output_value(value: Value) -> Self {
        match value {
            Value::Object(data) => Self { data },
            other => {
                let mut result = Self::new();
                result.set("unnamed", other);
                result
            }
        }
    }

    /// Sets a field, overwriting any existing value.
    ///
    /// An overwritten key keeps its original insertion position.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    /// Gets a field value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if no field has been set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flattens the result into a plain ordered record.
    #[must_use]
    pub fn to_map(&self) -> serde_json::Map<String, Value> {
        self.data.clone()
    }

    /// Returns the field names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }
}

impl From<CrawlResult> for Value {
    fn from(result: CrawlResult) -> Self {
        Value::Object(result.data)
    }
}
