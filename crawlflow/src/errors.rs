//! Error types for the crawlflow pipeline engine.
//!
//! The engine applies no recovery policy of its own: wrappers like
//! [`crate::steps::Loop`] and [`crate::steps::Group`] forward errors
//! unchanged, and the orchestrator (or the caller driving a step directly)
//! decides whether to skip a lineage or abort the run.

use thiserror::Error;

/// The error type for all pipeline operations.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// A step requires a named key that is absent from its input value.
    #[error("key '{key}' does not exist in input")]
    MissingKey {
        /// The required input key.
        key: String,
    },

    /// A step's sanitation hook rejected the input value's shape or type.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A filter's projection key is absent from the candidate value.
    #[error("key '{key}' to filter by does not exist in value")]
    KeyNotFound {
        /// The projection key.
        key: String,
    },

    /// A filter can only project into objects.
    #[error("can only filter by key on object values, got {actual}")]
    NotFilterable {
        /// A short description of the candidate value's type.
        actual: &'static str,
    },

    /// An ordering comparison was attempted on an incomparable type pair.
    #[error("cannot compare {left} with {right}")]
    Incomparable {
        /// Type of the left operand.
        left: &'static str,
        /// Type of the right operand.
        right: &'static str,
    },

    /// A value expected to be a URL could not be parsed as one.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// An HTTP date string could not be parsed.
    #[error("can't parse date string '{0}'")]
    InvalidDate(String),

    /// A loader failed to load a request.
    #[error("loader error: {0}")]
    Loader(String),
}

impl CrawlError {
    /// Creates a missing-input-key error.
    #[must_use]
    pub fn missing_key(key: impl Into<String>) -> Self {
        Self::MissingKey { key: key.into() }
    }

    /// Creates an invalid-input error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Creates a filter key-not-found error.
    #[must_use]
    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }

    /// Creates a loader error.
    #[must_use]
    pub fn loader(message: impl Into<String>) -> Self {
        Self::Loader(message.into())
    }
}

/// Returns a short type name for a JSON value, used in error messages.
#[must_use]
pub(crate) fn value_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
