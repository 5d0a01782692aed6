//! Input and output envelopes carried between steps.
//!
//! An [`Input`] belongs to exactly one lineage of a crawl. Its result
//! reference, when present, is the same accumulator threaded through all
//! steps of that lineage until the record is finalized.

use crate::result::SharedResult;
use serde_json::Value;

/// The value handed to a step, plus the lineage's result accumulator.
#[derive(Debug, Clone)]
pub struct Input {
    value: Value,
    /// The in-progress result of this lineage, if any step created one.
    pub result: Option<SharedResult>,
}

impl Input {
    /// Creates an input with no result attached.
    #[must_use]
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            result: None,
        }
    }

    /// Creates an input carrying an existing result reference.
    #[must_use]
    pub fn with_result(value: impl Into<Value>, result: Option<SharedResult>) -> Self {
        Self {
            value: value.into(),
            result,
        }
    }

    /// Builds the next step's input from an output, keeping the lineage's
    /// result reference.
    #[must_use]
    pub fn from_output(output: &Output) -> Self {
        Self {
            value: output.value.clone(),
            result: output.result.clone(),
        }
    }

    /// Returns the wrapped value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consumes the input, returning the wrapped value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }
}

/// A single value produced by a step, plus the lineage's result accumulator.
///
/// The result inside an output may be the one inherited from the input,
/// mutated in place, or a freshly allocated one if this step is the first in
/// the lineage that writes to a result.
#[derive(Debug, Clone)]
pub struct Output {
    value: Value,
    /// The in-progress result of this lineage, if any step created one.
    pub result: Option<SharedResult>,
}

impl Output {
    /// Creates an output with no result attached.
    #[must_use]
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            result: None,
        }
    }

    /// Creates an output carrying a result reference.
    #[must_use]
    pub fn with_result(value: impl Into<Value>, result: Option<SharedResult>) -> Self {
        Self {
            value: value.into(),
            result,
        }
    }

    /// Returns the produced value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consumes the output, returning the produced value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::CrawlResult;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_input_wraps_value() {
        let input = Input::new(json!("https://www.example.com"));
        assert_eq!(input.value(), &json!("https://www.example.com"));
        assert!(input.result.is_none());
    }

    #[test]
    fn test_from_output_keeps_result_reference() {
        let shared = CrawlResult::new_shared();
        shared.lock().set("field", json!(1));

        let output = Output::with_result(json!("next"), Some(Arc::clone(&shared)));
        let input = Input::from_output(&output);

        assert_eq!(input.value(), &json!("next"));
        let threaded = input.result.as_ref().map(Arc::clone).unwrap();
        assert!(Arc::ptr_eq(&threaded, &shared));
    }
}
