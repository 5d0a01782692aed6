//! Steps are the units of work in a crawlflow pipeline.
//!
//! A step validates its input, lazily produces zero or more output values,
//! and optionally writes named fields into the lineage's result record. The
//! provided [`Step::invoke_step`] driver implements that contract once;
//! concrete steps only supply the [`Step::produce`] hook (and optionally
//! [`Step::validate_and_sanitize`]).
//!
//! Output sequences are pull-based: a value is handed downstream the moment
//! it is produced, so a later step can start consuming before an earlier
//! step with multiple outputs has finished producing.

pub mod filters;
mod group;
mod loop_step;

pub use filters::{ComparisonRule, Filter, StringRule, UrlRule};
pub use group::Group;
pub use loop_step::{InputTransformFn, Loop, StopFn};

use crate::errors::CrawlError;
use crate::io::{Input, Output};
use crate::loader::LoadingCapable;
use crate::logging::{default_logger, Logger};
use crate::result::{CrawlResult, SharedResult};
use crate::utils::fingerprint;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;

/// A lazy sequence of raw values produced by a step's `produce` hook.
pub type Values<'a> = Box<dyn Iterator<Item = Result<Value, CrawlError>> + 'a>;

/// A lazy sequence of wrapped outputs yielded by `invoke_step`.
pub type Outputs<'a> = Box<dyn Iterator<Item = Result<Output, CrawlError>> + 'a>;

/// Callback rewriting the input seen by later steps in a group, based on an
/// earlier step's own output.
pub type UpdateInputFn = Arc<dyn Fn(&Value, &Value) -> Value + Send + Sync>;

/// How output fields are merged into the result record.
#[derive(Debug, Clone, Default)]
pub enum AddToResult {
    /// Don't merge output fields.
    #[default]
    No,
    /// Copy all entries of object outputs.
    All,
    /// Copy only the listed entries, optionally renaming them.
    Selected(Vec<MergeKey>),
}

/// One entry of a selected-merge allow-list.
#[derive(Debug, Clone)]
pub struct MergeKey {
    /// The key in the output object.
    pub source: String,
    /// The key to write into the result; the source key when `None`.
    pub target: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Unique {
    #[default]
    Disabled,
    All,
    ByKey(String),
}

/// Configuration shared by every step kind.
///
/// Set once before execution and not changed during a run; the dedup
/// seen-sets are the only interior state and are cleared by
/// [`Step::reset_after_run`].
pub struct StepConfig {
    pub(crate) logger: Logger,
    pub(crate) result_key: Option<String>,
    pub(crate) add_to_result: AddToResult,
    pub(crate) use_input_key: Option<String>,
    pub(crate) cascades: bool,
    pub(crate) update_input_using_output: Option<UpdateInputFn>,
    pub(crate) filters: Vec<Filter>,
    unique_inputs: Unique,
    unique_outputs: Unique,
    seen_inputs: Mutex<HashSet<String>>,
    seen_outputs: Mutex<HashSet<String>>,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            logger: default_logger(),
            result_key: None,
            add_to_result: AddToResult::No,
            use_input_key: None,
            cascades: true,
            update_input_using_output: None,
            filters: Vec::new(),
            unique_inputs: Unique::Disabled,
            unique_outputs: Unique::Disabled,
            seen_inputs: Mutex::new(HashSet::new()),
            seen_outputs: Mutex::new(HashSet::new()),
        }
    }
}

impl Debug for StepConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepConfig")
            .field("result_key", &self.result_key)
            .field("add_to_result", &self.add_to_result)
            .field("use_input_key", &self.use_input_key)
            .field("cascades", &self.cascades)
            .field("filters", &self.filters.len())
            .finish_non_exhaustive()
    }
}

impl StepConfig {
    /// Creates a fresh config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn adds_result(&self) -> bool {
        self.result_key.is_some() || !matches!(self.add_to_result, AddToResult::No)
    }

    /// Remembers an input fingerprint; returns false for duplicates.
    fn remember_input(&self, value: &Value) -> bool {
        Self::remember(&self.unique_inputs, &self.seen_inputs, value)
    }

    /// Remembers an output fingerprint; returns false for duplicates.
    fn remember_output(&self, value: &Value) -> bool {
        Self::remember(&self.unique_outputs, &self.seen_outputs, value)
    }

    fn remember(mode: &Unique, seen: &Mutex<HashSet<String>>, value: &Value) -> bool {
        let keyed;
        let subject = match mode {
            Unique::Disabled => return true,
            Unique::All => value,
            Unique::ByKey(key) => {
                keyed = value.get(key);
                keyed.unwrap_or(value)
            }
        };

        seen.lock().insert(fingerprint(subject))
    }

    fn reset_seen(&self) {
        self.seen_inputs.lock().clear();
        self.seen_outputs.lock().clear();
    }

    fn passes_filters(&self, value: &Value) -> Result<bool, CrawlError> {
        for filter in &self.filters {
            if !filter.test(value)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Wraps a produced value in an [`Output`], applying the configured
    /// result writes. A result accumulator is created lazily on first write
    /// if none was inherited.
    pub(crate) fn wrap_output(&self, value: Value, inherited: Option<SharedResult>) -> Output {
        if !self.adds_result() {
            return Output::with_result(value, inherited);
        }

        let shared = inherited.unwrap_or_else(CrawlResult::new_shared);
        {
            let mut result = shared.lock();

            if let Some(key) = &self.result_key {
                result.set(key.clone(), value.clone());
            }

            if let Value::Object(map) = &value {
                match &self.add_to_result {
                    AddToResult::No => {}
                    AddToResult::All => {
                        for (key, entry) in map {
                            result.set(key.clone(), entry.clone());
                        }
                    }
                    AddToResult::Selected(keys) => {
                        for merge_key in keys {
                            if let Some(entry) = map.get(&merge_key.source) {
                                let target = merge_key
                                    .target
                                    .clone()
                                    .unwrap_or_else(|| merge_key.source.clone());
                                result.set(target, entry.clone());
                            }
                        }
                    }
                }
            }
        }

        Output::with_result(value, Some(shared))
    }
}

/// Trait for pipeline steps.
///
/// Most implementers hold a [`StepConfig`] and supply `produce`. Decorators
/// like [`Loop`] and compositions like [`Group`] override `invoke_step`
/// entirely.
pub trait Step: Send + Sync + Debug {
    /// Returns the step's configuration.
    fn config(&self) -> &StepConfig;

    /// Returns the step's configuration mutably.
    fn config_mut(&mut self) -> &mut StepConfig;

    /// Validates and sanitizes the effective input value.
    ///
    /// Specialized steps override this to reject values of the wrong shape
    /// with [`CrawlError::InvalidInput`].
    fn validate_and_sanitize(&self, input: Value) -> Result<Value, CrawlError> {
        Ok(input)
    }

    /// Produces the step's raw output values for one sanitized input.
    fn produce<'a>(&'a self, input: Value) -> Values<'a>;

    /// Invokes the step with an input, yielding wrapped outputs lazily.
    ///
    /// The driver extracts the effective value (honoring the required input
    /// key), drops duplicate inputs, sanitizes, produces, drops duplicate
    /// and filtered-out outputs, and applies result writes per output.
    /// Errors terminate the sequence.
    fn invoke_step<'a>(&'a self, input: &Input) -> Outputs<'a> {
        let config = self.config();

        let effective = if let Some(key) = &config.use_input_key {
            match input.value() {
                Value::Object(map) => match map.get(key) {
                    Some(value) => value.clone(),
                    None => return once_err(CrawlError::missing_key(key.clone())),
                },
                _ => return once_err(CrawlError::missing_key(key.clone())),
            }
        } else {
            input.value().clone()
        };

        if !config.remember_input(&effective) {
            config.logger.debug("skipping duplicate input");
            return Box::new(std::iter::empty());
        }

        let sanitized = match self.validate_and_sanitize(effective) {
            Ok(value) => value,
            Err(err) => return once_err(err),
        };

        let inherited = input.result.clone();
        let produced = self.produce(sanitized);

        Box::new(StopOnError::new(produced.filter_map(move |item| {
            let value = match item {
                Ok(value) => value,
                Err(err) => return Some(Err(err)),
            };

            if !config.remember_output(&value) {
                config.logger.debug("skipping duplicate output");
                return None;
            }

            match config.passes_filters(&value) {
                Ok(true) => {}
                Ok(false) => return None,
                Err(err) => return Some(Err(err)),
            }

            Some(Ok(config.wrap_output(value, inherited.clone())))
        })))
    }

    /// Returns the configured result key, if any.
    fn result_key(&self) -> Option<&str> {
        self.config().result_key.as_deref()
    }

    /// Sets the key under which each output value is written into the result.
    fn set_result_key(&mut self, key: &str) {
        self.config_mut().result_key = Some(key.to_string());
    }

    /// Merges all entries of object outputs into the result.
    fn add_all_to_result(&mut self) {
        self.config_mut().add_to_result = AddToResult::All;
    }

    /// Merges only the listed entries of object outputs into the result.
    fn add_keys_to_result(&mut self, keys: &[&str]) {
        self.config_mut().add_to_result = AddToResult::Selected(
            keys.iter()
                .map(|key| MergeKey {
                    source: (*key).to_string(),
                    target: None,
                })
                .collect(),
        );
    }

    /// Merges the listed entries, renaming each `(target, source)` pair.
    fn add_mapped_keys_to_result(&mut self, keys: &[(&str, &str)]) {
        self.config_mut().add_to_result = AddToResult::Selected(
            keys.iter()
                .map(|(target, source)| MergeKey {
                    source: (*source).to_string(),
                    target: Some((*target).to_string()),
                })
                .collect(),
        );
    }

    /// Reports whether this step will write into (or create) a result.
    fn adds_to_or_creates_result(&self) -> bool {
        self.config().adds_result()
    }

    /// Requires a named key in object inputs; the key's value becomes the
    /// effective input.
    fn use_input_key(&mut self, key: &str) {
        self.config_mut().use_input_key = Some(key.to_string());
    }

    /// Marks this step as terminal: its outputs are not forwarded.
    fn dont_cascade(&mut self) {
        self.config_mut().cascades = false;
    }

    /// Reports whether outputs should be forwarded to subsequent steps.
    fn cascades(&self) -> bool {
        self.config().cascades
    }

    /// Sets the callback rewriting the input for later steps in a group.
    fn set_update_input_using_output(&mut self, callback: UpdateInputFn) {
        self.config_mut().update_input_using_output = Some(callback);
    }

    /// Applies the input-rewrite callback, if one is set.
    fn call_update_input_using_output(&self, input: &Input, output: &Output) -> Input {
        match &self.config().update_input_using_output {
            Some(callback) => Input::with_result(
                callback(input.value(), output.value()),
                input.result.clone(),
            ),
            None => input.clone(),
        }
    }

    /// Sets the logger handle.
    fn add_logger(&mut self, logger: Logger) {
        self.config_mut().logger = logger;
    }

    /// Drops outputs that don't pass the filter (chains combine with AND).
    fn where_filter(&mut self, filter: Filter) {
        self.config_mut().filters.push(filter);
    }

    /// OR-links a filter to the most recently added one.
    fn or_where_filter(&mut self, filter: Filter) {
        let filters = &mut self.config_mut().filters;
        match filters.last_mut() {
            Some(last) => last.add_or(filter),
            None => filters.push(filter),
        }
    }

    /// Skips inputs already seen during this run.
    fn unique_inputs(&mut self) {
        self.config_mut().unique_inputs = Unique::All;
    }

    /// Skips inputs whose value at `key` was already seen during this run.
    fn unique_inputs_by_key(&mut self, key: &str) {
        self.config_mut().unique_inputs = Unique::ByKey(key.to_string());
    }

    /// Skips outputs already produced during this run.
    fn unique_outputs(&mut self) {
        self.config_mut().unique_outputs = Unique::All;
    }

    /// Skips outputs whose value at `key` was already produced during this run.
    fn unique_outputs_by_key(&mut self, key: &str) {
        self.config_mut().unique_outputs = Unique::ByKey(key.to_string());
    }

    /// Clears per-run state (dedup seen-sets).
    fn reset_after_run(&self) {
        self.config().reset_seen();
    }

    /// Returns the loading-capability interface if this step uses a loader.
    fn as_loading(&mut self) -> Option<&mut dyn LoadingCapable> {
        None
    }

    /// Builder form of [`Step::set_result_key`].
    #[must_use]
    fn with_result_key(mut self, key: &str) -> Self
    where
        Self: Sized,
    {
        self.set_result_key(key);
        self
    }

    /// Builder form of [`Step::add_all_to_result`].
    #[must_use]
    fn with_all_to_result(mut self) -> Self
    where
        Self: Sized,
    {
        self.add_all_to_result();
        self
    }

    /// Builder form of [`Step::add_keys_to_result`].
    #[must_use]
    fn with_keys_to_result(mut self, keys: &[&str]) -> Self
    where
        Self: Sized,
    {
        self.add_keys_to_result(keys);
        self
    }

    /// Builder form of [`Step::use_input_key`].
    #[must_use]
    fn with_input_key(mut self, key: &str) -> Self
    where
        Self: Sized,
    {
        self.use_input_key(key);
        self
    }

    /// Builder form of [`Step::dont_cascade`].
    #[must_use]
    fn without_cascading(mut self) -> Self
    where
        Self: Sized,
    {
        self.dont_cascade();
        self
    }

    /// Builder form of [`Step::where_filter`].
    #[must_use]
    fn with_filter(mut self, filter: Filter) -> Self
    where
        Self: Sized,
    {
        self.where_filter(filter);
        self
    }

    /// Builder form of [`Step::or_where_filter`].
    #[must_use]
    fn with_or_filter(mut self, filter: Filter) -> Self
    where
        Self: Sized,
    {
        self.or_where_filter(filter);
        self
    }

    /// Builder form of [`Step::set_update_input_using_output`].
    #[must_use]
    fn updating_input_with<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Value, &Value) -> Value + Send + Sync + 'static,
        Self: Sized,
    {
        self.set_update_input_using_output(Arc::new(callback));
        self
    }

    /// Builder form of [`Step::unique_outputs`].
    #[must_use]
    fn with_unique_outputs(mut self) -> Self
    where
        Self: Sized,
    {
        self.unique_outputs();
        self
    }
}

/// Returns a sequence containing a single error.
pub(crate) fn once_err<'a>(err: CrawlError) -> Outputs<'a> {
    Box::new(std::iter::once(Err(err)))
}

/// An adapter that ends a sequence after the first error it yields.
pub(crate) struct StopOnError<I> {
    inner: I,
    errored: bool,
}

impl<I> StopOnError<I> {
    pub(crate) fn new(inner: I) -> Self {
        Self {
            inner,
            errored: false,
        }
    }
}

impl<I, T> Iterator for StopOnError<I>
where
    I: Iterator<Item = Result<T, CrawlError>>,
{
    type Item = Result<T, CrawlError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.errored {
            return None;
        }
        let item = self.inner.next();
        if matches!(item, Some(Err(_))) {
            self.errored = true;
        }
        item
    }
}

/// A simple closure-backed step.
///
/// The closure receives the sanitized input value and returns the full list
/// of raw outputs for that input.
pub struct FnStep<F>
where
    F: Fn(&Value) -> Result<Vec<Value>, CrawlError> + Send + Sync,
{
    config: StepConfig,
    func: F,
}

impl<F> FnStep<F>
where
    F: Fn(&Value) -> Result<Vec<Value>, CrawlError> + Send + Sync,
{
    /// Creates a new closure-backed step.
    pub fn new(func: F) -> Self {
        Self {
            config: StepConfig::new(),
            func,
        }
    }
}

impl<F> Debug for FnStep<F>
where
    F: Fn(&Value) -> Result<Vec<Value>, CrawlError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStep").field("config", &self.config).finish()
    }
}

impl<F> Step for FnStep<F>
where
    F: Fn(&Value) -> Result<Vec<Value>, CrawlError> + Send + Sync,
{
    fn config(&self) -> &StepConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut StepConfig {
        &mut self.config
    }

    fn produce<'a>(&'a self, input: Value) -> Values<'a> {
        match (self.func)(&input) {
            Ok(values) => Box::new(values.into_iter().map(Ok)),
            Err(err) => Box::new(std::iter::once(Err(err))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn collect(outputs: Outputs<'_>) -> Vec<Output> {
        outputs.map(|item| item.unwrap()).collect()
    }

    fn echo_step() -> FnStep<impl Fn(&Value) -> Result<Vec<Value>, CrawlError> + Send + Sync> {
        FnStep::new(|input: &Value| Ok(vec![input.clone()]))
    }

    #[test]
    fn test_outputs_carry_no_result_without_result_config() {
        let step = echo_step();
        let outputs = collect(step.invoke_step(&Input::new(json!("foo"))));

        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].value(), &json!("foo"));
        assert!(outputs[0].result.is_none());
    }

    #[test]
    fn test_result_key_writes_into_lazily_created_result() {
        let step = echo_step().with_result_key("field");
        let outputs = collect(step.invoke_step(&Input::new(json!("bar"))));

        let result = outputs[0].result.as_ref().unwrap().lock().clone();
        assert_eq!(result.get("field"), Some(&json!("bar")));
    }

    #[test]
    fn test_inherited_result_is_extended_in_place() {
        let shared = crate::result::CrawlResult::new_shared();
        shared.lock().set("earlier", json!(1));

        let step = echo_step().with_result_key("later");
        let input = Input::with_result(json!(2), Some(Arc::clone(&shared)));
        let outputs = collect(step.invoke_step(&input));

        assert!(Arc::ptr_eq(outputs[0].result.as_ref().unwrap(), &shared));
        let result = shared.lock().clone();
        assert_eq!(result.get("earlier"), Some(&json!(1)));
        assert_eq!(result.get("later"), Some(&json!(2)));
    }

    #[test]
    fn test_add_all_to_result_copies_object_entries() {
        let step = echo_step().with_all_to_result();
        let outputs = collect(step.invoke_step(&Input::new(json!({"a": 1, "b": 2}))));

        let result = outputs[0].result.as_ref().unwrap().lock().clone();
        assert_eq!(result.get("a"), Some(&json!(1)));
        assert_eq!(result.get("b"), Some(&json!(2)));
    }

    #[test]
    fn test_add_selected_keys_to_result() {
        let step = echo_step().with_keys_to_result(&["b"]);
        let outputs = collect(step.invoke_step(&Input::new(json!({"a": 1, "b": 2}))));

        let result = outputs[0].result.as_ref().unwrap().lock().clone();
        assert_eq!(result.get("b"), Some(&json!(2)));
        assert_eq!(result.get("a"), None);
    }

    #[test]
    fn test_add_mapped_keys_renames_on_merge() {
        let mut step = echo_step();
        step.add_mapped_keys_to_result(&[("renamed", "b")]);
        let outputs = collect(step.invoke_step(&Input::new(json!({"a": 1, "b": 2}))));

        let result = outputs[0].result.as_ref().unwrap().lock().clone();
        assert_eq!(result.get("renamed"), Some(&json!(2)));
        assert_eq!(result.get("b"), None);
    }

    #[test]
    fn test_use_input_key_extracts_effective_value() {
        let step = echo_step().with_input_key("url");
        let input = Input::new(json!({"url": "https://www.example.com", "depth": 2}));
        let outputs = collect(step.invoke_step(&input));

        assert_eq!(outputs[0].value(), &json!("https://www.example.com"));
    }

    #[test]
    fn test_missing_input_key_fails() {
        let step = echo_step().with_input_key("url");

        let mut outputs = step.invoke_step(&Input::new(json!({"other": 1})));
        assert!(matches!(
            outputs.next(),
            Some(Err(CrawlError::MissingKey { .. }))
        ));
        assert!(outputs.next().is_none());

        let mut outputs = step.invoke_step(&Input::new(json!("not an object")));
        assert!(matches!(
            outputs.next(),
            Some(Err(CrawlError::MissingKey { .. }))
        ));
    }

    #[test]
    fn test_invalid_input_propagates_and_ends_sequence() {
        #[derive(Debug, Default)]
        struct NumbersOnly {
            config: StepConfig,
        }

        impl Step for NumbersOnly {
            fn config(&self) -> &StepConfig {
                &self.config
            }

            fn config_mut(&mut self) -> &mut StepConfig {
                &mut self.config
            }

            fn validate_and_sanitize(&self, input: Value) -> Result<Value, CrawlError> {
                if input.is_number() {
                    Ok(input)
                } else {
                    Err(CrawlError::invalid_input("expected a number"))
                }
            }

            fn produce<'a>(&'a self, input: Value) -> Values<'a> {
                Box::new(std::iter::once(Ok(input)))
            }
        }

        let step = NumbersOnly::default();
        let mut outputs = step.invoke_step(&Input::new(json!("nope")));
        assert!(matches!(
            outputs.next(),
            Some(Err(CrawlError::InvalidInput(_)))
        ));
        assert!(outputs.next().is_none());
    }

    #[test]
    fn test_filters_drop_non_matching_outputs() {
        let step = FnStep::new(|input: &Value| {
            let n = input.as_i64().unwrap_or(0);
            Ok((1..=n).map(|i| json!(i)).collect())
        })
        .with_filter(Filter::greater_than(json!(3)))
        .with_or_filter(Filter::equal(json!(1)));

        let outputs = collect(step.invoke_step(&Input::new(json!(5))));
        let values: Vec<&Value> = outputs.iter().map(Output::value).collect();
        assert_eq!(values, vec![&json!(1), &json!(4), &json!(5)]);
    }

    #[test]
    fn test_unique_outputs_skips_duplicates_until_reset() {
        let step = echo_step().with_unique_outputs();

        let first = collect(step.invoke_step(&Input::new(json!("one"))));
        assert_eq!(first.len(), 1);
        let second = collect(step.invoke_step(&Input::new(json!("one"))));
        assert_eq!(second.len(), 0);

        step.reset_after_run();
        let third = collect(step.invoke_step(&Input::new(json!("one"))));
        assert_eq!(third.len(), 1);
    }

    #[test]
    fn test_unique_inputs_by_key() {
        let mut step = echo_step();
        step.unique_inputs_by_key("id");

        let first = collect(step.invoke_step(&Input::new(json!({"id": 1, "x": "a"}))));
        assert_eq!(first.len(), 1);
        // Same id, different payload: still a duplicate.
        let second = collect(step.invoke_step(&Input::new(json!({"id": 1, "x": "b"}))));
        assert_eq!(second.len(), 0);
        let third = collect(step.invoke_step(&Input::new(json!({"id": 2, "x": "a"}))));
        assert_eq!(third.len(), 1);
    }

    #[test]
    fn test_invocation_is_idempotent_without_dedup() {
        let step = FnStep::new(|input: &Value| {
            Ok(vec![json!(format!("{}-1", input.as_str().unwrap_or(""))), json!("fixed")])
        });

        let first: Vec<Value> = collect(step.invoke_step(&Input::new(json!("in"))))
            .into_iter()
            .map(Output::into_value)
            .collect();
        let second: Vec<Value> = collect(step.invoke_step(&Input::new(json!("in"))))
            .into_iter()
            .map(Output::into_value)
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_update_input_using_output_callback() {
        let step = echo_step().updating_input_with(|input, output| {
            json!(format!(
                "{}{}",
                input.as_str().unwrap_or(""),
                output.as_str().unwrap_or("")
            ))
        });

        let updated = step.call_update_input_using_output(
            &Input::new(json!("Boo")),
            &Output::new(json!(" Yah!")),
        );
        assert_eq!(updated.value(), &json!("Boo Yah!"));
    }

    #[test]
    fn test_outputs_stream_lazily() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        static PRODUCED: AtomicUsize = AtomicUsize::new(0);

        #[derive(Debug, Default)]
        struct Counting {
            config: StepConfig,
        }

        impl Step for Counting {
            fn config(&self) -> &StepConfig {
                &self.config
            }

            fn config_mut(&mut self) -> &mut StepConfig {
                &mut self.config
            }

            fn produce<'a>(&'a self, _input: Value) -> Values<'a> {
                Box::new((0..10).map(|i| {
                    PRODUCED.fetch_add(1, Ordering::SeqCst);
                    Ok(json!(i))
                }))
            }
        }

        let step = Counting::default();
        let mut outputs = step.invoke_step(&Input::new(json!(null)));
        assert_eq!(PRODUCED.load(Ordering::SeqCst), 0);
        let _ = outputs.next();
        assert_eq!(PRODUCED.load(Ordering::SeqCst), 1);
        let _ = outputs.next();
        assert_eq!(PRODUCED.load(Ordering::SeqCst), 2);
    }
}
