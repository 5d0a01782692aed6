//! A group invokes several steps with the same input.
//!
//! Outputs are either concatenated in member order (the default, lazily) or
//! combined into a single output value per group invocation.

use super::{once_err, Outputs, Step, StepConfig, StopOnError, Values};
use crate::errors::CrawlError;
use crate::io::{Input, Output};
use crate::loader::{LoadingCapable, SharedLoader};
use crate::logging::Logger;
use crate::result::CrawlResult;
use serde_json::{Map, Value};

/// Invokes several member steps with the same input.
///
/// Members added with a key get that key as their result key; when the
/// group combines its outputs, member keys also shape the combined value.
/// A logger or loader set on the group is passed on to every member,
/// including members added later.
#[derive(Debug, Default)]
pub struct Group {
    steps: Vec<Box<dyn Step>>,
    config: StepConfig,
    combine: bool,
    loader: Option<SharedLoader>,
}

impl Group {
    /// Creates an empty group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a member step.
    pub fn add_step(&mut self, step: impl Step + 'static) {
        self.add_boxed_step(Box::new(step));
    }

    /// Adds a member step with a result key.
    pub fn add_keyed_step(&mut self, key: &str, step: impl Step + 'static) {
        let mut step = Box::new(step);
        step.set_result_key(key);
        self.add_boxed_step(step);
    }

    fn add_boxed_step(&mut self, mut step: Box<dyn Step>) {
        step.add_logger(self.config.logger.clone());
        if let (Some(loader), Some(loading)) = (&self.loader, step.as_loading()) {
            loading.add_loader(loader.clone());
        }
        self.steps.push(step);
    }

    /// Builder form of [`Group::add_step`].
    #[must_use]
    pub fn step(mut self, step: impl Step + 'static) -> Self {
        self.add_step(step);
        self
    }

    /// Builder form of [`Group::add_keyed_step`].
    #[must_use]
    pub fn keyed_step(mut self, key: &str, step: impl Step + 'static) -> Self {
        self.add_keyed_step(key, step);
        self
    }

    /// Combines all member outputs of one invocation into a single output.
    ///
    /// Each cascading member contributes its output value (or the list of
    /// them, when it produced several); when every cascading member has a
    /// result key the combined value is an object keyed by those keys,
    /// otherwise a list in member order.
    #[must_use]
    pub fn combine_to_single_output(mut self) -> Self {
        self.combine = true;
        self
    }

    fn any_member_adds_result(&self) -> bool {
        self.steps.iter().any(|step| step.adds_to_or_creates_result())
    }

    /// Runs all members eagerly and builds the combined output.
    fn invoke_combined(&self, input: &Input) -> Result<Output, CrawlError> {
        // All members share one result record in combine mode.
        let input = if input.result.is_none() && self.any_member_adds_result() {
            Input::with_result(input.value().clone(), Some(CrawlResult::new_shared()))
        } else {
            input.clone()
        };

        let mut current_input = input.clone();
        let mut entries: Vec<(Option<String>, Value)> = Vec::new();

        for step in &self.steps {
            let mut values = Vec::new();
            for item in step.invoke_step(&current_input) {
                let output = item?;
                current_input = step.call_update_input_using_output(&current_input, &output);
                values.push(output.into_value());
            }

            if !step.cascades() || values.is_empty() {
                continue;
            }

            let entry = if values.len() == 1 {
                values.remove(0)
            } else {
                Value::Array(values)
            };
            entries.push((step.result_key().map(str::to_string), entry));
        }

        let all_keyed = !entries.is_empty() && entries.iter().all(|(key, _)| key.is_some());
        let combined = if all_keyed {
            let mut map = Map::new();
            for (key, entry) in &entries {
                if let Some(key) = key {
                    map.insert(key.clone(), entry.clone());
                }
            }
            Value::Object(map)
        } else {
            Value::Array(entries.iter().map(|(_, entry)| entry.clone()).collect())
        };

        // Member steps write every single output into the result; in combine
        // mode the grouped entry is what the record should hold, so write it
        // over the member's last single-value write.
        if let Some(shared) = &input.result {
            let mut result = shared.lock();
            for (key, entry) in &entries {
                if let Some(key) = key {
                    result.set(key.clone(), entry.clone());
                }
            }
        }

        Ok(self.config.wrap_output(combined, input.result))
    }
}

impl Step for Group {
    fn config(&self) -> &StepConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut StepConfig {
        &mut self.config
    }

    fn produce<'a>(&'a self, _input: Value) -> Values<'a> {
        // Groups drive their members directly in invoke_step.
        Box::new(std::iter::empty())
    }

    fn invoke_step<'a>(&'a self, input: &Input) -> Outputs<'a> {
        if self.combine {
            let combined = match self.invoke_combined(input) {
                Ok(output) => output,
                Err(err) => return once_err(err),
            };
            if !self.config.cascades {
                return Box::new(std::iter::empty());
            }
            return Box::new(std::iter::once(Ok(combined)));
        }

        Box::new(StopOnError::new(GroupOutputs {
            group: self,
            input: input.clone(),
            index: 0,
            inner: None,
        }))
    }

    fn add_logger(&mut self, logger: Logger) {
        self.config.logger = logger.clone();
        for step in &mut self.steps {
            step.add_logger(logger.clone());
        }
    }

    fn reset_after_run(&self) {
        self.config().reset_seen();
        for step in &self.steps {
            step.reset_after_run();
        }
    }

    fn as_loading(&mut self) -> Option<&mut dyn LoadingCapable> {
        Some(self)
    }
}

impl LoadingCapable for Group {
    fn add_loader(&mut self, loader: SharedLoader) {
        for step in &mut self.steps {
            if let Some(loading) = step.as_loading() {
                loading.add_loader(loader.clone());
            }
        }
        self.loader = Some(loader);
    }
}

/// Lazily concatenates member outputs in member order.
struct GroupOutputs<'a> {
    group: &'a Group,
    input: Input,
    index: usize,
    inner: Option<Outputs<'a>>,
}

impl Iterator for GroupOutputs<'_> {
    type Item = Result<Output, CrawlError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some(inner) = &mut self.inner else {
                let step = self.group.steps.get(self.index)?;
                self.inner = Some(step.invoke_step(&self.input));
                continue;
            };

            match inner.next() {
                Some(Err(err)) => return Some(Err(err)),
                Some(Ok(output)) => {
                    let step = &self.group.steps[self.index];
                    self.input = step.call_update_input_using_output(&self.input, &output);
                    if self.group.config.cascades && step.cascades() {
                        return Some(Ok(output));
                    }
                }
                None => {
                    self.inner = None;
                    self.index += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::CollectingLogSink;
    use crate::steps::{FnStep, Loop};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn yielding(
        values: Vec<Value>,
    ) -> FnStep<impl Fn(&Value) -> Result<Vec<Value>, CrawlError> + Send + Sync> {
        FnStep::new(move |_input: &Value| Ok(values.clone()))
    }

    fn collect_values(outputs: Outputs<'_>) -> Vec<Value> {
        outputs.map(|item| item.unwrap().into_value()).collect()
    }

    #[test]
    fn test_concatenates_member_outputs_in_member_order() {
        let group = Group::new()
            .step(yielding(vec![json!("1")]))
            .step(yielding(vec![json!("2")]))
            .step(yielding(vec![json!("3")]));

        let values = collect_values(group.invoke_step(&Input::new(json!("foo"))));
        assert_eq!(values, vec![json!("1"), json!("2"), json!("3")]);
    }

    #[test]
    fn test_combine_to_single_output_lists_member_values() {
        let group = Group::new()
            .step(yielding(vec![json!("lorem")]))
            .step(yielding(vec![json!("ipsum"), json!("dolor")]))
            .step(yielding(vec![json!("sit")]))
            .combine_to_single_output();

        let values = collect_values(group.invoke_step(&Input::new(json!("gogogo"))));
        assert_eq!(
            values,
            vec![json!(["lorem", ["ipsum", "dolor"], "sit"])]
        );
    }

    #[test]
    fn test_combine_with_keyed_members_builds_object_and_result() {
        let group = Group::new()
            .keyed_step("foo", yielding(vec![json!("ich")]))
            .keyed_step("bar", yielding(vec![json!("bin"), json!("ein")]))
            .keyed_step("baz", yielding(vec![json!("berliner")]))
            .combine_to_single_output();

        let outputs: Vec<Output> = group
            .invoke_step(&Input::new(json!("https://www.gogo.go")))
            .map(|item| item.unwrap())
            .collect();

        assert_eq!(outputs.len(), 1);
        assert_eq!(
            outputs[0].value(),
            &json!({"foo": "ich", "bar": ["bin", "ein"], "baz": "berliner"})
        );

        let result = outputs[0].result.as_ref().unwrap().lock().clone();
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"foo": "ich", "bar": ["bin", "ein"], "baz": "berliner"})
        );
    }

    #[test]
    fn test_group_dont_cascade_suppresses_all_outputs() {
        let mut group = Group::new()
            .keyed_step("foo", yielding(vec![json!("something")]))
            .step(yielding((1..=10).map(|i| json!(i)).collect()));

        let values = collect_values(group.invoke_step(&Input::new(json!("foo"))));
        assert_eq!(values.len(), 11);

        group.dont_cascade();
        let values = collect_values(group.invoke_step(&Input::new(json!("foo"))));
        assert_eq!(values.len(), 0);
    }

    #[test]
    fn test_member_dont_cascade_drops_only_that_members_outputs() {
        let group = Group::new()
            .keyed_step("foo", yielding(vec![json!("foo")]))
            .step(yielding(vec![json!("bar")]).without_cascading());

        let values = collect_values(group.invoke_step(&Input::new(json!("in"))));
        assert_eq!(values, vec![json!("foo")]);
    }

    #[test]
    fn test_combined_output_excludes_non_cascading_members() {
        let group = Group::new()
            .keyed_step("one", yielding(vec![json!("abc")]))
            .keyed_step("two", yielding(vec![json!("def")]).without_cascading())
            .combine_to_single_output();

        let values = collect_values(group.invoke_step(&Input::new(json!("in"))));
        assert_eq!(values, vec![json!({"one": "abc"})]);
    }

    #[test]
    fn test_update_input_using_output_rewrites_input_for_later_members() {
        let group = Group::new()
            .step(
                yielding(vec![json!("/about")]).updating_input_with(|input, output| {
                    json!(format!(
                        "{}{}",
                        input.as_str().unwrap_or(""),
                        output.as_str().unwrap_or("")
                    ))
                }),
            )
            .step(FnStep::new(|input: &Value| Ok(vec![input.clone()])));

        let values = collect_values(group.invoke_step(&Input::new(json!("https://example.com"))));
        assert_eq!(
            values,
            vec![json!("/about"), json!("https://example.com/about")]
        );
    }

    #[test]
    fn test_update_input_using_output_works_through_loops() {
        let appender = yielding(vec![json!("/next")]).updating_input_with(|input, output| {
            json!(format!(
                "{}{}",
                input.as_str().unwrap_or(""),
                output.as_str().unwrap_or("")
            ))
        });
        let group = Group::new()
            .step(Loop::new(appender).max_iterations(2))
            .step(FnStep::new(|input: &Value| Ok(vec![input.clone()])));

        let values = collect_values(group.invoke_step(&Input::new(json!("https://example.com"))));
        assert_eq!(values.len(), 3);
        assert_eq!(values[2], json!("https://example.com/next/next"));
    }

    #[test]
    fn test_add_logger_reaches_members_added_before_and_after() {
        let sink = Arc::new(CollectingLogSink::default());

        let mut group = Group::new().step(FnStep::new(|input: &Value| Ok(vec![input.clone()])));
        group.add_logger(sink.clone());
        group.add_step(
            FnStep::new(|input: &Value| Ok(vec![input.clone()])).with_unique_outputs(),
        );

        // The second member's dedup logging proves the logger reached a
        // member added after add_logger.
        let _ = collect_values(group.invoke_step(&Input::new(json!("x"))));
        let _ = collect_values(group.invoke_step(&Input::new(json!("x"))));
        assert!(!sink.messages().is_empty());
    }

    #[test]
    fn test_member_error_ends_group_output() {
        let group = Group::new()
            .step(yielding(vec![json!(1)]))
            .step(FnStep::new(|_input: &Value| {
                Err::<Vec<Value>, _>(CrawlError::invalid_input("broken"))
            }))
            .step(yielding(vec![json!(3)]));

        let mut outputs = group.invoke_step(&Input::new(json!("in")));
        assert_eq!(outputs.next().unwrap().unwrap().into_value(), json!(1));
        assert!(matches!(
            outputs.next(),
            Some(Err(CrawlError::InvalidInput(_)))
        ));
        assert!(outputs.next().is_none());
    }
}
