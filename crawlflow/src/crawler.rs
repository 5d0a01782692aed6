//! The crawler wires steps, loader, logger and store together and drives
//! whole runs.

use crate::errors::CrawlError;
use crate::io::{Input, Output};
use crate::loader::{Loader, SharedLoader};
use crate::logging::{default_logger, Logger};
use crate::result::CrawlResult;
use crate::steps::Step;
use crate::stores::Store;
use crate::user_agent::UserAgent;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Observes every output of every step together with the index of the step
/// that produced it.
pub type OutputHook = Arc<dyn Fn(&Output, usize, &dyn Step) + Send + Sync>;

/// Drives initial inputs through an ordered chain of steps.
///
/// Each output of a step becomes an input of the next one, lazily: a
/// downstream step starts consuming before an upstream step with several
/// outputs has finished producing. Result records composed along a lineage
/// are collected once the lineage is exhausted, handed to the store, and
/// returned.
pub struct Crawler {
    user_agent: UserAgent,
    logger: Logger,
    loader: Option<SharedLoader>,
    steps: Vec<Box<dyn Step>>,
    inputs: Vec<Value>,
    store: Option<Box<dyn Store>>,
    output_hook: Option<OutputHook>,
}

impl Crawler {
    /// Creates a crawler identifying itself with the given user agent.
    #[must_use]
    pub fn new(user_agent: UserAgent) -> Self {
        Self {
            user_agent,
            logger: default_logger(),
            loader: None,
            steps: Vec::new(),
            inputs: Vec::new(),
            store: None,
            output_hook: None,
        }
    }

    /// The crawler's user agent.
    #[must_use]
    pub fn user_agent(&self) -> &UserAgent {
        &self.user_agent
    }

    /// Sets the logger and passes it on to all steps and the store.
    pub fn set_logger(&mut self, logger: Logger) {
        self.logger = logger.clone();
        for step in &mut self.steps {
            step.add_logger(logger.clone());
        }
        if let Some(store) = &mut self.store {
            store.add_logger(logger.clone());
        }
    }

    /// Attaches a loader and passes it on to all loading-capable steps,
    /// existing and future.
    pub fn add_loader(&mut self, mut loader: impl Loader + 'static) {
        loader.add_logger(self.logger.clone());
        let shared: SharedLoader = Arc::new(loader);
        for step in &mut self.steps {
            if let Some(loading) = step.as_loading() {
                loading.add_loader(shared.clone());
            }
        }
        self.loader = Some(shared);
    }

    /// Appends a step to the chain.
    pub fn add_step(&mut self, step: impl Step + 'static) {
        self.add_boxed_step(Box::new(step));
    }

    /// Appends a step with a result key.
    pub fn add_keyed_step(&mut self, key: &str, step: impl Step + 'static) {
        let mut step = Box::new(step);
        step.set_result_key(key);
        self.add_boxed_step(step);
    }

    fn add_boxed_step(&mut self, mut step: Box<dyn Step>) {
        step.add_logger(self.logger.clone());
        if let (Some(loader), Some(loading)) = (&self.loader, step.as_loading()) {
            loading.add_loader(loader.clone());
        }
        self.steps.push(step);
    }

    /// Queues one initial input for the next run.
    pub fn input(&mut self, value: impl Into<Value>) {
        self.inputs.push(value.into());
    }

    /// Queues several initial inputs for the next run.
    pub fn inputs<V: Into<Value>>(&mut self, values: impl IntoIterator<Item = V>) {
        self.inputs.extend(values.into_iter().map(Into::into));
    }

    /// Sets the store receiving finalized records.
    pub fn set_store(&mut self, mut store: impl Store + 'static) {
        store.add_logger(self.logger.clone());
        self.store = Some(Box::new(store));
    }

    /// Sets a hook observing every output of every step.
    pub fn output_hook<F>(&mut self, hook: F)
    where
        F: Fn(&Output, usize, &dyn Step) + Send + Sync + 'static,
    {
        self.output_hook = Some(Arc::new(hook));
    }

    /// Runs all queued inputs through the step chain and returns the
    /// finalized records.
    ///
    /// The input queue is consumed, per-run step state is cleared afterwards,
    /// and the first error aborts the run.
    pub fn run(&mut self) -> Result<Vec<CrawlResult>, CrawlError> {
        let run_id = Uuid::new_v4();
        let inputs = std::mem::take(&mut self.inputs);
        self.logger
            .info(&format!("run {run_id}: starting with {} input(s)", inputs.len()));

        let outcome = self.run_inputs(inputs);

        for step in &self.steps {
            step.reset_after_run();
        }

        match &outcome {
            Ok(records) => self
                .logger
                .info(&format!("run {run_id}: finished with {} record(s)", records.len())),
            Err(err) => self.logger.error(&format!("run {run_id}: aborted: {err}")),
        }

        outcome
    }

    /// Runs all queued inputs, discarding the records (side effects and the
    /// store still see them).
    pub fn run_and_traverse(&mut self) -> Result<(), CrawlError> {
        self.run().map(|_| ())
    }

    fn run_inputs(&self, inputs: Vec<Value>) -> Result<Vec<CrawlResult>, CrawlError> {
        let mut all = Vec::new();
        for value in inputs {
            let records = self.run_input(Input::new(value))?;
            if let Some(store) = &self.store {
                for record in &records {
                    store.store(record);
                }
            }
            all.extend(records);
        }
        Ok(all)
    }

    /// Drives one initial input's lineage to exhaustion and snapshots its
    /// records.
    fn run_input(&self, input: Input) -> Result<Vec<CrawlResult>, CrawlError> {
        if self.steps.is_empty() {
            return Ok(Vec::new());
        }

        let mut terminal = Vec::new();
        self.drive_step(0, &input, &mut terminal)?;

        let composes = self.steps.iter().any(|step| step.adds_to_or_creates_result());
        let records = if composes {
            // One record per distinct accumulator, in production order.
            let mut distinct = Vec::new();
            for output in &terminal {
                if let Some(result) = &output.result {
                    if !distinct.iter().any(|seen| Arc::ptr_eq(seen, result)) {
                        distinct.push(Arc::clone(result));
                    }
                }
            }
            distinct.iter().map(|result| result.lock().clone()).collect()
        } else {
            terminal
                .into_iter()
                .map(|output| CrawlResult::from_output_value(output.into_value()))
                .collect()
        };

        Ok(records)
    }

    fn drive_step(
        &self,
        index: usize,
        input: &Input,
        terminal: &mut Vec<Output>,
    ) -> Result<(), CrawlError> {
        let Some(step) = self.steps.get(index) else {
            return Ok(());
        };

        for item in step.invoke_step(input) {
            let output = item?;
            if let Some(hook) = &self.output_hook {
                hook(&output, index, step.as_ref());
            }
            if !step.cascades() {
                continue;
            }
            if index + 1 < self.steps.len() {
                self.drive_step(index + 1, &Input::from_output(&output), terminal)?;
            } else {
                terminal.push(output);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::FnStep;
    use crate::stores::CollectingStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn bot() -> UserAgent {
        UserAgent::bot("TestBot")
    }

    fn echo() -> FnStep<impl Fn(&Value) -> Result<Vec<Value>, CrawlError> + Send + Sync> {
        FnStep::new(|input: &Value| Ok(vec![input.clone()]))
    }

    #[test]
    fn test_keyed_steps_compose_one_record_per_lineage() {
        let mut crawler = Crawler::new(bot());
        crawler.add_keyed_step(
            "doubled",
            FnStep::new(|input: &Value| Ok(vec![json!(input.as_i64().unwrap_or(0) * 2)])),
        );
        crawler.add_keyed_step(
            "squared",
            FnStep::new(|input: &Value| {
                let n = input.as_i64().unwrap_or(0);
                Ok(vec![json!(n * n)])
            }),
        );
        crawler.input(json!(3));

        let records = crawler.run().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            serde_json::to_value(&records[0]).unwrap(),
            json!({"doubled": 6, "squared": 36})
        );
    }

    #[test]
    fn test_fan_out_creates_one_record_per_branch() {
        let mut crawler = Crawler::new(bot());
        crawler.add_step(FnStep::new(|input: &Value| {
            let n = input.as_i64().unwrap_or(0);
            Ok(vec![json!(n), json!(n + 1)])
        }));
        crawler.add_keyed_step("n", echo());
        crawler.input(json!(10));

        let records = crawler.run().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("n"), Some(&json!(10)));
        assert_eq!(records[1].get("n"), Some(&json!(11)));
    }

    #[test]
    fn test_plain_terminal_value_becomes_unnamed_record() {
        let mut crawler = Crawler::new(bot());
        crawler.add_step(echo());
        crawler.input(json!("just a value"));

        let records = crawler.run().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("unnamed"), Some(&json!("just a value")));
    }

    #[test]
    fn test_object_terminal_value_becomes_record_directly() {
        let mut crawler = Crawler::new(bot());
        crawler.add_step(echo());
        crawler.input(json!({"title": "lorem", "count": 2}));

        let records = crawler.run().unwrap();
        assert_eq!(
            serde_json::to_value(&records[0]).unwrap(),
            json!({"title": "lorem", "count": 2})
        );
    }

    #[test]
    fn test_input_queue_is_consumed_by_run() {
        let mut crawler = Crawler::new(bot());
        crawler.add_step(echo());
        crawler.inputs(vec![json!(1), json!(2)]);

        assert_eq!(crawler.run().unwrap().len(), 2);
        assert_eq!(crawler.run().unwrap().len(), 0);
    }

    #[test]
    fn test_dont_cascade_step_forwards_nothing_downstream() {
        let mut crawler = Crawler::new(bot());
        let mut side_step = echo();
        side_step.dont_cascade();
        crawler.add_step(side_step);
        crawler.add_keyed_step("after", echo());
        crawler.input(json!("x"));

        let records = crawler.run().unwrap();
        assert_eq!(records.len(), 0);
    }

    #[test]
    fn test_output_hook_sees_every_output_with_step_index() {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_in_hook = Arc::clone(&seen);

        let mut crawler = Crawler::new(bot());
        crawler.add_step(FnStep::new(|input: &Value| {
            Ok(vec![input.clone(), input.clone()])
        }));
        crawler.add_step(echo());
        crawler.output_hook(move |output, index, _step| {
            seen_in_hook.lock().push((index, output.value().clone()));
        });
        crawler.input(json!("v"));

        crawler.run_and_traverse().unwrap();
        let seen = seen.lock();
        // Depth-first: each first-step output flows through the second step
        // before the next one is produced.
        assert_eq!(
            *seen,
            vec![
                (0, json!("v")),
                (1, json!("v")),
                (0, json!("v")),
                (1, json!("v")),
            ]
        );
    }

    #[test]
    fn test_store_receives_each_record() {
        let store = Arc::new(CollectingStore::new());
        let mut crawler = Crawler::new(bot());
        crawler.add_keyed_step("value", echo());
        crawler.set_store(Arc::clone(&store));
        crawler.inputs(vec![json!("a"), json!("b")]);

        let records = crawler.run().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(store.records(), records);
    }

    #[test]
    fn test_error_aborts_run() {
        let mut crawler = Crawler::new(bot());
        crawler.add_step(FnStep::new(|input: &Value| {
            if input == &json!("bad") {
                Err(CrawlError::invalid_input("bad input"))
            } else {
                Ok(vec![input.clone()])
            }
        }));
        crawler.inputs(vec![json!("good"), json!("bad"), json!("never reached")]);

        assert!(matches!(crawler.run(), Err(CrawlError::InvalidInput(_))));
    }

    #[test]
    fn test_reset_after_run_clears_step_dedup_state() {
        let mut crawler = Crawler::new(bot());
        crawler.add_step(echo().with_unique_outputs());
        crawler.inputs(vec![json!("same"), json!("same")]);
        assert_eq!(crawler.run().unwrap().len(), 1);

        crawler.inputs(vec![json!("same")]);
        assert_eq!(crawler.run().unwrap().len(), 1);
    }
}
