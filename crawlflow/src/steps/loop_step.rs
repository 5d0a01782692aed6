//! A decorator that repeatedly invokes a wrapped step, feeding outputs back
//! in as inputs until the step stops producing, a stop condition fires, or
//! the iteration cap is reached.

use super::{Outputs, Step, StepConfig, Values};
use crate::errors::CrawlError;
use crate::io::{Input, Output};
use crate::loader::LoadingCapable;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::Arc;

/// Callback deriving the next iteration's input from the current input value
/// and (when the iteration produced one) an output value. Returning `None`
/// yields no candidate.
pub type InputTransformFn = Arc<dyn Fn(&Value, Option<&Value>) -> Option<Value> + Send + Sync>;

/// Predicate over (input value, output value) that ends the loop when true.
pub type StopFn = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

enum InputResolver {
    Transform(InputTransformFn),
    Step(Box<dyn Step>),
}

impl Debug for InputResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transform(_) => f.write_str("Transform"),
            Self::Step(step) => f.debug_tuple("Step").field(step).finish(),
        }
    }
}

/// Repeats a wrapped step.
///
/// By default each output of an iteration becomes the candidate input for
/// the next one (the last output wins), and looping stops after
/// [`Loop::DEFAULT_MAX_ITERATIONS`] iterations or once an iteration leaves
/// no next input.
///
/// Configuration that concerns the work itself (result keys, filters, input
/// keys, dedup) is delegated to the wrapped step; the loop only owns the
/// repetition knobs.
pub struct Loop {
    step: Box<dyn Step>,
    max_iterations: usize,
    with_input: Option<InputResolver>,
    call_with_input_only_once: bool,
    call_with_input_without_output: bool,
    stop_if: Option<StopFn>,
    cascade_when_finished: bool,
}

impl Debug for Loop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loop")
            .field("step", &self.step)
            .field("max_iterations", &self.max_iterations)
            .field("with_input", &self.with_input)
            .field("cascade_when_finished", &self.cascade_when_finished)
            .finish_non_exhaustive()
    }
}

impl Loop {
    /// The iteration cap applied when none is configured explicitly.
    pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

    /// Wraps a step in a loop.
    pub fn new(step: impl Step + 'static) -> Self {
        Self {
            step: Box::new(step),
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            with_input: None,
            call_with_input_only_once: false,
            call_with_input_without_output: false,
            stop_if: None,
            cascade_when_finished: false,
        }
    }

    /// Caps the number of iterations.
    #[must_use]
    pub fn max_iterations(mut self, count: usize) -> Self {
        self.max_iterations = count;
        self
    }

    /// Derives the next iteration's input with a callback instead of using
    /// outputs directly.
    #[must_use]
    pub fn with_input<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Value, Option<&Value>) -> Option<Value> + Send + Sync + 'static,
    {
        self.with_input = Some(InputResolver::Transform(Arc::new(callback)));
        self
    }

    /// Derives the next iteration's input by running each output through
    /// another step; that step's last output value becomes the input.
    #[must_use]
    pub fn with_input_step(mut self, step: impl Step + 'static) -> Self {
        self.with_input = Some(InputResolver::Step(Box::new(step)));
        self
    }

    /// Calls the input resolver once per iteration (with the iteration's
    /// last output) instead of once per output.
    #[must_use]
    pub fn call_with_input_only_once(mut self) -> Self {
        self.call_with_input_only_once = true;
        self
    }

    /// Keeps looping even when an iteration produced no output, calling the
    /// input resolver with no output value.
    #[must_use]
    pub fn keep_looping_without_output(mut self) -> Self {
        self.call_with_input_without_output = true;
        self
    }

    /// Stops looping as soon as the predicate is true for an output. The
    /// triggering output is not yielded.
    #[must_use]
    pub fn stop_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        self.stop_if = Some(Arc::new(predicate));
        self
    }

    /// Holds all outputs back and yields them, in order, only after looping
    /// has finished.
    #[must_use]
    pub fn cascade_when_finished(mut self) -> Self {
        self.cascade_when_finished = true;
        self
    }

    /// Resolves the candidate input for the next iteration.
    ///
    /// Without a resolver the output itself becomes the input; no output
    /// means no candidate.
    fn next_iteration_input(
        &self,
        input: &Input,
        output: Option<&Output>,
    ) -> Result<Option<Input>, CrawlError> {
        let Some(resolver) = &self.with_input else {
            return Ok(output.map(Input::from_output));
        };

        let next_value = match resolver {
            InputResolver::Transform(callback) => {
                callback(input.value(), output.map(Output::value))
            }
            InputResolver::Step(step) => match output {
                Some(output) => {
                    let mut last = None;
                    for item in step.invoke_step(&Input::from_output(output)) {
                        last = Some(item?.into_value());
                    }
                    last
                }
                None => None,
            },
        };

        Ok(next_value.map(|value| Input::with_result(value, input.result.clone())))
    }
}

impl Step for Loop {
    fn config(&self) -> &StepConfig {
        self.step.config()
    }

    fn config_mut(&mut self) -> &mut StepConfig {
        self.step.config_mut()
    }

    fn produce<'a>(&'a self, input: Value) -> Values<'a> {
        self.step.produce(input)
    }

    fn invoke_step<'a>(&'a self, input: &Input) -> Outputs<'a> {
        Box::new(LoopOutputs {
            lp: self,
            input: Some(input.clone()),
            iteration: 0,
            inner: None,
            any_output: false,
            last_output: None,
            next_input: None,
            deferred: VecDeque::new(),
            flushing: false,
            done: false,
        })
    }

    fn as_loading(&mut self) -> Option<&mut dyn LoadingCapable> {
        self.step.as_loading()
    }
}

/// Pull-driven state machine behind [`Loop::invoke_step`].
struct LoopOutputs<'a> {
    lp: &'a Loop,
    input: Option<Input>,
    iteration: usize,
    inner: Option<Outputs<'a>>,
    any_output: bool,
    last_output: Option<Output>,
    next_input: Option<Input>,
    deferred: VecDeque<Output>,
    flushing: bool,
    done: bool,
}

impl LoopOutputs<'_> {
    fn abort(&mut self, err: CrawlError) -> Option<Result<Output, CrawlError>> {
        self.done = true;
        self.inner = None;
        self.deferred.clear();
        Some(Err(err))
    }
}

impl Iterator for LoopOutputs<'_> {
    type Item = Result<Output, CrawlError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            if self.flushing {
                let item = self.deferred.pop_front().map(Ok);
                if item.is_none() {
                    self.done = true;
                }
                return item;
            }

            let Some(inner) = &mut self.inner else {
                if self.iteration >= self.lp.max_iterations || self.input.is_none() {
                    self.flushing = true;
                    continue;
                }
                self.any_output = false;
                self.last_output = None;
                self.next_input = None;
                if let Some(input) = &self.input {
                    self.inner = Some(self.lp.step.invoke_step(input));
                }
                continue;
            };

            match inner.next() {
                Some(Err(err)) => return self.abort(err),
                Some(Ok(output)) => {
                    let input = match &self.input {
                        Some(input) => input,
                        None => return self.abort(CrawlError::invalid_input("loop lost its input")),
                    };

                    if let Some(stop_if) = &self.lp.stop_if {
                        if stop_if(input.value(), output.value()) {
                            self.inner = None;
                            self.input = None;
                            self.flushing = true;
                            continue;
                        }
                    }

                    self.any_output = true;

                    if self.lp.call_with_input_only_once {
                        self.last_output = Some(output.clone());
                    } else {
                        match self.lp.next_iteration_input(input, Some(&output)) {
                            Ok(Some(next)) => self.next_input = Some(next),
                            Ok(None) => {}
                            Err(err) => return self.abort(err),
                        }
                    }

                    if !self.lp.step.cascades() {
                        continue;
                    }
                    if self.lp.cascade_when_finished {
                        self.deferred.push_back(output);
                        continue;
                    }
                    return Some(Ok(output));
                }
                None => {
                    self.inner = None;
                    self.iteration += 1;

                    let input = match self.input.take() {
                        Some(input) => input,
                        None => {
                            self.flushing = true;
                            continue;
                        }
                    };

                    if self.lp.call_with_input_only_once && self.any_output {
                        let last = self.last_output.take();
                        match self.lp.next_iteration_input(&input, last.as_ref()) {
                            Ok(next) => self.next_input = next,
                            Err(err) => return self.abort(err),
                        }
                    }

                    if self.next_input.is_none()
                        && !self.any_output
                        && self.lp.call_with_input_without_output
                    {
                        match self.lp.next_iteration_input(&input, None) {
                            Ok(next) => self.next_input = next,
                            Err(err) => return self.abort(err),
                        }
                    }

                    self.input = self.next_input.take();
                }
            }
        }
    }
}
