//! The loading seam: steps that fetch resources do so through a [`Loader`].
//!
//! The engine itself never performs I/O. A loader is attached to the crawler
//! and handed to every step that declares the capability via
//! [`crate::steps::Step::as_loading`].

use crate::errors::CrawlError;
use crate::logging::Logger;
use crate::steps::{Step, StepConfig, Values};
use serde_json::{json, Value};
use std::fmt::Debug;
use std::sync::Arc;
use url::Url;

/// A request handed to a loader.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// The resource to load.
    pub url: Url,
    /// Request headers as name/value pairs.
    pub headers: Vec<(String, String)>,
}

impl LoadRequest {
    /// Creates a request without headers.
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            url,
            headers: Vec::new(),
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A response returned by a loader.
#[derive(Debug, Clone)]
pub struct LoadResponse {
    /// HTTP-style status code.
    pub status: u16,
    /// Response headers as name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: String,
}

impl LoadResponse {
    /// Creates a response without headers.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns the first header with the given name, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether the status code is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Loads resources on behalf of steps.
pub trait Loader: Send + Sync + Debug {
    /// Loads the requested resource.
    fn load(&self, request: &LoadRequest) -> Result<LoadResponse, CrawlError>;

    /// Sets the logger handle. The default ignores it.
    fn add_logger(&mut self, logger: Logger) {
        let _ = logger;
    }
}

/// A shared handle to a loader, passed to every loading-capable step.
pub type SharedLoader = Arc<dyn Loader>;

/// Implemented by steps that need a loader.
pub trait LoadingCapable {
    /// Attaches the loader. Called when the step is added to a crawler or
    /// group that already has one, and again when a new loader is set.
    fn add_loader(&mut self, loader: SharedLoader);
}

/// A closure-backed loader, mainly for tests and canned responses.
pub struct FnLoader<F>
where
    F: Fn(&LoadRequest) -> Result<LoadResponse, CrawlError> + Send + Sync,
{
    func: F,
}

impl<F> FnLoader<F>
where
    F: Fn(&LoadRequest) -> Result<LoadResponse, CrawlError> + Send + Sync,
{
    /// Creates a loader from a closure.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Debug for FnLoader<F>
where
    F: Fn(&LoadRequest) -> Result<LoadResponse, CrawlError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnLoader")
    }
}

impl<F> Loader for FnLoader<F>
where
    F: Fn(&LoadRequest) -> Result<LoadResponse, CrawlError> + Send + Sync,
{
    fn load(&self, request: &LoadRequest) -> Result<LoadResponse, CrawlError> {
        (self.func)(request)
    }
}

/// A step that loads the URL given as its input value and yields an object
/// with the URL, status code and body.
#[derive(Debug, Default)]
pub struct LoadUrlStep {
    config: StepConfig,
    loader: Option<SharedLoader>,
}

impl LoadUrlStep {
    /// Creates the step. The loader is attached by the crawler or group it
    /// is added to.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Step for LoadUrlStep {
    fn config(&self) -> &StepConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut StepConfig {
        &mut self.config
    }

    fn validate_and_sanitize(&self, input: Value) -> Result<Value, CrawlError> {
        let Some(raw) = input.as_str() else {
            return Err(CrawlError::invalid_input("expected a URL string input"));
        };
        let url = Url::parse(raw)?;
        Ok(Value::String(url.into()))
    }

    fn produce<'a>(&'a self, input: Value) -> Values<'a> {
        let outcome = self.load_one(&input);
        Box::new(std::iter::once(outcome))
    }

    fn as_loading(&mut self) -> Option<&mut dyn LoadingCapable> {
        Some(self)
    }
}

impl LoadUrlStep {
    fn load_one(&self, input: &Value) -> Result<Value, CrawlError> {
        let Some(loader) = &self.loader else {
            return Err(CrawlError::loader("no loader attached"));
        };
        let url = Url::parse(input.as_str().unwrap_or_default())?;
        let request = LoadRequest::new(url.clone());
        let response = loader.load(&request)?;
        Ok(json!({
            "url": String::from(url),
            "status": response.status,
            "body": response.body,
        }))
    }
}

impl LoadingCapable for LoadUrlStep {
    fn add_loader(&mut self, loader: SharedLoader) {
        self.loader = Some(loader);
    }
}
