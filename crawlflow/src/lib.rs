//! # Crawlflow
//!
//! A composable web-crawling pipeline engine with lazy step cascading.
//!
//! Crawlflow structures a crawl as an ordered chain of steps:
//!
//! - **Steps**: Units of work that lazily produce outputs from an input
//! - **Loops**: Feed a step's outputs back in as inputs until a condition ends it
//! - **Groups**: Invoke several steps with the same input, concatenated or combined
//! - **Results**: Named records composed additively along each output lineage
//! - **Filters**: Declarative predicates dropping outputs before they cascade
//!
//! ## Quick Start
//!
//! ```rust
//! use crawlflow::prelude::*;
//! use serde_json::{json, Value};
//!
//! let mut crawler = Crawler::new(UserAgent::bot("MyBot"));
//! crawler.add_step(FnStep::new(|input: &Value| {
//!     Ok(vec![json!(input.as_i64().unwrap_or(0) * 2)])
//! }));
//! crawler.add_keyed_step(
//!     "plus_one",
//!     FnStep::new(|input: &Value| Ok(vec![json!(input.as_i64().unwrap_or(0) + 1)])),
//! );
//! crawler.inputs(vec![json!(1), json!(2)]);
//!
//! let records = crawler.run()?;
//! assert_eq!(records.len(), 2);
//! assert_eq!(records[0].get("plus_one"), Some(&json!(3)));
//! # Ok::<(), crawlflow::errors::CrawlError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod crawler;
pub mod errors;
pub mod io;
pub mod loader;
pub mod logging;
pub mod result;
pub mod steps;
pub mod stores;
pub mod user_agent;
pub mod utils;


/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::crawler::{Crawler, OutputHook};
    pub use crate::errors::CrawlError;
    pub use crate::io::{Input, Output};
    pub use crate::loader::{
        FnLoader, LoadRequest, LoadResponse, LoadUrlStep, Loader, LoadingCapable, SharedLoader,
    };
    pub use crate::logging::{
        default_logger, CollectingLogSink, Level, LogSink, Logger, NoOpLogSink, TracingLogSink,
    };
    pub use crate::result::{CrawlResult, SharedResult};
    pub use crate::steps::{
        ComparisonRule, Filter, FnStep, Group, Loop, Outputs, Step, StepConfig, StringRule,
        UrlRule, Values,
    };
    pub use crate::stores::{CollectingStore, JsonLinesStore, Store};
    pub use crate::user_agent::UserAgent;
}
