//! User agent strings sent along with loader requests.

use std::fmt;

/// A user agent string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgent(String);

impl UserAgent {
    /// Wraps a raw user agent string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Builds the conventional bot user agent string for a named crawler.
    #[must_use]
    pub fn bot(name: &str) -> Self {
        Self(format!("Mozilla/5.0 (compatible; {name})"))
    }

    /// The user agent string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserAgent {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for UserAgent {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
