//! Composable filter predicates for conditional output routing.
//!
//! Filters form a singly-linked OR-chain: evaluation tries the primary rule,
//! then walks the chain until one alternative matches or the chain ends.
//! Insertion always walks to the current tail, so the chain can never cycle.

use crate::errors::{value_type, CrawlError};
use serde_json::Value;
use std::cmp::Ordering;
use url::Url;

/// Comparison rules with standard total-order semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonRule {
    /// Values are equal.
    Equal,
    /// Values are not equal.
    NotEqual,
    /// Candidate is greater than the reference value.
    GreaterThan,
    /// Candidate is greater than or equal to the reference value.
    GreaterThanOrEqual,
    /// Candidate is less than the reference value.
    LessThan,
    /// Candidate is less than or equal to the reference value.
    LessThanOrEqual,
}

/// Substring rules on string candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringRule {
    /// Candidate contains the reference string.
    Contains,
    /// Candidate starts with the reference string.
    StartsWith,
    /// Candidate ends with the reference string.
    EndsWith,
}

/// Rules tested against the parsed components of a URL-shaped candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlRule {
    /// The URL scheme (e.g. `https`).
    Scheme,
    /// The full host (e.g. `www.example.com`).
    Host,
    /// The registrable domain (e.g. `example.com`), distinct from the host.
    Domain,
    /// The exact path.
    Path,
    /// A path prefix.
    PathStartsWith,
}

#[derive(Debug, Clone)]
enum FilterRule {
    Comparison(ComparisonRule, Value),
    Str(StringRule, String),
    Url(UrlRule, String),
}

/// A composable predicate over a candidate value.
#[derive(Debug, Clone)]
pub struct Filter {
    rule: FilterRule,
    use_key: Option<String>,
    or: Option<Box<Filter>>,
}

impl Filter {
    fn new(rule: FilterRule) -> Self {
        Self {
            rule,
            use_key: None,
            or: None,
        }
    }

    /// Matches values equal to the reference value.
    #[must_use]
    pub fn equal(value: impl Into<Value>) -> Self {
        Self::new(FilterRule::Comparison(ComparisonRule::Equal, value.into()))
    }

    /// Matches values not equal to the reference value.
    #[must_use]
    pub fn not_equal(value: impl Into<Value>) -> Self {
        Self::new(FilterRule::Comparison(ComparisonRule::NotEqual, value.into()))
    }

    /// Matches values greater than the reference value.
    #[must_use]
    pub fn greater_than(value: impl Into<Value>) -> Self {
        Self::new(FilterRule::Comparison(ComparisonRule::GreaterThan, value.into()))
    }

    /// Matches values greater than or equal to the reference value.
    #[must_use]
    pub fn greater_than_or_equal(value: impl Into<Value>) -> Self {
        Self::new(FilterRule::Comparison(
            ComparisonRule::GreaterThanOrEqual,
            value.into(),
        ))
    }

    /// Matches values less than the reference value.
    #[must_use]
    pub fn less_than(value: impl Into<Value>) -> Self {
        Self::new(FilterRule::Comparison(ComparisonRule::LessThan, value.into()))
    }

    /// Matches values less than or equal to the reference value.
    #[must_use]
    pub fn less_than_or_equal(value: impl Into<Value>) -> Self {
        Self::new(FilterRule::Comparison(
            ComparisonRule::LessThanOrEqual,
            value.into(),
        ))
    }

    /// Matches strings containing the given substring.
    #[must_use]
    pub fn string_contains(value: impl Into<String>) -> Self {
        Self::new(FilterRule::Str(StringRule::Contains, value.into()))
    }

    /// Matches strings starting with the given prefix.
    #[must_use]
    pub fn string_starts_with(value: impl Into<String>) -> Self {
        Self::new(FilterRule::Str(StringRule::StartsWith, value.into()))
    }

    /// Matches strings ending with the given suffix.
    #[must_use]
    pub fn string_ends_with(value: impl Into<String>) -> Self {
        Self::new(FilterRule::Str(StringRule::EndsWith, value.into()))
    }

    /// Matches URLs with the given scheme.
    #[must_use]
    pub fn url_scheme(value: impl Into<String>) -> Self {
        Self::new(FilterRule::Url(UrlRule::Scheme, value.into()))
    }

    /// Matches URLs with the given full host.
    #[must_use]
    pub fn url_host(value: impl Into<String>) -> Self {
        Self::new(FilterRule::Url(UrlRule::Host, value.into()))
    }

    /// Matches URLs with the given registrable domain.
    #[must_use]
    pub fn url_domain(value: impl Into<String>) -> Self {
        Self::new(FilterRule::Url(UrlRule::Domain, value.into()))
    }

    /// Matches URLs with exactly the given path.
    #[must_use]
    pub fn url_path(value: impl Into<String>) -> Self {
        Self::new(FilterRule::Url(UrlRule::Path, value.into()))
    }

    /// Matches URLs whose path starts with the given prefix.
    #[must_use]
    pub fn url_path_starts_with(value: impl Into<String>) -> Self {
        Self::new(FilterRule::Url(UrlRule::PathStartsWith, value.into()))
    }

    /// Projects the candidate through a named key before applying the rule.
    #[must_use]
    pub fn use_key(mut self, key: impl Into<String>) -> Self {
        self.use_key = Some(key.into());
        self
    }

    /// Links a further filter to this one with OR.
    ///
    /// Appends at the tail of the existing chain.
    pub fn add_or(&mut self, filter: Filter) {
        let mut tail = self;
        while let Some(ref mut next) = tail.or {
            tail = next;
        }
        tail.or = Some(Box::new(filter));
    }

    /// Returns the filter linked to this one as OR, if any.
    #[must_use]
    pub fn or_filter(&self) -> Option<&Filter> {
        self.or.as_deref()
    }

    /// Returns the number of filters in this OR-chain, including this one.
    #[must_use]
    pub fn chain_len(&self) -> usize {
        1 + self.or.as_ref().map_or(0, |or| or.chain_len())
    }

    /// Tests the candidate value against this filter and its OR-chain.
    ///
    /// Each alternative is tested against the original candidate (every node
    /// applies its own projection key).
    pub fn test(&self, candidate: &Value) -> Result<bool, CrawlError> {
        let projected = self.project(candidate)?;

        if self.matches(projected)? {
            return Ok(true);
        }

        match &self.or {
            Some(or) => or.test(candidate),
            None => Ok(false),
        }
    }

    fn project<'v>(&self, candidate: &'v Value) -> Result<&'v Value, CrawlError> {
        let Some(key) = &self.use_key else {
            return Ok(candidate);
        };

        let Value::Object(map) = candidate else {
            return Err(CrawlError::NotFilterable {
                actual: value_type(candidate),
            });
        };

        map.get(key)
            .ok_or_else(|| CrawlError::key_not_found(key.clone()))
    }

    fn matches(&self, candidate: &Value) -> Result<bool, CrawlError> {
        match &self.rule {
            FilterRule::Comparison(rule, reference) => compare(*rule, candidate, reference),
            FilterRule::Str(rule, reference) => {
                let Value::String(s) = candidate else {
                    return Ok(false);
                };
                Ok(match rule {
                    StringRule::Contains => s.contains(reference),
                    StringRule::StartsWith => s.starts_with(reference),
                    StringRule::EndsWith => s.ends_with(reference),
                })
            }
            FilterRule::Url(rule, reference) => {
                let Value::String(s) = candidate else {
                    return Ok(false);
                };
                let url = Url::parse(s)?;
                Ok(match rule {
                    UrlRule::Scheme => url.scheme() == reference,
                    UrlRule::Host => url.host_str() == Some(reference.as_str()),
                    UrlRule::Domain => url
                        .host_str()
                        .is_some_and(|host| registrable_domain(host) == *reference),
                    UrlRule::Path => url.path() == reference,
                    UrlRule::PathStartsWith => url.path().starts_with(reference.as_str()),
                })
            }
        }
    }
}

fn compare(rule: ComparisonRule, candidate: &Value, reference: &Value) -> Result<bool, CrawlError> {
    match rule {
        ComparisonRule::Equal => Ok(candidate == reference),
        ComparisonRule::NotEqual => Ok(candidate != reference),
        ordering_rule => {
            let ordering = order(candidate, reference)?;
            Ok(match ordering_rule {
                ComparisonRule::GreaterThan => ordering == Ordering::Greater,
                ComparisonRule::GreaterThanOrEqual => ordering != Ordering::Less,
                ComparisonRule::LessThan => ordering == Ordering::Less,
                ComparisonRule::LessThanOrEqual => ordering != Ordering::Greater,
                ComparisonRule::Equal | ComparisonRule::NotEqual => unreachable!(),
            })
        }
    }
}

/// Orders two values: numeric comparison for number pairs, lexical for string
/// pairs. Any other pairing fails fast instead of silently coercing.
fn order(left: &Value, right: &Value) -> Result<Ordering, CrawlError> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => {
            let (l, r) = (l.as_f64().unwrap_or(f64::NAN), r.as_f64().unwrap_or(f64::NAN));
            l.partial_cmp(&r).ok_or(CrawlError::Incomparable {
                left: "number",
                right: "number",
            })
        }
        (Value::String(l), Value::String(r)) => Ok(l.cmp(r)),
        (l, r) => Err(CrawlError::Incomparable {
            left: value_type(l),
            right: value_type(r),
        }),
    }
}

/// Extracts the registrable domain from a host.
///
/// Heuristic: the last two labels, or three when the second-level label is a
/// well-known shared suffix under a two-letter TLD (e.g. `example.co.uk`).
#[must_use]
pub(crate) fn registrable_domain(host: &str) -> String {
    const SHARED_SUFFIXES: [&str; 7] = ["co", "com", "net", "org", "gov", "edu", "ac"];

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        return host.to_string();
    }

    let tld = labels[labels.len() - 1];
    let sld = labels[labels.len() - 2];
    let take = if tld.len() == 2 && SHARED_SUFFIXES.contains(&sld) {
        3
    } else {
        2
    };

    labels[labels.len() - take..].join(".")
}
