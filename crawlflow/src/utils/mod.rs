//! Small helpers shared across modules.

use crate::errors::CrawlError;
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use serde_json::Value;

/// Parses an HTTP date header value (RFC 7231 / RFC 2822 form) into a UTC
/// timestamp.
pub fn parse_http_date(value: &str) -> Result<DateTime<Utc>, CrawlError> {
    DateTime::parse_from_rfc2822(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| CrawlError::InvalidDate(value.to_string()))
}

/// Hex md5 digest of a value's canonical serialization, used as a dedup
/// fingerprint.
#[must_use]
pub fn fingerprint(value: &Value) -> String {
    let mut hasher = Md5::new();
    hasher.update(value.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_http_date() {
        let parsed = parse_http_date("Tue, 22 Mar 2022 17:25:08 GMT").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2022-03-22T17:25:08+00:00");
        assert_eq!(parsed.hour(), 17);
    }

    #[test]
    fn test_parse_http_date_rejects_garbage() {
        assert!(matches!(
            parse_http_date("not a date"),
            Err(CrawlError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_fingerprint_is_stable_and_value_sensitive() {
        let a = fingerprint(&json!({"x": 1}));
        let b = fingerprint(&json!({"x": 1}));
        let c = fingerprint(&json!({"x": 2}));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
    }
}
