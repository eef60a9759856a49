//! The bundle of HTTP headers and cookies that authenticates API calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Header keys the report fetcher requires. A set missing any of these is
/// incomplete and must not be cached or used.
pub const REQUIRED_HEADERS: [&str; 3] = ["authorization", "user-agent", "content-type"];

/// Captured auth material: headers (lower-cased names), cookies, and when
/// they were captured. Serialized as-is into the cache slot, so the file
/// stays human-inspectable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderSet {
    /// When this material was captured (drives cache expiry).
    pub captured_at: DateTime<Utc>,
    /// Header name → value, names lower-cased.
    pub headers: HashMap<String, String>,
    /// Cookie name → value. BTreeMap so the rendered Cookie line is stable.
    pub cookies: BTreeMap<String, String>,
}

impl HeaderSet {
    /// Empty set captured now. Callers fill it and must check
    /// [`is_complete`](Self::is_complete) before caching.
    pub fn new() -> Self {
        Self {
            captured_at: Utc::now(),
            headers: HashMap::new(),
            cookies: BTreeMap::new(),
        }
    }

    /// Insert a header, lower-casing the name.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|s| s.as_str())
    }

    /// True when all required header keys are present and non-empty.
    pub fn is_complete(&self) -> bool {
        REQUIRED_HEADERS
            .iter()
            .all(|k| self.headers.get(*k).is_some_and(|v| !v.is_empty()))
    }

    /// Required keys that are missing or empty (for error messages).
    pub fn missing_headers(&self) -> Vec<&'static str> {
        REQUIRED_HEADERS
            .iter()
            .copied()
            .filter(|k| !self.headers.get(*k).is_some_and(|v| !v.is_empty()))
            .collect()
    }

    /// Age of the captured material relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.captured_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Outbound header map for a request: all captured headers plus a single
    /// `cookie` line joined from the cookie pairs.
    pub fn request_headers(&self) -> HashMap<String, String> {
        let mut out = self.headers.clone();
        if !self.cookies.is_empty() {
            let line = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("; ");
            out.insert("cookie".to_string(), line);
        }
        out
    }
}

impl Default for HeaderSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_set() -> HeaderSet {
        let mut h = HeaderSet::new();
        h.set_header("Authorization", "Bearer tok");
        h.set_header("User-Agent", "Mozilla/5.0");
        h.set_header("Content-Type", "application/json");
        h
    }

    #[test]
    fn completeness_requires_all_keys() {
        let mut h = HeaderSet::new();
        assert!(!h.is_complete());
        h.set_header("authorization", "Bearer tok");
        assert!(!h.is_complete());
        assert_eq!(h.missing_headers(), vec!["user-agent", "content-type"]);

        let h = complete_set();
        assert!(h.is_complete());
        assert!(h.missing_headers().is_empty());
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let mut h = complete_set();
        h.set_header("authorization", "");
        assert!(!h.is_complete());
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let h = complete_set();
        assert_eq!(h.header("AUTHORIZATION"), Some("Bearer tok"));
        assert_eq!(h.header("content-type"), Some("application/json"));
    }

    #[test]
    fn cookie_line_is_deterministic() {
        let mut h = complete_set();
        h.cookies.insert("b".into(), "2".into());
        h.cookies.insert("a".into(), "1".into());
        let out = h.request_headers();
        assert_eq!(out.get("cookie").unwrap(), "a=1; b=2");
    }

    #[test]
    fn no_cookie_line_without_cookies() {
        let out = complete_set().request_headers();
        assert!(!out.contains_key("cookie"));
    }
}
