//! Observed network-traffic entries and header-set assembly from them.
//!
//! Drivers report requests in a minimal JSON shape (url + headers). The same
//! shape is accepted from a captured traffic file, so a header set can also
//! be imported offline when no automation is available.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::auth::header_set::HeaderSet;

/// One request observed by the browser.
#[derive(Debug, Clone, Deserialize)]
pub struct TrafficEntry {
    pub url: String,
    #[serde(default)]
    pub headers: Vec<TrafficHeader>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrafficHeader {
    pub name: String,
    pub value: String,
}

impl TrafficEntry {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// True if this is the call whose auth material we want: it targets the
    /// API path and actually carries an authorization header.
    pub fn carries_auth(&self, api_path: &str) -> bool {
        self.url.contains(api_path) && self.header("authorization").is_some_and(|v| !v.is_empty())
    }
}

/// Build a header set from an authenticated request, folding in any cookies
/// already collected from the browser session. A `Cookie` header on the entry
/// itself is split into pairs as well.
pub fn header_set_from_entry(
    entry: &TrafficEntry,
    session_cookies: &[(String, String)],
) -> HeaderSet {
    let mut set = HeaderSet::new();
    for h in &entry.headers {
        if h.name.eq_ignore_ascii_case("cookie") {
            for (name, value) in parse_cookie_line(&h.value) {
                set.cookies.insert(name, value);
            }
        } else {
            set.set_header(&h.name, h.value.clone());
        }
    }
    for (name, value) in session_cookies {
        set.cookies.insert(name.clone(), value.clone());
    }
    set
}

/// Split a `Cookie:` request line into name/value pairs.
pub fn parse_cookie_line(line: &str) -> Vec<(String, String)> {
    line.split(';')
        .filter_map(|part| {
            let (name, value) = part.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Parse a captured traffic file (JSON array of entries) and extract the
/// header set of the first request that carries auth for `api_path`.
pub fn import_traffic_file(path: &Path, api_path: &str) -> Result<HeaderSet> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("read traffic file: {}", path.display()))?;
    let entries: Vec<TrafficEntry> = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse traffic JSON: {}", path.display()))?;

    let entry = entries
        .iter()
        .find(|e| e.carries_auth(api_path))
        .with_context(|| {
            format!("no request to {} with an authorization header in capture", api_path)
        })?;

    let set = header_set_from_entry(entry, &[]);
    if !set.is_complete() {
        anyhow::bail!(
            "captured request is missing required headers {:?}",
            set.missing_headers()
        );
    }
    Ok(set)
}
