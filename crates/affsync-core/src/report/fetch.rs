//! Authenticated report fetch.
//!
//! Issues the order-export POST with the resolved header set. Transport
//! failures are retried with bounded backoff; an auth rejection is surfaced
//! as its own error so the pipeline can trigger its single re-resolution
//! cycle; any other server failure is immediate and final.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::auth::HeaderSet;
use crate::retry::{classify_curl_error, run_with_retry, ErrorKind, RetryPolicy};

/// Body of the order-export POST.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    pub begin_date: String,
    pub end_date: String,
    pub page_num: u32,
    pub veri_status: String,
    pub media_id: String,
    pub tracking_source_id: String,
}

impl ReportQuery {
    /// Query for a date range (YYYY-MM-DD bounds), remaining filters empty.
    pub fn for_range(begin_date: impl Into<String>, end_date: impl Into<String>) -> Self {
        Self {
            begin_date: begin_date.into(),
            end_date: end_date.into(),
            page_num: 1,
            veri_status: String::new(),
            media_id: String::new(),
            tracking_source_id: String::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    /// The server reported the header set as invalid or expired, even if it
    /// looked fresh locally.
    #[error("server rejected auth headers: {0}")]
    AuthRejected(String),

    /// Transport-level failure (timeout, connection). Retried with backoff.
    #[error("network error: {0}")]
    Network(#[from] curl::Error),

    /// Non-2xx response other than an auth rejection. Not retried.
    #[error("server returned HTTP {0}")]
    Server(u32),

    /// 2xx response whose envelope reports a failure. Not retried.
    #[error("API error: {0}")]
    Api(String),

    /// Response was neither the JSON envelope nor raw CSV.
    #[error("unexpected response shape: {0}")]
    Malformed(String),
}

/// JSON envelope the export endpoint wraps its CSV payload in.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    success: bool,
}

/// Stray envelope blob the upstream sometimes embeds inside the CSV payload.
const EMBEDDED_SUCCESS_BLOB: &str = r#"{"code":0,"msg":"Success","data":null,"success":true}"#;

fn classify_fetch(e: &FetchError) -> ErrorKind {
    match e {
        FetchError::Network(ce) => classify_curl_error(ce),
        _ => ErrorKind::Other,
    }
}

/// Fetch the report CSV. Returns an empty string when the range holds no
/// orders (a valid, successful outcome).
pub fn fetch_report(
    api_url: &str,
    headers: &HeaderSet,
    query: &ReportQuery,
    timeout: Duration,
    policy: &RetryPolicy,
) -> Result<String, FetchError> {
    let body =
        serde_json::to_vec(query).map_err(|e| FetchError::Malformed(format!("query: {}", e)))?;
    run_with_retry(policy, classify_fetch, || {
        fetch_once(api_url, headers, &body, timeout)
    })
}

fn fetch_once(
    api_url: &str,
    headers: &HeaderSet,
    body: &[u8],
    timeout: Duration,
) -> Result<String, FetchError> {
    let mut easy = curl::easy::Easy::new();
    easy.url(api_url)?;
    easy.post(true)?;
    easy.post_fields_copy(body)?;
    easy.connect_timeout(timeout.min(Duration::from_secs(15)))?;
    easy.timeout(timeout)?;

    let mut list = curl::easy::List::new();
    for (k, v) in headers.request_headers() {
        list.append(&format!("{}: {}", k.trim(), v.trim()))?;
    }
    easy.http_headers(list)?;

    let mut response = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            response.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    if code == 401 || code == 403 {
        return Err(FetchError::AuthRejected(format!("HTTP {}", code)));
    }
    if !(200..300).contains(&code) {
        return Err(FetchError::Server(code));
    }

    parse_envelope(&response)
}

/// Unwrap the response body into CSV text.
///
/// The endpoint normally answers `{code, msg, data, success}` with the CSV in
/// `data`; older deployments returned the CSV directly. "Token invalid" in
/// `msg` means the headers were rejected despite the 200.
fn parse_envelope(body: &[u8]) -> Result<String, FetchError> {
    let text = String::from_utf8_lossy(body);

    if let Ok(env) = serde_json::from_slice::<Envelope>(body) {
        let msg = env.msg.unwrap_or_default();
        if env.success && env.code == 0 {
            let csv = env.data.unwrap_or_default();
            if csv.is_empty() {
                tracing::info!("no orders in the requested range");
                return Ok(String::new());
            }
            return Ok(csv.replace(EMBEDDED_SUCCESS_BLOB, ""));
        }
        if msg.to_ascii_lowercase().contains("token invalid") {
            return Err(FetchError::AuthRejected(msg));
        }
        if msg.to_ascii_lowercase().contains("no data to export") {
            tracing::info!("no orders in the requested range");
            return Ok(String::new());
        }
        return Err(FetchError::Api(msg));
    }

    if text.trim_start().starts_with("Order No.,") {
        return Ok(text.into_owned());
    }

    let preview: String = text.chars().take(120).collect();
    Err(FetchError::Malformed(preview))
}
