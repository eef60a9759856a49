//! One full pass: resolve auth → fetch report → parse → download.
//!
//! Holds the single piece of cross-stage policy: a server-side auth
//! rejection invalidates the cache and forces exactly one re-extraction
//! before the run is declared failed. That covers clock skew and early
//! server-side expiry without looping on a genuinely broken login.

use std::time::Duration;

use crate::auth::{AuthResolver, Extractor, Resolved};
use crate::download::DownloadManager;
use crate::error::RunError;
use crate::report::{fetch_report, parse_report, FetchError, ReportQuery};
use crate::retry::RetryPolicy;
use crate::summary::RunSummary;

pub struct Pipeline<E: Extractor> {
    pub resolver: AuthResolver<E>,
    pub downloads: DownloadManager,
    pub api_url: String,
    pub conversion_base_url: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl<E: Extractor> Pipeline<E> {
    /// Run one pass. Per-item download failures are reported in the summary;
    /// only auth/fetch/parse failures return `Err`.
    pub fn run(&mut self, query: &ReportQuery, force_refresh: bool) -> Result<RunSummary, RunError> {
        let resolved = self.resolver.resolve(force_refresh)?;
        tracing::info!("auth resolved via {:?}", resolved.via);

        let (csv, resolved) = self.fetch_with_reauth(query, resolved)?;

        let report = parse_report(&csv, &self.conversion_base_url)?;
        tracing::info!(
            "report parsed: {} orders, {} rows dropped",
            report.records.len(),
            report.dropped
        );

        let mut summary = RunSummary::new(resolved.via, report.records.len(), report.dropped);
        for item in self.downloads.download_all(&report.records) {
            summary.record(item);
        }
        tracing::info!("run complete: {}", summary);
        Ok(summary)
    }

    /// Fetch the report, allowing one forced re-resolution if the server
    /// rejects headers that looked valid locally.
    fn fetch_with_reauth(
        &mut self,
        query: &ReportQuery,
        resolved: Resolved,
    ) -> Result<(String, Resolved), RunError> {
        match fetch_report(
            &self.api_url,
            &resolved.headers,
            query,
            self.request_timeout,
            &self.retry,
        ) {
            Ok(csv) => Ok((csv, resolved)),
            Err(FetchError::AuthRejected(msg)) => {
                tracing::warn!("server rejected headers ({}); re-resolving once", msg);
                if let Err(e) = self.resolver.cache().invalidate() {
                    tracing::warn!("could not clear header cache: {:#}", e);
                }
                let fresh = self.resolver.resolve(true)?;
                let csv = fetch_report(
                    &self.api_url,
                    &fresh.headers,
                    query,
                    self.request_timeout,
                    &self.retry,
                )?;
                Ok((csv, fresh))
            }
            Err(e) => Err(e.into()),
        }
    }
}
