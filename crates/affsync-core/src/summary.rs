//! Per-item download outcomes and the run summary surfaced to the caller.

use std::fmt;

use crate::auth::ResolvedVia;

/// Result for one order's file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded,
    /// A file for this order already exists locally; nothing was fetched.
    SkippedDuplicate,
    /// This item failed; the batch carried on.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub order_no: String,
    pub outcome: DownloadOutcome,
}

/// Counts for one full pass. Individual item failures leave the run
/// successful overall; only auth/fetch/parse failures are terminal.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub resolved_via: ResolvedVia,
    /// Orders with a download URL found in the report.
    pub orders: usize,
    /// Report rows dropped for having no download URL.
    pub dropped_rows: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// (order_no, reason) for every failed item.
    pub failures: Vec<(String, String)>,
}

impl RunSummary {
    pub fn new(resolved_via: ResolvedVia, orders: usize, dropped_rows: usize) -> Self {
        Self {
            resolved_via,
            orders,
            dropped_rows,
            downloaded: 0,
            skipped: 0,
            failed: 0,
            failures: Vec::new(),
        }
    }

    pub fn record(&mut self, item: ItemOutcome) {
        match item.outcome {
            DownloadOutcome::Downloaded => self.downloaded += 1,
            DownloadOutcome::SkippedDuplicate => self.skipped += 1,
            DownloadOutcome::Failed(reason) => {
                self.failed += 1;
                self.failures.push((item.order_no, reason));
            }
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let via = match self.resolved_via {
            ResolvedVia::Manual => "manual token",
            ResolvedVia::Cache => "cache",
            ResolvedVia::Extraction => "extraction",
        };
        write!(
            f,
            "auth via {}; {} orders ({} rows dropped); downloaded {}, skipped {}, failed {}",
            via, self.orders, self.dropped_rows, self.downloaded, self.skipped, self.failed
        )
    }
}
