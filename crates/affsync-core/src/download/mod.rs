//! Per-order file downloads with name-based dedup.
//!
//! Each order maps to a deterministic filename; files already present are
//! skipped without touching the network. Bodies land in a `.part` temp file
//! and are renamed into place only after the transfer completes, so an
//! interrupted run can never leave something a later run mistakes for a
//! finished download. One item's failure never aborts the batch.

mod filename;

pub use filename::{sanitize_component, target_filename};

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::report::OrderRecord;
use crate::retry::{
    classify_curl_error, classify_http_status, run_with_retry, ErrorKind, RetryPolicy,
};
use crate::summary::{DownloadOutcome, ItemOutcome};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path.
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Error for one fetch attempt, kept separate so it can be classified for
/// retry before collapsing into the per-item outcome.
#[derive(Debug)]
enum FileFetchError {
    Curl(curl::Error),
    Http(u32),
    Io(std::io::Error),
}

impl fmt::Display for FileFetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFetchError::Curl(e) => write!(f, "{}", e),
            FileFetchError::Http(code) => write!(f, "HTTP {}", code),
            FileFetchError::Io(e) => write!(f, "io: {}", e),
        }
    }
}

impl From<curl::Error> for FileFetchError {
    fn from(e: curl::Error) -> Self {
        FileFetchError::Curl(e)
    }
}

fn classify_fetch(e: &FileFetchError) -> ErrorKind {
    match e {
        FileFetchError::Curl(ce) => classify_curl_error(ce),
        FileFetchError::Http(code) => classify_http_status(*code),
        // Disk problems don't get better by retrying the transfer.
        FileFetchError::Io(_) => ErrorKind::Other,
    }
}

pub struct DownloadManager {
    dir: PathBuf,
    timeout: Duration,
    policy: RetryPolicy,
}

impl DownloadManager {
    pub fn new(
        dir: impl Into<PathBuf>,
        timeout: Duration,
        policy: RetryPolicy,
    ) -> anyhow::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            timeout,
            policy,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Process every record; failures are collected, never raised.
    pub fn download_all(&self, records: &[OrderRecord]) -> Vec<ItemOutcome> {
        records
            .iter()
            .map(|record| {
                let outcome = self.download_one(record);
                if let DownloadOutcome::Failed(reason) = &outcome {
                    tracing::warn!("order {} download failed: {}", record.order_no, reason);
                }
                ItemOutcome {
                    order_no: record.order_no.clone(),
                    outcome,
                }
            })
            .collect()
    }

    /// Target path for a record (exposed for dedup-oriented callers/tests).
    pub fn target_path(&self, record: &OrderRecord) -> PathBuf {
        self.dir
            .join(target_filename(&record.order_no, &record.file_url))
    }

    fn download_one(&self, record: &OrderRecord) -> DownloadOutcome {
        let target = self.target_path(record);
        if target.exists() {
            tracing::debug!("order {} already at {}, skipping", record.order_no, target.display());
            return DownloadOutcome::SkippedDuplicate;
        }

        let tmp = temp_path(&target);
        let result = run_with_retry(&self.policy, classify_fetch, || {
            self.fetch_to_temp(&record.file_url, &tmp)
        });

        match result {
            Ok(()) => match std::fs::rename(&tmp, &target) {
                Ok(()) => {
                    tracing::info!("order {} saved to {}", record.order_no, target.display());
                    DownloadOutcome::Downloaded
                }
                Err(e) => {
                    let _ = std::fs::remove_file(&tmp);
                    DownloadOutcome::Failed(format!("finalize {}: {}", target.display(), e))
                }
            },
            Err(e) => {
                let _ = std::fs::remove_file(&tmp);
                DownloadOutcome::Failed(e.to_string())
            }
        }
    }

    fn fetch_to_temp(&self, url: &str, tmp: &Path) -> Result<(), FileFetchError> {
        let file = std::fs::File::create(tmp).map_err(FileFetchError::Io)?;
        let mut writer = std::io::BufWriter::new(file);
        let mut write_err: Option<std::io::Error> = None;

        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(self.timeout.min(Duration::from_secs(15)))?;
        easy.timeout(self.timeout)?;

        let perform = {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| match writer.write_all(data) {
                Ok(()) => Ok(data.len()),
                Err(e) => {
                    write_err = Some(e);
                    Ok(0) // abort transfer
                }
            })?;
            transfer.perform()
        };
        if let Some(e) = write_err {
            return Err(FileFetchError::Io(e));
        }
        perform?;

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(FileFetchError::Http(code));
        }

        let file = writer
            .into_inner()
            .map_err(|e| FileFetchError::Io(e.into_error()))?;
        file.sync_all().map_err(FileFetchError::Io)?;
        Ok(())
    }
}
