//! Single-slot on-disk cache for the extracted header set.
//!
//! One record per installation, pretty JSON so it stays inspectable. Saves go
//! through a temp file and an atomic rename, so a crash mid-write cannot
//! leave a half-written slot. Anything unreadable is treated as a miss, never
//! as a fatal error: the worst case is a re-extraction.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::header_set::HeaderSet;

pub struct HeaderCache {
    path: PathBuf,
    ttl: Duration,
}

impl HeaderCache {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
        }
    }

    /// Default slot path: `~/.local/state/affsync/headers.json`.
    pub fn default_path() -> Result<PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("affsync")?;
        Ok(xdg_dirs.get_state_home().join("affsync").join("headers.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Read the slot. Returns `None` when the file is missing, fails to
    /// parse, is incomplete, or has outlived the TTL.
    pub fn load(&self) -> Option<HeaderSet> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("header cache unreadable ({}): {}", self.path.display(), e);
                return None;
            }
        };
        let set: HeaderSet = match serde_json::from_slice(&bytes) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("header cache corrupt ({}): {}", self.path.display(), e);
                return None;
            }
        };
        if !set.is_complete() {
            tracing::warn!(
                "header cache missing required keys {:?}, treating as absent",
                set.missing_headers()
            );
            return None;
        }
        let age = set.age(Utc::now());
        if age > self.ttl {
            tracing::info!("cached headers are {:?} old (ttl {:?}), stale", age, self.ttl);
            return None;
        }
        Some(set)
    }

    /// Overwrite the slot atomically. Incomplete sets are rejected so a
    /// partial capture can never poison later runs.
    pub fn save(&self, set: &HeaderSet) -> Result<()> {
        if !set.is_complete() {
            anyhow::bail!(
                "refusing to cache incomplete header set (missing {:?})",
                set.missing_headers()
            );
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(set).context("serialize header set")?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("rename into {}", self.path.display()))?;
        tracing::info!("saved headers to cache slot {}", self.path.display());
        Ok(())
    }

    /// Explicit clear, used by forced refresh.
    pub fn invalidate(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!("cleared header cache {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", self.path.display())),
        }
    }
}
