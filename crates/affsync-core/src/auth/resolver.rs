//! Pick a valid header set for this run: manual token, cache hit, or
//! login-driven extraction (in that order), caching fresh extractions.

use std::time::Duration;
use thiserror::Error;

use super::cache::HeaderCache;
use super::extract::{Credentials, ExtractError, Extractor};
use super::header_set::HeaderSet;

/// User agent sent when a manual token is used (no browser session to copy
/// one from).
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// How the run's header set was obtained (reported in the run summary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedVia {
    Manual,
    Cache,
    Extraction,
}

#[derive(Debug, Clone)]
pub struct Resolved {
    pub headers: HeaderSet,
    pub via: ResolvedVia,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Extraction(#[from] ExtractError),

    /// Nothing left to try: no manual token, no fresh cache, and extraction
    /// is not configured.
    #[error("cannot resolve auth headers: {0}")]
    Unavailable(String),
}

pub struct AuthResolver<E: Extractor> {
    cache: HeaderCache,
    extractor: Option<E>,
    credentials: Option<Credentials>,
    manual_token: Option<String>,
    extract_timeout: Duration,
}

impl<E: Extractor> AuthResolver<E> {
    pub fn new(cache: HeaderCache, extract_timeout: Duration) -> Self {
        Self {
            cache,
            extractor: None,
            credentials: None,
            manual_token: None,
            extract_timeout,
        }
    }

    pub fn with_extractor(mut self, extractor: E, credentials: Credentials) -> Self {
        self.extractor = Some(extractor);
        self.credentials = Some(credentials);
        self
    }

    pub fn with_manual_token(mut self, token: Option<String>) -> Self {
        self.manual_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn cache(&self) -> &HeaderCache {
        &self.cache
    }

    /// Resolve a header set for this run.
    ///
    /// A manual token always wins and touches neither cache nor browser.
    /// `force_refresh` bypasses a valid cache hit and goes straight to
    /// extraction. Extraction failures are terminal; there is no automatic
    /// retry because repeated login attempts risk account lockout.
    pub fn resolve(&mut self, force_refresh: bool) -> Result<Resolved, AuthError> {
        if let Some(token) = &self.manual_token {
            tracing::info!("using manually supplied auth token");
            let mut set = HeaderSet::new();
            set.set_header("authorization", token.clone());
            set.set_header("user-agent", DEFAULT_USER_AGENT);
            set.set_header("content-type", "application/json");
            return Ok(Resolved {
                headers: set,
                via: ResolvedVia::Manual,
            });
        }

        if !force_refresh {
            if let Some(set) = self.cache.load() {
                tracing::info!("using cached headers, no browser needed");
                return Ok(Resolved {
                    headers: set,
                    via: ResolvedVia::Cache,
                });
            }
        } else {
            tracing::info!("forced refresh requested, bypassing header cache");
        }

        let (extractor, credentials) = match (self.extractor.as_mut(), self.credentials.as_ref()) {
            (Some(e), Some(c)) => (e, c),
            _ => {
                return Err(AuthError::Unavailable(
                    "no usable cache and no browser driver configured; supply a manual \
                     token or import a traffic capture"
                        .to_string(),
                ))
            }
        };

        let set = extractor.extract(credentials, self.extract_timeout)?;
        if let Err(e) = self.cache.save(&set) {
            // The in-memory set is still good for this run.
            tracing::warn!("could not persist extracted headers: {:#}", e);
        }
        Ok(Resolved {
            headers: set,
            via: ResolvedVia::Extraction,
        })
    }
}
