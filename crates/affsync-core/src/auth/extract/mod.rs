//! Session extraction: drive the external browser-automation collaborator
//! through the portal login and capture the headers/cookies of the first
//! authenticated API call observed in its network traffic.
//!
//! The browser itself stays outside this crate. It is reached through the
//! [`LoginDriver`] trait, so tests substitute a deterministic stub and the
//! CLI plugs in [`ProcessDriver`] (a spawned helper emitting JSON events).

mod extractor;
mod process;
pub mod traffic;

pub use extractor::SessionExtractor;
pub use process::ProcessDriver;
pub use traffic::TrafficEntry;

use thiserror::Error;

/// Portal login credentials, supplied by the excluded config/CLI layer.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Why extraction failed. Both variants are terminal for the run: repeated
/// automated login attempts risk account lockout, so there is no auto-retry.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The authenticated API call never appeared in the observed traffic
    /// within the bound.
    #[error("no authenticated API call observed within {waited_secs}s")]
    Timeout { waited_secs: u64 },

    /// The portal rejected the credentials.
    #[error("login failed: {0}")]
    LoginFailed(String),

    /// The browser-automation collaborator itself broke.
    #[error("browser driver error: {0}")]
    Driver(String),
}

/// One observation reported by the browser driver.
#[derive(Debug, Clone)]
pub enum DriverEvent {
    /// A network request the browser performed.
    Traffic(TrafficEntry),
    /// A session cookie currently held by the browser.
    Cookie { name: String, value: String },
    /// The page showed a login-error indicator.
    LoginError(String),
}

/// Capability interface over header extraction, so the resolver can be
/// tested against a deterministic stub instead of a live browser.
pub trait Extractor {
    fn extract(
        &mut self,
        credentials: &Credentials,
        timeout: std::time::Duration,
    ) -> Result<crate::auth::header_set::HeaderSet, ExtractError>;
}

/// The external browser-automation seam.
///
/// `poll` must return whatever events accumulated since the last call
/// without blocking; the extractor owns the waiting.
pub trait LoginDriver {
    /// Open the portal and submit the login form.
    fn start(&mut self, credentials: &Credentials, headless: bool) -> Result<(), ExtractError>;

    /// Drain events observed since the last poll.
    fn poll(&mut self) -> Result<Vec<DriverEvent>, ExtractError>;

    /// Tear the session down. Must be safe to call more than once.
    fn close(&mut self);
}
