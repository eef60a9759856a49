//! Terminal run errors, labeled by the stage that failed so the caller can
//! point the user at the right remediation.

use thiserror::Error;

use crate::auth::AuthError;
use crate::report::{FetchError, ParseError};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("auth stage failed: {0}")]
    Auth(#[from] AuthError),

    #[error("report fetch stage failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("report parse stage failed: {0}")]
    Parse(#[from] ParseError),
}

impl RunError {
    /// Short stage label for logs and exit messages.
    pub fn stage(&self) -> &'static str {
        match self {
            RunError::Auth(_) => "auth",
            RunError::Fetch(_) => "fetch",
            RunError::Parse(_) => "parse",
        }
    }
}
