//! Poll the driver's network traffic until the authenticated API call shows
//! up, then capture its headers and the session cookies.
//!
//! Polling the traffic instead of sleeping a fixed delay keeps extraction
//! robust to variable page-load latency; the timeout bounds the whole wait.

use std::time::{Duration, Instant};

use crate::auth::header_set::HeaderSet;

use super::traffic::header_set_from_entry;
use super::{Credentials, DriverEvent, ExtractError, Extractor, LoginDriver};

pub struct SessionExtractor<D: LoginDriver> {
    driver: D,
    /// Path fragment identifying the API call that carries the auth headers.
    api_path: String,
    poll_interval: Duration,
    headless: bool,
}

impl<D: LoginDriver> SessionExtractor<D> {
    pub fn new(driver: D, api_path: impl Into<String>) -> Self {
        Self {
            driver,
            api_path: api_path.into(),
            poll_interval: Duration::from_millis(500),
            headless: true,
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Drive the login and wait (bounded) for the authenticated API call.
    pub fn extract(
        &mut self,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<HeaderSet, ExtractError> {
        let result = self.extract_inner(credentials, timeout);
        self.driver.close();
        result
    }

    fn extract_inner(
        &mut self,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<HeaderSet, ExtractError> {
        tracing::info!("starting login-driven header extraction");
        self.driver.start(credentials, self.headless)?;

        let deadline = Instant::now() + timeout;
        let mut cookies: Vec<(String, String)> = Vec::new();

        loop {
            for event in self.driver.poll()? {
                match event {
                    DriverEvent::LoginError(msg) => {
                        tracing::warn!("portal rejected login: {}", msg);
                        return Err(ExtractError::LoginFailed(msg));
                    }
                    DriverEvent::Cookie { name, value } => {
                        cookies.retain(|(n, _)| n != &name);
                        cookies.push((name, value));
                    }
                    DriverEvent::Traffic(entry) => {
                        if entry.carries_auth(&self.api_path) {
                            tracing::info!("observed authenticated call to {}", entry.url);
                            let set = header_set_from_entry(&entry, &cookies);
                            if set.is_complete() {
                                return Ok(set);
                            }
                            // Auth header without the rest of the required
                            // set; keep watching for a fuller request.
                            tracing::debug!(
                                "captured call missing {:?}, continuing",
                                set.missing_headers()
                            );
                        }
                    }
                }
            }

            if Instant::now() >= deadline {
                return Err(ExtractError::Timeout {
                    waited_secs: timeout.as_secs(),
                });
            }
            std::thread::sleep(self.poll_interval);
        }
    }
}

impl<D: LoginDriver> Extractor for SessionExtractor<D> {
    fn extract(
        &mut self,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<HeaderSet, ExtractError> {
        SessionExtractor::extract(self, credentials, timeout)
    }
}
