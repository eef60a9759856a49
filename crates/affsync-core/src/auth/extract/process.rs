//! Driver over an external browser-automation helper process.
//!
//! The helper owns the actual browser (it is not this crate's business how).
//! Contract: credentials arrive via `AFFSYNC_USERNAME` / `AFFSYNC_PASSWORD`
//! environment variables, `AFFSYNC_HEADLESS` carries the headless flag, and
//! the helper prints one JSON driver event per stdout line:
//!
//! ```text
//! {"type":"cookie","name":"sid","value":"abc"}
//! {"type":"traffic","url":"https://...","headers":[{"name":"Authorization","value":"..."}]}
//! {"type":"login_error","message":"Invalid password"}
//! ```
//!
//! A reader thread feeds lines into a channel so `poll` never blocks.

use serde::Deserialize;
use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{Receiver, TryRecvError};

use super::traffic::TrafficEntry;
use super::{Credentials, DriverEvent, ExtractError, LoginDriver};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    Traffic {
        url: String,
        #[serde(default)]
        headers: Vec<super::traffic::TrafficHeader>,
    },
    Cookie {
        name: String,
        value: String,
    },
    LoginError {
        message: String,
    },
}

impl From<WireEvent> for DriverEvent {
    fn from(ev: WireEvent) -> Self {
        match ev {
            WireEvent::Traffic { url, headers } => {
                DriverEvent::Traffic(TrafficEntry { url, headers })
            }
            WireEvent::Cookie { name, value } => DriverEvent::Cookie { name, value },
            WireEvent::LoginError { message } => DriverEvent::LoginError(message),
        }
    }
}

pub struct ProcessDriver {
    command: String,
    child: Option<Child>,
    events: Option<Receiver<DriverEvent>>,
}

impl ProcessDriver {
    /// `command` is run via `sh -c`, so it may carry its own arguments.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            child: None,
            events: None,
        }
    }
}

impl LoginDriver for ProcessDriver {
    fn start(&mut self, credentials: &Credentials, headless: bool) -> Result<(), ExtractError> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .env("AFFSYNC_USERNAME", &credentials.username)
            .env("AFFSYNC_PASSWORD", &credentials.password)
            .env("AFFSYNC_HEADLESS", if headless { "1" } else { "0" })
            .stdout(Stdio::piped())
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| ExtractError::Driver(format!("spawn `{}`: {}", self.command, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExtractError::Driver("helper stdout not captured".to_string()))?;

        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let line = match line {
                    Ok(l) => l,
                    Err(_) => break,
                };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<WireEvent>(&line) {
                    Ok(ev) => {
                        if tx.send(ev.into()).is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::debug!("ignoring malformed driver line: {}", e),
                }
            }
        });

        self.child = Some(child);
        self.events = Some(rx);
        Ok(())
    }

    fn poll(&mut self) -> Result<Vec<DriverEvent>, ExtractError> {
        let rx = self
            .events
            .as_ref()
            .ok_or_else(|| ExtractError::Driver("driver not started".to_string()))?;
        let mut out = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(ev) => out.push(ev),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // Helper exited. Whatever it reported before exit was
                    // already drained; an abnormal exit is a driver fault.
                    if out.is_empty() {
                        if let Some(child) = self.child.as_mut() {
                            if let Ok(Some(status)) = child.try_wait() {
                                if !status.success() {
                                    return Err(ExtractError::Driver(format!(
                                        "helper exited with {}",
                                        status
                                    )));
                                }
                            }
                        }
                    }
                    break;
                }
            }
        }
        Ok(out)
    }

    fn close(&mut self) {
        self.events = None;
        if let Some(mut child) = self.child.take() {
            match child.try_wait() {
                Ok(Some(_)) => {}
                _ => {
                    let _ = child.kill();
                    let _ = child.wait();
                }
            }
        }
    }
}

impl Drop for ProcessDriver {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn creds() -> Credentials {
        Credentials {
            username: "u".to_string(),
            password: "p".to_string(),
        }
    }

    fn drain_until(driver: &mut ProcessDriver, want: usize) -> Vec<DriverEvent> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut events = Vec::new();
        while events.len() < want && Instant::now() < deadline {
            match driver.poll() {
                Ok(batch) => events.extend(batch),
                Err(_) => break,
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        events
    }

    #[test]
    fn reads_json_events_from_helper_stdout() {
        let script = r#"echo '{"type":"cookie","name":"sid","value":"abc"}'; \
echo '{"type":"traffic","url":"https://x/api","headers":[{"name":"Authorization","value":"t"}]}'"#;
        let mut driver = ProcessDriver::new(script);
        driver.start(&creds(), true).unwrap();
        let events = drain_until(&mut driver, 2);
        driver.close();

        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], DriverEvent::Cookie { name, value } if name == "sid" && value == "abc"));
        match &events[1] {
            DriverEvent::Traffic(entry) => {
                assert_eq!(entry.url, "https://x/api");
                assert_eq!(entry.header("authorization"), Some("t"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let script = r#"echo 'not json'; echo '{"type":"login_error","message":"nope"}'"#;
        let mut driver = ProcessDriver::new(script);
        driver.start(&creds(), true).unwrap();
        let events = drain_until(&mut driver, 1);
        driver.close();
        assert!(matches!(&events[0], DriverEvent::LoginError(msg) if msg == "nope"));
    }

    #[test]
    fn credentials_are_passed_via_environment() {
        let script = r#"printf '{"type":"cookie","name":"user","value":"%s"}\n' "$AFFSYNC_USERNAME""#;
        let mut driver = ProcessDriver::new(script);
        driver.start(&creds(), true).unwrap();
        let events = drain_until(&mut driver, 1);
        driver.close();
        assert!(matches!(&events[0], DriverEvent::Cookie { value, .. } if value == "u"));
    }

    #[test]
    fn failing_helper_reports_driver_error() {
        let mut driver = ProcessDriver::new("exit 3");
        driver.start(&creds(), true).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        let err = loop {
            match driver.poll() {
                Ok(_) if Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(10))
                }
                Ok(_) => panic!("expected driver error"),
                Err(e) => break e,
            }
        };
        assert!(matches!(err, ExtractError::Driver(_)));
    }

    #[test]
    fn poll_before_start_is_an_error() {
        let mut driver = ProcessDriver::new("true");
        assert!(driver.poll().is_err());
    }
}
