use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per request (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 1.0,
            max_delay_secs: 30,
        }
    }
}

/// Global configuration loaded from `~/.config/affsync/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffConfig {
    /// Order-export API endpoint (authenticated POST).
    pub api_url: String,
    /// Base URL for per-order conversion links (the downloadable file URLs).
    pub conversion_base_url: String,
    /// Directory where downloaded files land.
    pub download_dir: PathBuf,
    /// Hours a cached header set stays fresh. The server-side token lifetime
    /// is undocumented, so this stays configurable rather than hard-coded.
    pub cache_ttl_hours: u64,
    /// Per-request timeout in seconds (report POST and file GETs).
    pub request_timeout_secs: u64,
    /// Bound on how long extraction waits for the authenticated API call to
    /// show up in the observed network traffic.
    pub extract_timeout_secs: u64,
    /// How often the extractor polls the driver for new traffic, in millis.
    pub poll_interval_ms: u64,
    /// Run the browser driver headless.
    pub headless: bool,
    /// External browser-automation command for login-driven extraction.
    /// It receives credentials via environment and must emit driver events
    /// as JSON lines on stdout. None = extraction unavailable (use a manual
    /// token or `import-traffic`).
    #[serde(default)]
    pub browser_command: Option<String>,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for AffConfig {
    fn default() -> Self {
        Self {
            api_url: "https://aff.dhgate.com/api/affiliate/order/exportOrders".to_string(),
            conversion_base_url: "https://izeeto.com/conv".to_string(),
            download_dir: PathBuf::from("./downloads"),
            cache_ttl_hours: 24,
            request_timeout_secs: 30,
            extract_timeout_secs: 30,
            poll_interval_ms: 500,
            headless: true,
            browser_command: None,
            retry: None,
        }
    }
}

impl AffConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_hours * 3600)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn extract_timeout(&self) -> Duration {
        Duration::from_secs(self.extract_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Path component of `api_url`, used to spot the authenticated API call
    /// in captured browser traffic.
    pub fn api_path(&self) -> String {
        url::Url::parse(&self.api_url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| self.api_url.clone())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("affsync")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<AffConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = AffConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: AffConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = AffConfig::default();
        assert_eq!(cfg.cache_ttl_hours, 24);
        assert_eq!(cfg.request_timeout_secs, 30);
        assert_eq!(cfg.extract_timeout_secs, 30);
        assert!(cfg.headless);
        assert!(cfg.browser_command.is_none());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = AffConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: AffConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.api_url, cfg.api_url);
        assert_eq!(parsed.cache_ttl_hours, cfg.cache_ttl_hours);
        assert_eq!(parsed.download_dir, cfg.download_dir);
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            api_url = "https://portal.example.com/api/export"
            conversion_base_url = "https://links.example.com/conv"
            download_dir = "/srv/orders"
            cache_ttl_hours = 6
            request_timeout_secs = 10
            extract_timeout_secs = 60
            poll_interval_ms = 250
            headless = false
        "#;
        let cfg: AffConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.cache_ttl_hours, 6);
        assert_eq!(cfg.cache_ttl(), Duration::from_secs(6 * 3600));
        assert!(!cfg.headless);
        assert!(cfg.retry.is_none());
    }

    #[test]
    fn api_path_is_the_url_path_component() {
        let cfg = AffConfig::default();
        assert_eq!(cfg.api_path(), "/api/affiliate/order/exportOrders");
    }

    #[test]
    fn config_toml_retry_section() {
        let toml = r#"
            api_url = "https://portal.example.com/api/export"
            conversion_base_url = "https://links.example.com/conv"
            download_dir = "./downloads"
            cache_ttl_hours = 24
            request_timeout_secs = 30
            extract_timeout_secs = 30
            poll_interval_ms = 500
            headless = true

            [retry]
            max_attempts = 5
            base_delay_secs = 0.5
            max_delay_secs = 15
        "#;
        let cfg: AffConfig = toml::from_str(toml).unwrap();
        let retry = cfg.retry.as_ref().unwrap();
        assert_eq!(retry.max_attempts, 5);
        assert!((retry.base_delay_secs - 0.5).abs() < 1e-9);
        assert_eq!(retry.max_delay_secs, 15);
    }
}
