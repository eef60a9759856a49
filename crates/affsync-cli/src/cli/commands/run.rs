//! `affsync run` – one full resolve/fetch/parse/download pass.

use anyhow::Result;
use chrono::{Duration as ChronoDuration, Utc};
use std::path::PathBuf;

use affsync_core::auth::extract::ProcessDriver;
use affsync_core::auth::{AuthResolver, Credentials, HeaderCache, SessionExtractor};
use affsync_core::config::AffConfig;
use affsync_core::download::DownloadManager;
use affsync_core::error::RunError;
use affsync_core::report::{FetchError, ReportQuery};
use affsync_core::retry::RetryPolicy;
use affsync_core::run::Pipeline;

pub struct RunArgs {
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth_token: Option<String>,
    pub force_refresh: bool,
    pub download_dir: Option<PathBuf>,
    pub days: u32,
    pub no_headless: bool,
}

pub fn run_pass(cfg: &AffConfig, args: RunArgs) -> Result<()> {
    let policy = cfg
        .retry
        .as_ref()
        .map(RetryPolicy::from_config)
        .unwrap_or_default();

    let cache = HeaderCache::new(HeaderCache::default_path()?, cfg.cache_ttl());
    let mut resolver =
        AuthResolver::new(cache, cfg.extract_timeout()).with_manual_token(args.auth_token);

    if let (Some(command), Some(username), Some(password)) =
        (cfg.browser_command.as_deref(), args.username, args.password)
    {
        let extractor = SessionExtractor::new(ProcessDriver::new(command), cfg.api_path())
            .poll_interval(cfg.poll_interval())
            .headless(cfg.headless && !args.no_headless);
        resolver = resolver.with_extractor(extractor, Credentials { username, password });
    }

    let download_dir = args
        .download_dir
        .unwrap_or_else(|| cfg.download_dir.clone());
    let downloads = DownloadManager::new(download_dir, cfg.request_timeout(), policy)?;

    let mut pipeline = Pipeline {
        resolver,
        downloads,
        api_url: cfg.api_url.clone(),
        conversion_base_url: cfg.conversion_base_url.clone(),
        request_timeout: cfg.request_timeout(),
        retry: policy,
    };

    let query = query_for_days(args.days);
    tracing::info!("fetching orders {} .. {}", query.begin_date, query.end_date);

    let summary = pipeline
        .run(&query, args.force_refresh)
        .map_err(|e| anyhow::anyhow!("{}. Hint: {}", e, remediation(&e)))?;

    println!("{}", summary);
    for (order_no, reason) in &summary.failures {
        println!("  failed {}: {}", order_no, reason);
    }
    Ok(())
}

/// Window from N days back through tomorrow, so today's orders are always
/// inside the (inclusive) server-side range.
fn query_for_days(days: u32) -> ReportQuery {
    let now = Utc::now();
    let begin = now - ChronoDuration::days(days as i64);
    let end = now + ChronoDuration::days(1);
    ReportQuery::for_range(
        begin.format("%Y-%m-%d").to_string(),
        end.format("%Y-%m-%d").to_string(),
    )
}

fn remediation(err: &RunError) -> &'static str {
    match err {
        RunError::Auth(_) => {
            "supply --auth-token, configure browser_command with --username/--password, \
             or run `affsync import-traffic`"
        }
        RunError::Fetch(FetchError::AuthRejected(_)) => {
            "the server rejected the headers twice; capture a fresh session with \
             `affsync import-traffic` or a new --auth-token"
        }
        RunError::Fetch(_) => "check connectivity and the api_url config value",
        RunError::Parse(_) => "the export format may have changed; see the log for the response",
    }
}
