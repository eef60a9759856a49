//! CLI for the affsync order-report fetcher.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use affsync_core::config;

use commands::{run_cache_status, run_clear_cache, run_import_traffic, run_pass, RunArgs};

/// Top-level CLI for the affsync order-report fetcher.
#[derive(Debug, Parser)]
#[command(name = "affsync")]
#[command(about = "affsync: affiliate order report fetcher and file downloader", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Resolve auth headers, fetch the order report, download new files.
    Run {
        /// Portal login name (needed only when extraction has to run).
        #[arg(long, env = "AFFSYNC_USERNAME")]
        username: Option<String>,

        /// Portal password.
        #[arg(long, env = "AFFSYNC_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Pre-captured Authorization header value; skips cache and browser.
        #[arg(long, env = "AFFSYNC_AUTH_TOKEN", hide_env_values = true)]
        auth_token: Option<String>,

        /// Re-extract even if the cached headers are still fresh.
        #[arg(long)]
        force_refresh: bool,

        /// Where downloaded files land (overrides the config value).
        #[arg(long, value_name = "DIR")]
        download_dir: Option<PathBuf>,

        /// Report window: the last N days through tomorrow.
        #[arg(long, default_value = "7", value_name = "N")]
        days: u32,

        /// Show the browser window during extraction.
        #[arg(long)]
        no_headless: bool,
    },

    /// Cache a header set from a captured browser-traffic JSON file.
    ImportTraffic {
        /// Path to the capture (JSON array of {url, headers} requests).
        path: String,
    },

    /// Show the header cache slot and its freshness.
    CacheStatus,

    /// Clear the header cache slot.
    ClearCache,
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run {
                username,
                password,
                auth_token,
                force_refresh,
                download_dir,
                days,
                no_headless,
            } => run_pass(
                &cfg,
                RunArgs {
                    username,
                    password,
                    auth_token,
                    force_refresh,
                    download_dir,
                    days,
                    no_headless,
                },
            )?,
            CliCommand::ImportTraffic { path } => run_import_traffic(&cfg, Path::new(&path))?,
            CliCommand::CacheStatus => run_cache_status(&cfg)?,
            CliCommand::ClearCache => run_clear_cache(&cfg)?,
        }

        Ok(())
    }
}
