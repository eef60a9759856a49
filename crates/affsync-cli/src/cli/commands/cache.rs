//! `affsync cache-status` / `affsync clear-cache` – header cache slot tools.

use anyhow::Result;
use chrono::Utc;

use affsync_core::auth::HeaderCache;
use affsync_core::config::AffConfig;

fn open_cache(cfg: &AffConfig) -> Result<HeaderCache> {
    Ok(HeaderCache::new(
        HeaderCache::default_path()?,
        cfg.cache_ttl(),
    ))
}

pub fn run_cache_status(cfg: &AffConfig) -> Result<()> {
    let cache = open_cache(cfg)?;
    println!("slot: {}", cache.path().display());
    match cache.load() {
        Some(set) => {
            let age = set.age(Utc::now());
            println!(
                "fresh: captured {} ({} min old, ttl {}h)",
                set.captured_at.format("%Y-%m-%d %H:%M:%S UTC"),
                age.as_secs() / 60,
                cfg.cache_ttl_hours
            );
        }
        None => println!("empty (missing, stale, or unreadable)"),
    }
    Ok(())
}

pub fn run_clear_cache(cfg: &AffConfig) -> Result<()> {
    let cache = open_cache(cfg)?;
    cache.invalidate()?;
    println!("cleared {}", cache.path().display());
    Ok(())
}
