//! `affsync import-traffic <path>` – cache headers from a captured traffic file.

use anyhow::Result;
use std::path::Path;

use affsync_core::auth::extract::traffic;
use affsync_core::auth::HeaderCache;
use affsync_core::config::AffConfig;

pub fn run_import_traffic(cfg: &AffConfig, path: &Path) -> Result<()> {
    let set = traffic::import_traffic_file(path, &cfg.api_path())?;
    let cache = HeaderCache::new(HeaderCache::default_path()?, cfg.cache_ttl());
    cache.save(&set)?;
    println!(
        "Cached headers from {} ({} cookies) into {}",
        path.display(),
        set.cookies.len(),
        cache.path().display()
    );
    Ok(())
}
