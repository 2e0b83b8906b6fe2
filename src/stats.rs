//! Cache introspection for `vlk cache info` and `vlk cache clear`.

use anyhow::Result;

use vehicle_lookup_core::cache::{CacheInfo, CacheStore};
use vehicle_lookup_core::store::KeyValueStore;

use crate::config::Config;

/// Print what the cache holds without modifying it.
pub async fn run_cache_info(config: &Config, cache: &CacheStore, kv: &dyn KeyValueStore) -> Result<()> {
    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);
    let used = kv.usage_bytes().await.unwrap_or(0);

    println!("Vehicle Lookup: Cache");
    println!("=====================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  File size:   {}", format_bytes(db_size));
    println!(
        "  Quota:       {} / {}",
        format_bytes(used),
        format_bytes(config.cache.max_bytes)
    );
    println!("  Expected:    version {}", cache.version());
    println!();

    match cache.info().await {
        CacheInfo::Present {
            count,
            size_in_bytes,
            captured_at,
            version,
        } => {
            println!("  Records:     {}", count);
            println!("  Payload:     {}", format_bytes(size_in_bytes));
            println!(
                "  Captured:    {}",
                captured_at
                    .map(|ts| format_ts_relative(ts.timestamp()))
                    .unwrap_or_else(|| "unknown".to_string())
            );
            let version = version.unwrap_or_else(|| "unknown".to_string());
            if version == cache.version() {
                println!("  Version:     {}", version);
            } else {
                println!("  Version:     {} (stale; cleared on next load)", version);
            }
        }
        CacheInfo::Missing => {
            println!("  No cached data.");
        }
    }
    println!();
    Ok(())
}

pub async fn run_cache_clear(cache: &CacheStore) -> Result<()> {
    if cache.clear().await {
        println!("Cache cleared.");
        Ok(())
    } else {
        anyhow::bail!("Could not clear the cache")
    }
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
