//! TOML configuration parsing and validation.
//!
//! ```toml
//! [db]
//! path = "./data/vlk.sqlite"
//!
//! [sources]
//! fast_feed_url = "https://docs.google.com/spreadsheets/d/<id>/gviz/tq?tqx=out:json"
//! spreadsheet_url = "https://docs.google.com/spreadsheets/d/<id>/export?format=xlsx"
//! timeout_secs = 30
//!
//! [cache]
//! version = "1.0"
//! max_bytes = 5242880
//!
//! [connectivity]
//! mode = "auto"          # auto | online | offline
//! probe_timeout_secs = 3
//!
//! [search]
//! debounce_ms = 200
//! ```
//!
//! Only `[db]` is required. Endpoint URLs left out of the file fall back to
//! the values baked in at compile time through `VLK_FAST_FEED_URL` and
//! `VLK_SPREADSHEET_URL`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Fast-feed URL compiled into the binary, if any.
pub const BUILD_FAST_FEED_URL: Option<&str> = option_env!("VLK_FAST_FEED_URL");
/// Spreadsheet URL compiled into the binary, if any.
pub const BUILD_SPREADSHEET_URL: Option<&str> = option_env!("VLK_SPREADSHEET_URL");

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    #[serde(default)]
    pub fast_feed_url: Option<String>,
    #[serde(default)]
    pub spreadsheet_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            fast_feed_url: None,
            spreadsheet_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SourcesConfig {
    /// Configured fast-feed URL: config file first, then the build-time value.
    pub fn configured_fast_feed(&self) -> Option<String> {
        non_blank(self.fast_feed_url.as_deref()).or_else(|| non_blank(BUILD_FAST_FEED_URL))
    }

    /// Configured spreadsheet URL: config file first, then the build-time value.
    pub fn configured_spreadsheet(&self) -> Option<String> {
        non_blank(self.spreadsheet_url.as_deref()).or_else(|| non_blank(BUILD_SPREADSHEET_URL))
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_version")]
    pub version: String,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            version: default_cache_version(),
            max_bytes: default_max_bytes(),
        }
    }
}

fn default_cache_version() -> String {
    "1.0".to_string()
}
fn default_max_bytes() -> u64 {
    5 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConnectivityConfig {
    #[serde(default = "default_connectivity_mode")]
    pub mode: String,
    #[serde(default)]
    pub probe_url: Option<String>,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            mode: default_connectivity_mode(),
            probe_url: None,
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

fn default_connectivity_mode() -> String {
    "auto".to_string()
}
fn default_probe_timeout_secs() -> u64 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    200
}

impl Config {
    /// A config with every default and the given database path.
    pub fn with_db_path(path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig { path: path.into() },
            sources: SourcesConfig::default(),
            cache: CacheConfig::default(),
            connectivity: ConnectivityConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.cache.version.trim().is_empty() {
        anyhow::bail!("cache.version must not be empty");
    }
    if config.cache.max_bytes == 0 {
        anyhow::bail!("cache.max_bytes must be > 0");
    }
    if config.sources.timeout_secs == 0 {
        anyhow::bail!("sources.timeout_secs must be > 0");
    }

    match config.connectivity.mode.as_str() {
        "auto" | "online" | "offline" => {}
        other => anyhow::bail!(
            "Unknown connectivity mode: '{}'. Must be auto, online, or offline.",
            other
        ),
    }

    for (name, value) in [
        ("sources.fast_feed_url", &config.sources.fast_feed_url),
        ("sources.spreadsheet_url", &config.sources.spreadsheet_url),
        ("connectivity.probe_url", &config.connectivity.probe_url),
    ] {
        if let Some(url) = non_blank(value.as_deref()) {
            let parsed = reqwest::Url::parse(&url)
                .with_context(|| format!("{} is not a valid URL: {}", name, url))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("{} must be an http(s) URL, got '{}'", name, url);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_src)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let cfg = parse("[db]\npath = \"./data/vlk.sqlite\"\n").unwrap();
        assert_eq!(cfg.cache.version, "1.0");
        assert_eq!(cfg.cache.max_bytes, 5 * 1024 * 1024);
        assert_eq!(cfg.connectivity.mode, "auto");
        assert_eq!(cfg.search.debounce_ms, 200);
        assert_eq!(cfg.sources.timeout_secs, 30);
    }

    #[test]
    fn test_blank_url_counts_as_absent() {
        let cfg = parse(
            "[db]\npath = \"x.sqlite\"\n[sources]\nfast_feed_url = \"  \"\nspreadsheet_url = \"https://example.com/x.xlsx\"\n",
        )
        .unwrap();
        assert_eq!(
            cfg.sources.fast_feed_url.as_deref().and_then(|v| non_blank(Some(v))),
            None
        );
        assert_eq!(
            cfg.sources.configured_spreadsheet().as_deref(),
            Some("https://example.com/x.xlsx")
        );
    }

    #[test]
    fn test_rejects_unknown_connectivity_mode() {
        let err = parse("[db]\npath = \"x\"\n[connectivity]\nmode = \"sometimes\"\n").unwrap_err();
        assert!(err.to_string().contains("connectivity mode"));
    }

    #[test]
    fn test_rejects_non_http_urls() {
        assert!(parse("[db]\npath = \"x\"\n[sources]\nfast_feed_url = \"ftp://host/file\"\n").is_err());
        assert!(parse("[db]\npath = \"x\"\n[sources]\nfast_feed_url = \"not a url\"\n").is_err());
    }

    #[test]
    fn test_rejects_zero_quota() {
        assert!(parse("[db]\npath = \"x\"\n[cache]\nmax_bytes = 0\n").is_err());
    }
}
