//! Remote endpoint resolution.
//!
//! Each endpoint resolves independently:
//!
//! 1. the configured URL (config file, then the compile-time value);
//! 2. an override learned from an earlier successful fetch;
//! 3. absent.
//!
//! Overrides are written only after a fetch through that endpoint succeeds,
//! so a later session without configuration can still reach the sources it
//! used before. Reading overrides never fails resolution: a storage error
//! reads as "no override".

use std::fmt;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use vehicle_lookup_core::store::KeyValueStore;

use crate::config::SourcesConfig;

pub const FAST_FEED_OVERRIDE_KEY: &str = "config_fast_feed_url";
pub const SPREADSHEET_OVERRIDE_KEY: &str = "config_spreadsheet_url";

/// One of the two remote endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    FastFeed,
    Spreadsheet,
}

impl Endpoint {
    pub fn override_key(&self) -> &'static str {
        match self {
            Endpoint::FastFeed => FAST_FEED_OVERRIDE_KEY,
            Endpoint::Spreadsheet => SPREADSHEET_OVERRIDE_KEY,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::FastFeed => write!(f, "fast-feed"),
            Endpoint::Spreadsheet => write!(f, "spreadsheet"),
        }
    }
}

/// Where a resolved URL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Configured,
    Override,
    Absent,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Configured => write!(f, "configured"),
            Origin::Override => write!(f, "learned"),
            Origin::Absent => write!(f, "absent"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    pub url: Option<String>,
    pub origin: Origin,
}

impl ResolvedUrl {
    fn absent() -> Self {
        Self {
            url: None,
            origin: Origin::Absent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoints {
    pub fast_feed: ResolvedUrl,
    pub spreadsheet: ResolvedUrl,
}

impl ResolvedEndpoints {
    pub fn get(&self, endpoint: Endpoint) -> &ResolvedUrl {
        match endpoint {
            Endpoint::FastFeed => &self.fast_feed,
            Endpoint::Spreadsheet => &self.spreadsheet,
        }
    }

    pub fn url(&self, endpoint: Endpoint) -> Option<&str> {
        self.get(endpoint).url.as_deref()
    }
}

/// Resolves endpoint URLs and remembers the ones that worked.
#[derive(Clone)]
pub struct Resolver {
    kv: Arc<dyn KeyValueStore>,
    fast_feed: Option<String>,
    spreadsheet: Option<String>,
}

impl Resolver {
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        fast_feed: Option<String>,
        spreadsheet: Option<String>,
    ) -> Self {
        Self {
            kv,
            fast_feed,
            spreadsheet,
        }
    }

    pub fn from_config(kv: Arc<dyn KeyValueStore>, sources: &SourcesConfig) -> Self {
        Self::new(
            kv,
            sources.configured_fast_feed(),
            sources.configured_spreadsheet(),
        )
    }

    fn configured(&self, endpoint: Endpoint) -> Option<&str> {
        match endpoint {
            Endpoint::FastFeed => self.fast_feed.as_deref(),
            Endpoint::Spreadsheet => self.spreadsheet.as_deref(),
        }
    }

    pub async fn resolve(&self) -> ResolvedEndpoints {
        ResolvedEndpoints {
            fast_feed: self.resolve_one(Endpoint::FastFeed).await,
            spreadsheet: self.resolve_one(Endpoint::Spreadsheet).await,
        }
    }

    async fn resolve_one(&self, endpoint: Endpoint) -> ResolvedUrl {
        if let Some(url) = self.configured(endpoint) {
            debug!(%endpoint, "using configured endpoint");
            return ResolvedUrl {
                url: Some(url.to_string()),
                origin: Origin::Configured,
            };
        }

        match self.stored_override(endpoint).await {
            Some(url) => {
                debug!(%endpoint, "using learned endpoint");
                ResolvedUrl {
                    url: Some(url),
                    origin: Origin::Override,
                }
            }
            None => {
                warn!(%endpoint, "endpoint not configured and nothing learned");
                ResolvedUrl::absent()
            }
        }
    }

    async fn stored_override(&self, endpoint: Endpoint) -> Option<String> {
        match self.kv.get(endpoint.override_key()).await {
            Ok(value) => value.filter(|v| !v.trim().is_empty()),
            Err(e) => {
                warn!(%endpoint, error = %e, "could not read learned endpoint");
                None
            }
        }
    }

    /// Persist `url` as the learned override for `endpoint`.
    ///
    /// Returns whether the override now holds `url`. Failures are logged.
    pub async fn remember(&self, endpoint: Endpoint, url: &str) -> bool {
        if self.stored_override(endpoint).await.as_deref() == Some(url) {
            return true;
        }
        match self.kv.set(endpoint.override_key(), url.to_string()).await {
            Ok(()) => {
                info!(%endpoint, "remembered endpoint for later sessions");
                true
            }
            Err(e) => {
                warn!(%endpoint, error = %e, "could not remember endpoint");
                false
            }
        }
    }

    /// [`Resolver::remember`] on a background task.
    pub fn remember_in_background(&self, endpoint: Endpoint, url: String) -> JoinHandle<bool> {
        let resolver = self.clone();
        tokio::spawn(async move { resolver.remember(endpoint, &url).await })
    }

    /// Remove both learned overrides.
    pub async fn forget(&self) -> bool {
        self.kv
            .remove_many(&[FAST_FEED_OVERRIDE_KEY, SPREADSHEET_OVERRIDE_KEY])
            .await
            .is_ok()
    }
}
