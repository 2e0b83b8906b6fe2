//! Versioned cache of the last successfully synchronised record set.
//!
//! Three co-located entries make up the cache: the serialised payload, the
//! capture timestamp (epoch milliseconds), and the version tag of the build
//! that wrote it. They are written and removed together.
//!
//! Every operation is best-effort. Callers get sentinels
//! (`None`, [`SaveOutcome::Failed`], [`CacheInfo::Missing`]) and never an
//! error.
//!
//! # Invalidation
//!
//! An entry whose version tag differs from the running build's expected
//! version, or whose payload no longer deserialises, is cleared on load and
//! reported as absent. This keeps a schema change between releases from
//! resurrecting an incompatible payload.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::models::{CacheEntry, Record};
use crate::store::{KeyValueStore, KvError};

pub const DATA_KEY: &str = "records_cache_data";
pub const TIMESTAMP_KEY: &str = "records_cache_timestamp";
pub const VERSION_KEY: &str = "records_cache_version";

const CACHE_KEYS: [&str; 3] = [DATA_KEY, TIMESTAMP_KEY, VERSION_KEY];

/// Result of [`CacheStore::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Failed(String),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved)
    }
}

/// Read-only description of what the cache currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheInfo {
    Present {
        count: usize,
        size_in_bytes: u64,
        captured_at: Option<DateTime<Utc>>,
        version: Option<String>,
    },
    Missing,
}

/// The record cache, layered over any [`KeyValueStore`].
#[derive(Clone)]
pub struct CacheStore {
    kv: Arc<dyn KeyValueStore>,
    version: String,
}

impl CacheStore {
    /// `version` is the tag this build writes and expects to read back.
    pub fn new(kv: Arc<dyn KeyValueStore>, version: impl Into<String>) -> Self {
        Self {
            kv,
            version: version.into(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Persist `records` with the current version tag and a fresh timestamp.
    ///
    /// On quota exhaustion the cache entries are cleared once and the write
    /// retried once. If the retry fails too, the cache is left empty.
    pub async fn save(&self, records: &[Record]) -> SaveOutcome {
        let payload = match serde_json::to_string(records) {
            Ok(p) => p,
            Err(e) => return SaveOutcome::Failed(format!("serialize: {}", e)),
        };

        match self.write(&payload).await {
            Ok(()) => {
                tracing::debug!(count = records.len(), bytes = payload.len(), "cache saved");
                SaveOutcome::Saved
            }
            Err(KvError::QuotaExceeded { needed, limit }) => {
                tracing::warn!(needed, limit, "cache quota exceeded, clearing and retrying");
                self.clear().await;
                match self.write(&payload).await {
                    Ok(()) => SaveOutcome::Saved,
                    Err(e) => {
                        tracing::warn!(error = %e, "cache write failed after clearing");
                        self.clear().await;
                        SaveOutcome::Failed(e.to_string())
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "cache write failed");
                SaveOutcome::Failed(e.to_string())
            }
        }
    }

    /// Load the cached entry, or `None` when missing, stale, or corrupt.
    ///
    /// Stale and corrupt entries are cleared as a side effect. A backend read
    /// error reports `None` and clears nothing.
    pub async fn load(&self) -> Option<CacheEntry> {
        let payload = match self.kv.get(DATA_KEY).await {
            Ok(Some(p)) => p,
            Ok(None) => {
                tracing::debug!("no cached records");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cache read failed");
                return None;
            }
        };

        // A failed read says nothing about the entry; leave it in place.
        let version = match self.kv.get(VERSION_KEY).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "cache version read failed");
                return None;
            }
        };
        if version.as_deref() != Some(self.version.as_str()) {
            tracing::info!(
                found = version.as_deref().unwrap_or("<none>"),
                expected = %self.version,
                "cache version mismatch, clearing"
            );
            self.clear().await;
            return None;
        }

        let captured_at = match self.kv.get(TIMESTAMP_KEY).await {
            Ok(ts) => ts.and_then(|ts| parse_millis(&ts)),
            Err(e) => {
                tracing::warn!(error = %e, "cache timestamp read failed");
                return None;
            }
        };

        let records = match serde_json::from_str::<Vec<Record>>(&payload) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "cached payload is corrupt, clearing");
                self.clear().await;
                return None;
            }
        };
        let Some(captured_at) = captured_at else {
            tracing::warn!("cached timestamp is missing or invalid, clearing");
            self.clear().await;
            return None;
        };

        tracing::debug!(count = records.len(), "cached records loaded");
        Some(CacheEntry {
            records,
            version: self.version.clone(),
            captured_at,
        })
    }

    /// Describe the cache without modifying it.
    pub async fn info(&self) -> CacheInfo {
        let payload = match self.kv.get(DATA_KEY).await {
            Ok(Some(p)) => p,
            _ => return CacheInfo::Missing,
        };
        let count = match serde_json::from_str::<Vec<serde_json::Value>>(&payload) {
            Ok(items) => items.len(),
            Err(_) => return CacheInfo::Missing,
        };
        let captured_at = self
            .kv
            .get(TIMESTAMP_KEY)
            .await
            .ok()
            .flatten()
            .and_then(|ts| parse_millis(&ts));
        let version = self.kv.get(VERSION_KEY).await.ok().flatten();
        CacheInfo::Present {
            count,
            size_in_bytes: payload.len() as u64,
            captured_at,
            version,
        }
    }

    /// Remove payload, timestamp, and version tag together.
    pub async fn clear(&self) -> bool {
        match self.kv.remove_many(&CACHE_KEYS).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "cache clear failed");
                false
            }
        }
    }

    async fn write(&self, payload: &str) -> Result<(), KvError> {
        let now = Utc::now().timestamp_millis().to_string();
        self.kv
            .set_many(&[
                (DATA_KEY, payload.to_string()),
                (TIMESTAMP_KEY, now),
                (VERSION_KEY, self.version.clone()),
            ])
            .await
    }
}

fn parse_millis(raw: &str) -> Option<DateTime<Utc>> {
    let ms: i64 = raw.trim().parse().ok()?;
    Utc.timestamp_millis_opt(ms).single()
}
