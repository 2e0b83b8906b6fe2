//! Device-local key-value persistence.
//!
//! The [`KeyValueStore`] trait is the only storage seam the cache and the
//! endpoint resolver depend on, so backends are pluggable (SQLite on
//! desktop, in-memory for tests and embedded targets).
//!
//! Multi-key writes and removals are atomic: either every entry is applied
//! or none is. Backends that enforce a size quota report
//! [`KvError::QuotaExceeded`] without writing anything. Quotas count current
//! usage plus incoming bytes, so replacing a large value may need the old one
//! removed first.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by a [`KeyValueStore`] backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KvError {
    #[error("storage quota exceeded: {needed} bytes needed, {limit} allowed")]
    QuotaExceeded { needed: u64, limit: u64 },

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Abstract string key-value storage.
///
/// All operations are async (via `async-trait`) so both SQLite and
/// in-memory backends fit behind the same interface.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value. `Ok(None)` when the key is not present.
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Write all entries in one atomic step.
    async fn set_many(&self, entries: &[(&str, String)]) -> Result<(), KvError>;

    /// Remove all keys in one atomic step. Missing keys are ignored.
    async fn remove_many(&self, keys: &[&str]) -> Result<(), KvError>;

    /// Total bytes of stored values.
    async fn usage_bytes(&self) -> Result<u64, KvError>;

    async fn set(&self, key: &str, value: String) -> Result<(), KvError> {
        self.set_many(&[(key, value)]).await
    }
}
