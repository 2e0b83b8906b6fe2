//! In-memory [`KeyValueStore`] for tests and embedded targets.
//!
//! Uses a `HashMap` behind `std::sync::RwLock`. An optional byte quota
//! mimics the storage limits of mobile webviews, and the store can be
//! switched to an unavailable state to exercise failure paths.
//!
//! The quota is checked against current usage plus the incoming bytes; a
//! value being replaced still counts until it is removed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use super::{KeyValueStore, KvError};

/// In-memory key-value store.
pub struct MemoryKv {
    entries: RwLock<HashMap<String, String>>,
    quota: Option<u64>,
    unavailable: AtomicBool,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota: None,
            unavailable: AtomicBool::new(false),
        }
    }

    /// A store that refuses writes pushing total value bytes above `bytes`.
    pub fn with_quota(bytes: u64) -> Self {
        Self {
            quota: Some(bytes),
            ..Self::new()
        }
    }

    /// Make every subsequent operation fail with [`KvError::Backend`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Direct read for assertions, bypassing availability checks.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    /// Direct write for seeding fixtures, bypassing quota and availability.
    pub fn insert_raw(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), value.to_string());
        }
    }

    fn check_available(&self) -> Result<(), KvError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(KvError::Backend("store unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryKv {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> KvError {
    KvError::Backend("lock poisoned".to_string())
}

#[async_trait]
impl KeyValueStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        self.check_available()?;
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    async fn set_many(&self, new_entries: &[(&str, String)]) -> Result<(), KvError> {
        self.check_available()?;
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        if let Some(limit) = self.quota {
            let current: u64 = entries.values().map(|v| v.len() as u64).sum();
            let incoming: u64 = new_entries.iter().map(|(_, v)| v.len() as u64).sum();
            let needed = current + incoming;
            if needed > limit {
                return Err(KvError::QuotaExceeded { needed, limit });
            }
        }
        for (k, v) in new_entries {
            entries.insert(k.to_string(), v.clone());
        }
        Ok(())
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<(), KvError> {
        self.check_available()?;
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        for k in keys {
            entries.remove(*k);
        }
        Ok(())
    }

    async fn usage_bytes(&self) -> Result<u64, KvError> {
        self.check_available()?;
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.values().map(|v| v.len() as u64).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let kv = MemoryKv::new();
        kv.set_many(&[("a", "1".to_string()), ("b", "22".to_string())])
            .await
            .unwrap();
        assert_eq!(kv.get("a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(kv.usage_bytes().await.unwrap(), 3);
        kv.remove_many(&["a", "missing"]).await.unwrap();
        assert_eq!(kv.get("a").await.unwrap(), None);
        assert_eq!(kv.get("b").await.unwrap().as_deref(), Some("22"));
    }

    #[tokio::test]
    async fn test_quota_rejects_whole_write() {
        let kv = MemoryKv::with_quota(5);
        kv.set("a", "123".to_string()).await.unwrap();
        let err = kv
            .set_many(&[("b", "1".to_string()), ("c", "12".to_string())])
            .await
            .unwrap_err();
        assert_eq!(err, KvError::QuotaExceeded { needed: 6, limit: 5 });
        assert_eq!(kv.peek("b"), None);
        assert_eq!(kv.peek("c"), None);
    }

    #[tokio::test]
    async fn test_quota_counts_replaced_values_until_removed() {
        let kv = MemoryKv::with_quota(4);
        kv.set("a", "1234".to_string()).await.unwrap();
        assert!(kv.set("a", "abcd".to_string()).await.is_err());
        kv.remove_many(&["a"]).await.unwrap();
        kv.set("a", "abcd".to_string()).await.unwrap();
        assert_eq!(kv.peek("a").as_deref(), Some("abcd"));
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let kv = MemoryKv::new();
        kv.set_unavailable(true);
        assert!(matches!(kv.get("a").await, Err(KvError::Backend(_))));
        assert!(kv.set("a", "1".to_string()).await.is_err());
    }
}
