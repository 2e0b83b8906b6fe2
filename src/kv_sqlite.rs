//! SQLite-backed [`KeyValueStore`].
//!
//! Maps each store operation to statements against the `kv` table:
//!
//! ```sql
//! kv(key TEXT PRIMARY KEY, value TEXT NOT NULL, updated_at INTEGER NOT NULL)
//! ```
//!
//! Multi-key writes and removals run inside one transaction. The configured
//! quota (`cache.max_bytes`) is checked inside that transaction against the
//! bytes already stored plus the incoming values.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;

use vehicle_lookup_core::store::{KeyValueStore, KvError};

use crate::config::Config;
use crate::db;
use crate::migrate;

/// SQLite implementation of [`KeyValueStore`].
pub struct SqliteKv {
    pool: SqlitePool,
    max_bytes: u64,
}

impl SqliteKv {
    pub fn new(pool: SqlitePool, max_bytes: u64) -> Self {
        Self { pool, max_bytes }
    }

    /// Connect to the configured database and make sure the schema exists.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::migrate_pool(&pool).await?;
        Ok(Self::new(pool, config.cache.max_bytes))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn backend(e: sqlx::Error) -> KvError {
    KvError::Backend(e.to_string())
}

#[async_trait]
impl KeyValueStore for SqliteKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        sqlx::query_scalar("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)
    }

    async fn set_many(&self, entries: &[(&str, String)]) -> Result<(), KvError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let current: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(LENGTH(CAST(value AS BLOB))), 0) FROM kv")
                .fetch_one(&mut *tx)
                .await
                .map_err(backend)?;
        let incoming: u64 = entries.iter().map(|(_, v)| v.len() as u64).sum();
        let needed = current.max(0) as u64 + incoming;
        if needed > self.max_bytes {
            // Dropping the transaction rolls it back.
            return Err(KvError::QuotaExceeded {
                needed,
                limit: self.max_bytes,
            });
        }

        let now = chrono::Utc::now().timestamp();
        for (key, value) in entries {
            sqlx::query(
                r#"
                INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                "#,
            )
            .bind(*key)
            .bind(value)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }

        tx.commit().await.map_err(backend)
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<(), KvError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        for key in keys {
            sqlx::query("DELETE FROM kv WHERE key = ?")
                .bind(*key)
                .execute(&mut *tx)
                .await
                .map_err(backend)?;
        }
        tx.commit().await.map_err(backend)
    }

    async fn usage_bytes(&self) -> Result<u64, KvError> {
        let used: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(LENGTH(CAST(value AS BLOB))), 0) FROM kv")
                .fetch_one(&self.pool)
                .await
                .map_err(backend)?;
        Ok(used.max(0) as u64)
    }
}
