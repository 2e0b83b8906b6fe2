//! Application wiring and the "ready" boundary.
//!
//! [`App`] assembles storage, resolver, connectivity, sources, and the
//! synchronizer from a [`Config`]. [`App::start`] reports readiness to a
//! [`ReadySignal`] before the first sync runs, so an external collaborator
//! waiting for startup (an updater, a supervisor) is never held up by a slow
//! or failing network.

use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::info;

use vehicle_lookup_core::cache::CacheStore;
use vehicle_lookup_core::store::KeyValueStore;

use crate::config::Config;
use crate::connectivity::ConnectivityMonitor;
use crate::kv_sqlite::SqliteKv;
use crate::resolver::Resolver;
use crate::sources::{http_client, FastFeedSource, SpreadsheetSource};
use crate::sync::{SyncOutcome, Synchronizer, WorkingSetHandle};

/// Receives the "application ready" notification.
pub trait ReadySignal: Send + Sync {
    fn notify_ready(&self);
}

/// Default signal: a log line.
pub struct LogReady;

impl ReadySignal for LogReady {
    fn notify_ready(&self) {
        info!("application ready");
    }
}

pub struct App {
    pub config: Config,
    pub kv: Arc<SqliteKv>,
    pub cache: CacheStore,
    pub resolver: Resolver,
    pub connectivity: Arc<ConnectivityMonitor>,
    pub synchronizer: Arc<Synchronizer>,
}

impl App {
    pub async fn open(config: &Config) -> Result<Self> {
        let kv = Arc::new(SqliteKv::open(config).await?);
        let store: Arc<dyn KeyValueStore> = kv.clone();
        let cache = CacheStore::new(store.clone(), config.cache.version.clone());
        let resolver = Resolver::from_config(store, &config.sources);
        let connectivity = Arc::new(ConnectivityMonitor::from_config(&config.connectivity)?);

        let client = http_client(config)?;
        let synchronizer = Arc::new(Synchronizer::new(
            cache.clone(),
            resolver.clone(),
            connectivity.clone(),
            Arc::new(FastFeedSource::new(client.clone())),
            Arc::new(SpreadsheetSource::new(client)),
        ));

        Ok(Self {
            config: config.clone(),
            kv,
            cache,
            resolver,
            connectivity,
            synchronizer,
        })
    }

    pub fn working_set(&self) -> WorkingSetHandle {
        self.synchronizer.handle()
    }

    /// Signal readiness, then run the first sync in the background.
    pub fn start(&self, ready: &dyn ReadySignal, force_refresh: bool) -> JoinHandle<SyncOutcome> {
        let task = self.spawn_sync(force_refresh);
        ready.notify_ready();
        task
    }

    /// Re-check connectivity, then sync.
    pub async fn sync(&self, force_refresh: bool) -> SyncOutcome {
        refresh_then_sync(
            self.connectivity.clone(),
            self.resolver.clone(),
            self.synchronizer.clone(),
            force_refresh,
        )
        .await
    }

    fn spawn_sync(&self, force_refresh: bool) -> JoinHandle<SyncOutcome> {
        tokio::spawn(refresh_then_sync(
            self.connectivity.clone(),
            self.resolver.clone(),
            self.synchronizer.clone(),
            force_refresh,
        ))
    }

    /// Finish pending background writes and close the database.
    pub async fn close(&self) {
        self.synchronizer.wait_background().await;
        self.kv.close().await;
    }
}

async fn refresh_then_sync(
    connectivity: Arc<ConnectivityMonitor>,
    resolver: Resolver,
    synchronizer: Arc<Synchronizer>,
    force_refresh: bool,
) -> SyncOutcome {
    let endpoints = resolver.resolve().await;
    let targets: Vec<&str> = [&endpoints.fast_feed, &endpoints.spreadsheet]
        .into_iter()
        .filter_map(|r| r.url.as_deref())
        .collect();
    connectivity.refresh(&targets).await;
    synchronizer.sync(force_refresh).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;
    use vehicle_lookup_core::models::{Provenance, Record};

    use crate::sync::SyncError;

    struct Flag(AtomicBool);

    impl ReadySignal for Flag {
        fn notify_ready(&self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    fn offline_config(tmp: &TempDir) -> Config {
        let mut config = Config::with_db_path(tmp.path().join("vlk.sqlite"));
        config.connectivity.mode = "offline".into();
        config
    }

    #[tokio::test]
    async fn test_ready_is_signalled_before_sync_completes() {
        let tmp = TempDir::new().unwrap();
        let app = App::open(&offline_config(&tmp)).await.unwrap();
        let flag = Flag(AtomicBool::new(false));

        let task = app.start(&flag, false);
        assert!(flag.0.load(Ordering::SeqCst));

        let outcome = task.await.unwrap();
        assert_eq!(outcome.error, Some(SyncError::NoCacheNoNetwork));
        app.close().await;
    }

    #[tokio::test]
    async fn test_offline_start_serves_cache() {
        let tmp = TempDir::new().unwrap();
        let app = App::open(&offline_config(&tmp)).await.unwrap();
        let records = vec![Record::from_fields([("Aluno1", "Bia")]).unwrap()];
        assert!(app.cache.save(&records).await.is_saved());

        let outcome = app.start(&LogReady, false).await.unwrap();
        assert_eq!(outcome.source, Some(Provenance::Cache));
        assert_eq!(app.working_set().current().records.as_slice(), records.as_slice());
        app.close().await;
    }
}
