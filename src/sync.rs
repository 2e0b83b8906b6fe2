//! Data synchronizer: cache-first display with background refresh.
//!
//! # Phases
//!
//! 1. **Cache render.** A non-empty cache entry is published at once with
//!    provenance `cache`, before any network activity.
//! 2. **Connectivity gate.** Offline stops here: no error when content is
//!    showing, [`SyncError::NoCacheNoNetwork`] otherwise.
//! 3. **Refresh.** The fast feed is tried first, then the spreadsheet. Any
//!    failure of the first moves on to the second.
//! 4. **Success.** The new records are persisted to the cache, published
//!    with the producing source's provenance, and the endpoint that worked is
//!    remembered in the background.
//! 5. **Failure.** Content already showing stays, without an error.
//!    Otherwise the chain failure is surfaced.
//!
//! The working set is published through a `tokio::sync::watch` channel. The
//! synchronizer owns the only sender; everything else reads through a
//! [`WorkingSetHandle`]. Two overlapping syncs are not serialised: each
//! publishes when it finishes and the later one wins.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use vehicle_lookup_core::cache::{CacheStore, SaveOutcome};
use vehicle_lookup_core::models::{Provenance, Record};

use crate::connectivity::Connectivity;
use crate::resolver::{ResolvedEndpoints, Resolver};
use crate::sources::{RemoteSource, SourceError};

/// User-visible synchronisation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("offline and no cached data is available")]
    NoCacheNoNetwork,

    #[error("could not load data (fast feed: {fast_feed}; spreadsheet: {spreadsheet})")]
    SourceChainExhausted {
        fast_feed: SourceError,
        spreadsheet: SourceError,
    },

    #[error("source returned no data")]
    EmptyResult,

    #[error("fast feed could not be decoded: {0}")]
    MalformedFastFeed(String),

    #[error("could not save data for offline use: {0}")]
    CachePersistenceFailed(String),
}

impl SyncError {
    /// Collapse the two per-source failures into the error shown to the user.
    ///
    /// When the spreadsheet was never configured, the fast feed's own failure
    /// is reported directly for the conditions that have a dedicated variant.
    fn from_chain(fast_feed: SourceError, spreadsheet: SourceError) -> Self {
        match (&fast_feed, &spreadsheet) {
            (SourceError::EmptyResult, SourceError::EmptyResult)
            | (SourceError::EmptyResult, SourceError::NotConfigured(_)) => SyncError::EmptyResult,
            (SourceError::MalformedFastFeed(msg), SourceError::NotConfigured(_)) => {
                SyncError::MalformedFastFeed(msg.clone())
            }
            _ => SyncError::SourceChainExhausted {
                fast_feed,
                spreadsheet,
            },
        }
    }
}

/// A published view of the working set.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    pub records: Arc<Vec<Record>>,
    pub source: Option<Provenance>,
    pub error: Option<SyncError>,
    /// A background refresh is running; content stays visible meanwhile.
    pub refreshing: bool,
}

impl WorkingSet {
    pub fn is_showing_content(&self) -> bool {
        !self.records.is_empty()
    }
}

/// Read-only access to the published working set.
#[derive(Debug, Clone)]
pub struct WorkingSetHandle {
    rx: watch::Receiver<WorkingSet>,
}

impl WorkingSetHandle {
    /// The latest snapshot.
    pub fn current(&self) -> WorkingSet {
        self.rx.borrow().clone()
    }

    /// Wait for the next publication. Returns `false` once the synchronizer
    /// is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// What a single [`Synchronizer::sync`] ended with.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub records: Arc<Vec<Record>>,
    pub source: Option<Provenance>,
    /// Set only when nothing can be shown.
    pub error: Option<SyncError>,
    /// Problems that did not reach the display: a refresh that failed behind
    /// cached content, or a cache write that did not persist.
    pub warnings: Vec<SyncError>,
}

impl SyncOutcome {
    fn from_snapshot(snapshot: &WorkingSet, warnings: Vec<SyncError>) -> Self {
        Self {
            records: snapshot.records.clone(),
            source: snapshot.source,
            error: snapshot.error.clone(),
            warnings,
        }
    }
}

/// Orchestrates cache, connectivity, and the remote fallback chain.
pub struct Synchronizer {
    cache: CacheStore,
    resolver: Resolver,
    connectivity: Arc<dyn Connectivity>,
    fast_feed: Arc<dyn RemoteSource>,
    spreadsheet: Arc<dyn RemoteSource>,
    publisher: watch::Sender<WorkingSet>,
    background: Mutex<Vec<JoinHandle<bool>>>,
}

impl Synchronizer {
    pub fn new(
        cache: CacheStore,
        resolver: Resolver,
        connectivity: Arc<dyn Connectivity>,
        fast_feed: Arc<dyn RemoteSource>,
        spreadsheet: Arc<dyn RemoteSource>,
    ) -> Self {
        let (publisher, _) = watch::channel(WorkingSet::default());
        Self {
            cache,
            resolver,
            connectivity,
            fast_feed,
            spreadsheet,
            publisher,
            background: Mutex::new(Vec::new()),
        }
    }

    pub fn handle(&self) -> WorkingSetHandle {
        WorkingSetHandle {
            rx: self.publisher.subscribe(),
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Run one synchronisation.
    ///
    /// With `force_refresh`, content that is already showing is kept as is
    /// and the cache is not re-read before going to the network.
    pub async fn sync(&self, force_refresh: bool) -> SyncOutcome {
        // Phase 1
        let already_showing = self.publisher.borrow().is_showing_content();
        let content_available = if force_refresh && already_showing {
            debug!("forced refresh over visible content; skipping cache render");
            true
        } else {
            self.render_cache().await || already_showing
        };

        // Phase 2
        if !self.connectivity.is_online() {
            if content_available {
                info!("offline; keeping cached content");
                return SyncOutcome::from_snapshot(&self.publisher.borrow(), Vec::new());
            }
            warn!("offline with no cached data");
            self.publish(WorkingSet {
                error: Some(SyncError::NoCacheNoNetwork),
                ..WorkingSet::default()
            });
            return SyncOutcome::from_snapshot(&self.publisher.borrow(), Vec::new());
        }

        // Phase 3
        self.publisher.send_modify(|ws| ws.refreshing = true);
        let endpoints = self.resolver.resolve().await;
        let result = self.fetch_chain(&endpoints).await;

        match result {
            // Phase 4
            Ok((source, url, records)) => {
                let mut warnings = Vec::new();
                if let SaveOutcome::Failed(reason) = self.cache.save(&records).await {
                    warn!(reason = %reason, "fresh data not persisted");
                    warnings.push(SyncError::CachePersistenceFailed(reason));
                }
                let provenance = source.provenance();
                info!(source = %provenance, count = records.len(), "working set refreshed");
                self.publish(WorkingSet {
                    records: Arc::new(records),
                    source: Some(provenance),
                    error: None,
                    refreshing: false,
                });
                let task = self.resolver.remember_in_background(source.endpoint(), url);
                self.track(task);
                SyncOutcome::from_snapshot(&self.publisher.borrow(), warnings)
            }
            // Phase 5
            Err(err) => {
                if content_available {
                    warn!(error = %err, "refresh failed; keeping current content");
                    self.publisher.send_modify(|ws| ws.refreshing = false);
                    SyncOutcome::from_snapshot(&self.publisher.borrow(), vec![err])
                } else {
                    warn!(error = %err, "could not load data");
                    self.publish(WorkingSet {
                        error: Some(err),
                        ..WorkingSet::default()
                    });
                    SyncOutcome::from_snapshot(&self.publisher.borrow(), Vec::new())
                }
            }
        }
    }

    /// Publish the cache entry if there is a non-empty one.
    async fn render_cache(&self) -> bool {
        match self.cache.load().await {
            Some(entry) if !entry.records.is_empty() => {
                info!(count = entry.records.len(), captured_at = %entry.captured_at, "showing cached data");
                self.publish(WorkingSet {
                    records: Arc::new(entry.records),
                    source: Some(Provenance::Cache),
                    error: None,
                    refreshing: false,
                });
                true
            }
            _ => {
                debug!("no usable cache entry");
                false
            }
        }
    }

    async fn fetch_chain(
        &self,
        endpoints: &ResolvedEndpoints,
    ) -> Result<(&Arc<dyn RemoteSource>, String, Vec<Record>), SyncError> {
        let fast_feed_err = match self.attempt(&self.fast_feed, endpoints).await {
            Ok((url, records)) => return Ok((&self.fast_feed, url, records)),
            Err(e) => e,
        };
        warn!(error = %fast_feed_err, "fast feed failed; trying spreadsheet");

        match self.attempt(&self.spreadsheet, endpoints).await {
            Ok((url, records)) => Ok((&self.spreadsheet, url, records)),
            Err(spreadsheet_err) => {
                warn!(error = %spreadsheet_err, "spreadsheet failed");
                Err(SyncError::from_chain(fast_feed_err, spreadsheet_err))
            }
        }
    }

    async fn attempt(
        &self,
        source: &Arc<dyn RemoteSource>,
        endpoints: &ResolvedEndpoints,
    ) -> Result<(String, Vec<Record>), SourceError> {
        let endpoint = source.endpoint();
        let url = endpoints
            .url(endpoint)
            .ok_or(SourceError::NotConfigured(endpoint))?;
        debug!(%endpoint, "fetching");
        let records = source.fetch(url).await?;
        if records.is_empty() {
            return Err(SourceError::EmptyResult);
        }
        Ok((url.to_string(), records))
    }

    fn track(&self, task: JoinHandle<bool>) {
        if let Ok(mut tasks) = self.background.lock() {
            tasks.retain(|t| !t.is_finished());
            tasks.push(task);
        }
    }

    /// Wait for background writes started by earlier syncs.
    pub async fn wait_background(&self) {
        let tasks = match self.background.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(_) => return,
        };
        for task in tasks {
            let _ = task.await;
        }
    }

    fn publish(&self, snapshot: WorkingSet) {
        self.publisher.send_replace(snapshot);
    }
}
