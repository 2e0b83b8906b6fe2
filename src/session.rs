//! Search query state with a debounced text input.
//!
//! Raw query text goes through a debounce task: the search input only
//! updates once the text has been stable for the configured delay. Mode and
//! strictness changes apply immediately.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;

use vehicle_lookup_core::models::Record;
use vehicle_lookup_core::search::{self, SearchMode, Strictness};

use crate::sync::WorkingSetHandle;

pub struct SearchSession {
    working_set: WorkingSetHandle,
    raw: watch::Sender<String>,
    debounced: watch::Receiver<String>,
    mode: SearchMode,
    strictness: Strictness,
}

impl SearchSession {
    /// Start a session over `working_set`. Must be called inside a tokio
    /// runtime; the debounce task ends when the session is dropped.
    pub fn new(working_set: WorkingSetHandle, debounce: Duration) -> Self {
        let (raw, raw_rx) = watch::channel(String::new());
        let (debounced_tx, debounced) = watch::channel(String::new());
        tokio::spawn(debounce_task(raw_rx, debounced_tx, debounce));
        Self {
            working_set,
            raw,
            debounced,
            mode: SearchMode::default(),
            strictness: Strictness::default(),
        }
    }

    /// Update the raw query text.
    pub fn set_query(&self, text: impl Into<String>) {
        self.raw.send_replace(text.into());
    }

    pub fn set_mode(&mut self, mode: SearchMode) {
        self.mode = mode;
    }

    pub fn set_strictness(&mut self, strictness: Strictness) {
        self.strictness = strictness;
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    /// The raw text as last typed.
    pub fn raw_query(&self) -> String {
        self.raw.borrow().clone()
    }

    /// The text the search engine currently sees.
    pub fn query(&self) -> String {
        self.debounced.borrow().clone()
    }

    /// Wait until the debounced text is updated again.
    pub async fn settled(&mut self) -> String {
        // The debounce task outlives every borrow of the session.
        let _ = self.debounced.changed().await;
        self.debounced.borrow_and_update().clone()
    }

    /// Matching records from the latest working set, in source order.
    pub fn results(&self) -> Vec<Record> {
        let snapshot = self.working_set.current();
        let query = self.query();
        search::filter(&snapshot.records, &query, self.mode, self.strictness)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn working_set(&self) -> &WorkingSetHandle {
        &self.working_set
    }
}

async fn debounce_task(
    mut raw: watch::Receiver<String>,
    debounced: watch::Sender<String>,
    delay: Duration,
) {
    while raw.changed().await.is_ok() {
        // Restart the delay on every keystroke.
        loop {
            tokio::select! {
                _ = sleep(delay) => break,
                changed = raw.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }
        let text = raw.borrow_and_update().clone();
        debounced.send_replace(text);
    }
}
