//! Online/offline status.
//!
//! The status is readable synchronously and observable through a
//! `tokio::sync::watch` channel of transitions. Nothing re-syncs on a
//! transition; a refresh has to be triggered explicitly.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::ConnectivityConfig;

/// Source of the online/offline signal.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
    fn subscribe(&self) -> watch::Receiver<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityMode {
    /// Probe the network.
    Auto,
    /// Always report online.
    Online,
    /// Always report offline.
    Offline,
}

impl FromStr for ConnectivityMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(ConnectivityMode::Auto),
            "online" => Ok(ConnectivityMode::Online),
            "offline" => Ok(ConnectivityMode::Offline),
            other => anyhow::bail!("Unknown connectivity mode: '{}'", other),
        }
    }
}

/// Connectivity backed by an HTTP probe, or pinned to a fixed state.
pub struct ConnectivityMonitor {
    mode: ConnectivityMode,
    probe_url: Option<String>,
    client: reqwest::Client,
    state: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    pub fn new(
        mode: ConnectivityMode,
        probe_url: Option<String>,
        probe_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(probe_timeout).build()?;
        let initial = mode != ConnectivityMode::Offline;
        let (state, _) = watch::channel(initial);
        Ok(Self {
            mode,
            probe_url,
            client,
            state,
        })
    }

    pub fn from_config(config: &ConnectivityConfig) -> Result<Self> {
        Self::new(
            config.mode.parse()?,
            config.probe_url.clone(),
            Duration::from_secs(config.probe_timeout_secs),
        )
    }

    /// A monitor pinned to `online`, with no probing.
    pub fn fixed(online: bool) -> Self {
        let mode = if online {
            ConnectivityMode::Online
        } else {
            ConnectivityMode::Offline
        };
        let (state, _) = watch::channel(online);
        Self {
            mode,
            probe_url: None,
            client: reqwest::Client::new(),
            state,
        }
    }

    pub fn mode(&self) -> ConnectivityMode {
        self.mode
    }

    /// Re-evaluate the status and publish it.
    ///
    /// In `auto` mode the configured probe URL is used. Without one, each of
    /// `endpoints` (normally the resolved source URLs) is tried in turn and
    /// the device is online as soon as one answers. Any HTTP response counts
    /// as online; only a transport failure counts as offline. With no URLs at
    /// all the device is assumed online.
    pub async fn refresh(&self, endpoints: &[&str]) -> bool {
        let online = match self.mode {
            ConnectivityMode::Online => true,
            ConnectivityMode::Offline => false,
            ConnectivityMode::Auto => match self.probe_url.as_deref() {
                Some(url) => self.probe(url).await,
                None => self.reach_any(endpoints).await,
            },
        };
        self.set_online(online);
        online
    }

    async fn reach_any(&self, endpoints: &[&str]) -> bool {
        if endpoints.is_empty() {
            return true;
        }
        for url in endpoints {
            if self.probe(url).await {
                return true;
            }
        }
        false
    }

    async fn probe(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(resp) => {
                debug!(status = resp.status().as_u16(), "connectivity probe answered");
                true
            }
            Err(e) => {
                debug!(error = %e, "connectivity probe failed");
                false
            }
        }
    }

    /// Publish a new status; subscribers see only actual transitions.
    pub fn set_online(&self, online: bool) {
        let changed = self.state.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            info!(online, "connectivity changed");
        }
    }
}

impl Connectivity for ConnectivityMonitor {
    fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}
