//! Remote sources and their failure taxonomy.
//!
//! Two sources exist, tried in this order by the synchronizer:
//!
//! | Source | Payload | Decoder |
//! |--------|---------|---------|
//! | fast feed | JSON wrapped in text | [`crate::fastfeed`] |
//! | spreadsheet | xlsx workbook | [`crate::spreadsheet`] |
//!
//! Every failure of a source (transport, non-2xx status, undecodable
//! payload, zero rows) is a [`SourceError`], and every one of them moves the
//! chain on to the next source.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use vehicle_lookup_core::models::{Provenance, Record};

use crate::config::Config;
use crate::fastfeed;
use crate::resolver::{Endpoint, Resolver};
use crate::spreadsheet;

/// Why a single source failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("{0} URL is not configured")]
    NotConfigured(Endpoint),

    #[error("HTTP error: {0}")]
    Http(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed fast-feed payload: {0}")]
    MalformedFastFeed(String),

    #[error("{0}")]
    FeedError(String),

    #[error("spreadsheet could not be read: {0}")]
    Spreadsheet(String),

    #[error("source returned no data")]
    EmptyResult,
}

impl From<spreadsheet::SpreadsheetError> for SourceError {
    fn from(e: spreadsheet::SpreadsheetError) -> Self {
        SourceError::Spreadsheet(e.to_string())
    }
}

/// A remote endpoint that yields household records.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Which resolved endpoint this source reads.
    fn endpoint(&self) -> Endpoint;

    /// Provenance tag of a working set produced by this source.
    fn provenance(&self) -> Provenance;

    /// Fetch and decode every record at `url`.
    ///
    /// A successful response with zero records is [`SourceError::EmptyResult`].
    async fn fetch(&self, url: &str) -> Result<Vec<Record>, SourceError>;
}

/// Shared HTTP client for both sources.
pub fn http_client(config: &Config) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.sources.timeout_secs))
        .user_agent(concat!("vlk/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

async fn get(client: &reqwest::Client, url: &str) -> Result<reqwest::Response, SourceError> {
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| SourceError::Network(e.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(SourceError::Http(status.as_u16()));
    }
    Ok(resp)
}

fn non_empty(records: Vec<Record>) -> Result<Vec<Record>, SourceError> {
    if records.is_empty() {
        Err(SourceError::EmptyResult)
    } else {
        Ok(records)
    }
}

/// The fast structured feed.
pub struct FastFeedSource {
    client: reqwest::Client,
}

impl FastFeedSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteSource for FastFeedSource {
    fn endpoint(&self) -> Endpoint {
        Endpoint::FastFeed
    }

    fn provenance(&self) -> Provenance {
        Provenance::FastFeed
    }

    async fn fetch(&self, url: &str) -> Result<Vec<Record>, SourceError> {
        let body = get(&self.client, url)
            .await?
            .text()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;
        let records = fastfeed::parse(&body)?;
        debug!(count = records.len(), "fast feed decoded");
        non_empty(records)
    }
}

/// The spreadsheet export.
pub struct SpreadsheetSource {
    client: reqwest::Client,
}

impl SpreadsheetSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteSource for SpreadsheetSource {
    fn endpoint(&self) -> Endpoint {
        Endpoint::Spreadsheet
    }

    fn provenance(&self) -> Provenance {
        Provenance::Spreadsheet
    }

    async fn fetch(&self, url: &str) -> Result<Vec<Record>, SourceError> {
        let bytes = get(&self.client, url)
            .await?
            .bytes()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;
        let records = spreadsheet::read_records(&bytes)?;
        debug!(count = records.len(), "spreadsheet decoded");
        non_empty(records)
    }
}

/// Print the resolved endpoints and where each came from.
pub async fn list_sources(resolver: &Resolver) {
    let resolved = resolver.resolve().await;
    println!("{:<14} {:<12} URL", "SOURCE", "ORIGIN");
    for endpoint in [Endpoint::FastFeed, Endpoint::Spreadsheet] {
        let r = resolved.get(endpoint);
        println!(
            "{:<14} {:<12} {}",
            endpoint.to_string(),
            r.origin.to_string(),
            r.url.as_deref().unwrap_or("-")
        );
    }
}
