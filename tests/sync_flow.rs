//! End-to-end synchronization against a local HTTP fixture server.

mod common;

use common::{dead_url, feed_body, households, serve, xlsx, Reply, HEADERS};
use tempfile::TempDir;

use vehicle_lookup::config::Config;
use vehicle_lookup::lifecycle::{App, LogReady};
use vehicle_lookup::resolver::{Endpoint, Origin};
use vehicle_lookup::session::SearchSession;
use vehicle_lookup::sync::SyncError;
use vehicle_lookup_core::models::{FieldKey, FixedField, Provenance};
use vehicle_lookup_core::search::SearchMode;

fn config(tmp: &TempDir, fast_feed: Option<String>, spreadsheet: Option<String>) -> Config {
    let mut config = Config::with_db_path(tmp.path().join("vlk.sqlite"));
    config.sources.fast_feed_url = fast_feed;
    config.sources.spreadsheet_url = spreadsheet;
    config.sources.timeout_secs = 5;
    config.connectivity.mode = "online".into();
    config
}

#[tokio::test]
async fn test_fast_feed_sync_caches_and_learns_url() {
    let server = serve(
        Reply::Text(feed_body(HEADERS, &households())),
        Reply::Status(500),
    )
    .await;
    let tmp = TempDir::new().unwrap();
    let app = App::open(&config(&tmp, Some(server.feed_url()), None))
        .await
        .unwrap();

    let outcome = app.sync(false).await;
    assert_eq!(outcome.source, Some(Provenance::FastFeed));
    assert_eq!(outcome.error, None);
    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.records[0].get(FieldKey::Plate(0)), "ABC1234");
    app.close().await;

    // A second run without configured URLs still finds the feed.
    let app = App::open(&config(&tmp, None, None)).await.unwrap();
    let resolved = app.resolver.resolve().await;
    assert_eq!(resolved.fast_feed.origin, Origin::Override);
    assert_eq!(resolved.url(Endpoint::FastFeed), Some(server.feed_url().as_str()));

    let cached = app.cache.load().await.unwrap();
    assert_eq!(cached.records.len(), 2);
    app.close().await;
}

#[tokio::test]
async fn test_spreadsheet_fallback_when_feed_fails() {
    let server = serve(
        Reply::Status(503),
        Reply::Bytes(xlsx(HEADERS, &households())),
    )
    .await;
    let tmp = TempDir::new().unwrap();
    let app = App::open(&config(
        &tmp,
        Some(server.feed_url()),
        Some(server.sheet_url()),
    ))
    .await
    .unwrap();

    let outcome = app.sync(false).await;
    assert_eq!(outcome.source, Some(Provenance::Spreadsheet));
    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.records[1].get(FieldKey::Fixed(FixedField::Mother)), "Mãe: Fulana");
    assert_eq!(server.feed_hits(), 1);
    assert_eq!(server.sheet_hits(), 1);
    app.close().await;
}

#[tokio::test]
async fn test_auto_connectivity_reaches_spreadsheet_when_feed_host_is_down() {
    let server = serve(
        Reply::Status(500),
        Reply::Bytes(xlsx(HEADERS, &households())),
    )
    .await;
    let tmp = TempDir::new().unwrap();
    let mut config = config(&tmp, Some(dead_url()), Some(server.sheet_url()));
    config.connectivity.mode = "auto".into();
    config.connectivity.probe_timeout_secs = 2;
    let app = App::open(&config).await.unwrap();

    let outcome = app.sync(false).await;
    assert_eq!(outcome.error, None);
    assert_eq!(outcome.source, Some(Provenance::Spreadsheet));
    assert_eq!(outcome.records.len(), 2);
    assert!(server.sheet_hits() >= 1);
    app.close().await;
}

#[tokio::test]
async fn test_empty_feed_falls_back_to_spreadsheet() {
    let server = serve(
        Reply::Text(feed_body(HEADERS, &[])),
        Reply::Bytes(xlsx(HEADERS, &households())),
    )
    .await;
    let tmp = TempDir::new().unwrap();
    let app = App::open(&config(
        &tmp,
        Some(server.feed_url()),
        Some(server.sheet_url()),
    ))
    .await
    .unwrap();

    let outcome = app.sync(false).await;
    assert_eq!(outcome.source, Some(Provenance::Spreadsheet));
    assert_eq!(outcome.records.len(), 2);
    app.close().await;
}

#[tokio::test]
async fn test_unreachable_sources_fall_back_to_cache() {
    let server = serve(
        Reply::Text(feed_body(HEADERS, &households())),
        Reply::Status(500),
    )
    .await;
    let tmp = TempDir::new().unwrap();

    let app = App::open(&config(&tmp, Some(server.feed_url()), None))
        .await
        .unwrap();
    assert_eq!(app.sync(false).await.source, Some(Provenance::FastFeed));
    app.close().await;

    let app = App::open(&config(&tmp, Some(dead_url()), Some(dead_url())))
        .await
        .unwrap();
    let outcome = app.sync(true).await;
    assert_eq!(outcome.source, Some(Provenance::Cache));
    assert_eq!(outcome.error, None);
    assert_eq!(outcome.records.len(), 2);
    assert!(matches!(
        outcome.warnings.as_slice(),
        [SyncError::SourceChainExhausted { .. }]
    ));
    app.close().await;
}

#[tokio::test]
async fn test_no_cache_and_no_sources_reports_exhausted_chain() {
    let tmp = TempDir::new().unwrap();
    let app = App::open(&config(&tmp, Some(dead_url()), Some(dead_url())))
        .await
        .unwrap();

    let outcome = app.sync(false).await;
    assert_eq!(outcome.source, None);
    assert!(outcome.records.is_empty());
    assert!(matches!(
        outcome.error,
        Some(SyncError::SourceChainExhausted { .. })
    ));
    app.close().await;
}

#[tokio::test]
async fn test_session_searches_synced_records() {
    let server = serve(
        Reply::Text(feed_body(HEADERS, &households())),
        Reply::Status(500),
    )
    .await;
    let tmp = TempDir::new().unwrap();
    let app = App::open(&config(&tmp, Some(server.feed_url()), None))
        .await
        .unwrap();

    let mut session = SearchSession::new(app.working_set(), std::time::Duration::from_millis(10));
    assert!(session.results().is_empty());

    app.start(&LogReady, false).await.unwrap();

    session.set_query("t-9");
    session.settled().await;
    assert_eq!(session.results().len(), 2);

    session.set_mode(SearchMode::StickersOnly);
    session.set_query("pedro");
    session.settled().await;
    assert!(session.results().is_empty());

    session.set_mode(SearchMode::AllFields);
    assert_eq!(session.results().len(), 1);
    app.close().await;
}
