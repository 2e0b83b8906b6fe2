//! CLI integration tests for `vlk`.
//!
//! Each test runs the compiled binary against a temporary database and a
//! local HTTP fixture server.

mod common;

use std::path::{Path, PathBuf};
use std::process::Command;

use common::{dead_url, feed_body, households, serve, write_config, xlsx, Reply, HEADERS};
use tempfile::TempDir;

fn vlk_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("vlk");
    path
}

fn run_vlk(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(vlk_binary())
        .arg("--config")
        .arg(config_path)
        .args(args)
        .output()
        .expect("failed to run vlk");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

async fn feed_server() -> common::Server {
    serve(
        Reply::Text(feed_body(HEADERS, &households())),
        Reply::Status(500),
    )
    .await
}

#[test]
fn test_init_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), None, None, "offline");

    let (stdout, _, success) = run_vlk(&config, &["init"]);
    assert!(success);
    assert!(stdout.contains("Database initialized successfully."));
    assert!(tmp.path().join("data/vlk.sqlite").exists());

    let (_, _, success) = run_vlk(&config, &["init"]);
    assert!(success);
}

#[test]
fn test_offline_without_cache_fails() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), None, None, "offline");

    let (stdout, stderr, success) = run_vlk(&config, &["sync"]);
    assert!(!success);
    assert!(stdout.contains("source: none"));
    assert!(stderr.contains("offline and no cached data is available"));
}

#[test]
fn test_search_without_cache() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), None, None, "offline");

    let (stdout, _, success) = run_vlk(&config, &["search", "abc"]);
    assert!(success);
    assert!(stdout.contains("No cached data."));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sync_then_search() {
    let server = feed_server().await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), Some(server.feed_url().as_str()), None, "auto");

    let (stdout, stderr, success) = run_vlk(&config, &["sync"]);
    assert!(success, "sync failed: {}", stderr);
    assert!(stdout.contains("source: fast-feed (2 records)"));

    let (stdout, _, success) = run_vlk(&config, &["search", "  abc1234 "]);
    assert!(success);
    assert!(stdout.contains("Placa1: ABC1234"));
    assert!(stdout.contains("Pai: Carlos Souza"));
    assert!(!stdout.contains("XYZ9999"));

    let (stdout, _, _) = run_vlk(&config, &["search", "souza"]);
    assert!(stdout.contains("Aluno1: Pedro Souza"));

    let (stdout, _, _) = run_vlk(&config, &["search", "nobody"]);
    assert!(stdout.contains("No results."));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sticker_search_modes() {
    let server = feed_server().await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), Some(server.feed_url().as_str()), None, "online");
    let (_, _, success) = run_vlk(&config, &["sync"]);
    assert!(success);

    let (stdout, _, _) = run_vlk(&config, &["search", "T-9", "--mode", "stickers"]);
    assert!(stdout.contains("ABC1234"));
    assert!(stdout.contains("XYZ9999"));

    let (stdout, _, _) = run_vlk(&config, &["search", "T-9", "--mode", "stickers", "--exact"]);
    assert!(stdout.contains("ABC1234"));
    assert!(!stdout.contains("XYZ9999"));

    // Names are not sticker fields.
    let (stdout, _, _) = run_vlk(&config, &["search", "pedro", "--mode", "stickers"]);
    assert!(stdout.contains("No results."));

    let (stdout, _, _) = run_vlk(&config, &["search", "T-9", "--limit", "1"]);
    assert!(stdout.contains("(1 of 2 shown)"));

    let (_, stderr, success) = run_vlk(&config, &["search", "T-9", "--mode", "plates"]);
    assert!(!success);
    assert!(stderr.contains("Unknown search mode"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_spreadsheet_fallback() {
    let server = serve(
        Reply::Text(feed_body(HEADERS, &[])),
        Reply::Bytes(xlsx(HEADERS, &households())),
    )
    .await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(
        tmp.path(),
        Some(server.feed_url().as_str()),
        Some(server.sheet_url().as_str()),
        "online",
    );

    let (stdout, stderr, success) = run_vlk(&config, &["sync"]);
    assert!(success, "sync failed: {}", stderr);
    assert!(stdout.contains("source: spreadsheet (2 records)"));
    assert_eq!(server.sheet_hits(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cache_survives_network_loss() {
    let server = feed_server().await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), Some(server.feed_url().as_str()), None, "online");
    let (_, _, success) = run_vlk(&config, &["sync"]);
    assert!(success);

    let dead = dead_url();
    let config = write_config(tmp.path(), Some(dead.as_str()), Some(dead.as_str()), "online");
    let (stdout, _, success) = run_vlk(&config, &["sync", "--force"]);
    assert!(success);
    assert!(stdout.contains("source: cache (2 records)"));
    assert!(stdout.contains("warning: could not load data"));

    let config = write_config(tmp.path(), None, None, "offline");
    let (stdout, _, success) = run_vlk(&config, &["sync"]);
    assert!(success);
    assert!(stdout.contains("source: cache (2 records)"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sources_shows_learned_endpoint() {
    let server = feed_server().await;
    let tmp = TempDir::new().unwrap();

    let config = write_config(tmp.path(), Some(server.feed_url().as_str()), None, "online");
    let (stdout, _, _) = run_vlk(&config, &["sources"]);
    assert!(stdout.contains("configured"));
    assert!(stdout.contains("absent"));

    let (_, _, success) = run_vlk(&config, &["sync"]);
    assert!(success);

    let config = write_config(tmp.path(), None, None, "online");
    let (stdout, _, success) = run_vlk(&config, &["sources"]);
    assert!(success);
    let feed_line = stdout
        .lines()
        .find(|l| l.starts_with("fast-feed"))
        .unwrap();
    assert!(feed_line.contains("learned"));
    assert!(feed_line.contains(&server.feed_url()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cache_info_and_clear() {
    let server = feed_server().await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), Some(server.feed_url().as_str()), None, "online");

    let (stdout, _, success) = run_vlk(&config, &["cache", "info"]);
    assert!(success);
    assert!(stdout.contains("No cached data."));

    run_vlk(&config, &["sync"]);
    let (stdout, _, success) = run_vlk(&config, &["cache", "info"]);
    assert!(success);
    assert!(stdout.contains("Records:     2"));

    let (stdout, _, success) = run_vlk(&config, &["cache", "clear"]);
    assert!(success);
    assert!(stdout.contains("Cache cleared."));

    let (stdout, _, _) = run_vlk(&config, &["cache", "info"]);
    assert!(stdout.contains("No cached data."));
}

#[test]
fn test_import_workbook() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), None, None, "offline");
    let workbook = tmp.path().join("cadastro.xlsx");
    std::fs::write(&workbook, xlsx(HEADERS, &households())).unwrap();

    let (stdout, stderr, success) = run_vlk(&config, &["import", workbook.to_str().unwrap()]);
    assert!(success, "import failed: {}", stderr);
    assert!(stdout.contains("Imported 2 records."));

    let (stdout, _, success) = run_vlk(&config, &["sync"]);
    assert!(success);
    assert!(stdout.contains("source: cache (2 records)"));

    let empty = tmp.path().join("empty.xlsx");
    std::fs::write(&empty, xlsx(HEADERS, &[])).unwrap();
    let (_, stderr, success) = run_vlk(&config, &["import", empty.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("is empty"));
}
