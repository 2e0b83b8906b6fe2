//! Shared fixtures: a local HTTP server and payload builders.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{http::StatusCode, routing::get, Router};
use zip::write::SimpleFileOptions;

/// Build a fast-feed response body wrapped the way the live feed wraps it.
pub fn feed_body(headers: &[&str], rows: &[&[&str]]) -> String {
    let cols: Vec<serde_json::Value> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| serde_json::json!({ "id": format!("C{}", i), "label": h, "type": "string" }))
        .collect();
    let rows: Vec<serde_json::Value> = rows
        .iter()
        .map(|row| {
            let cells: Vec<serde_json::Value> = row
                .iter()
                .map(|v| {
                    if v.is_empty() {
                        serde_json::Value::Null
                    } else {
                        serde_json::json!({ "v": v })
                    }
                })
                .collect();
            serde_json::json!({ "c": cells })
        })
        .collect();
    let payload = serde_json::json!({
        "version": "0.6",
        "status": "ok",
        "table": { "cols": cols, "rows": rows }
    });
    format!(
        "/*O_o*/\ngoogle.visualization.Query.setResponse({});",
        payload
    )
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Build a minimal xlsx workbook whose first sheet holds `headers` and `rows`
/// as inline strings.
pub fn xlsx(headers: &[&str], rows: &[&[&str]]) -> Vec<u8> {
    let mut sheet_rows = String::new();
    for row in std::iter::once(headers).chain(rows.iter().copied()) {
        sheet_rows.push_str("<row>");
        for value in row {
            sheet_rows.push_str(&format!(
                r#"<c t="inlineStr"><is><t>{}</t></is></c>"#,
                escape(value)
            ));
        }
        sheet_rows.push_str("</row>");
    }
    let sheet = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
        sheet_rows
    );
    let workbook = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Cadastro" sheetId="1" r:id="rId1"/></sheets></workbook>"#;
    let rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in [
        ("xl/workbook.xml", workbook.to_string()),
        ("xl/_rels/workbook.xml.rels", rels.to_string()),
        ("xl/worksheets/sheet1.xml", sheet),
    ] {
        zip.start_file(name, SimpleFileOptions::default()).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub const HEADERS: &[&str] = &["Placa1", "Adesivo1", "Aluno1", "Pai", "Mãe"];

pub fn households() -> Vec<&'static [&'static str]> {
    vec![
        &["ABC1234", "T-9", "Pedro Souza", "Carlos Souza", ""],
        &["XYZ9999", "T-90", "Bia Lima", "", "Mãe: Fulana"],
    ]
}

/// What the fixture server answers on each path.
#[derive(Clone)]
pub enum Reply {
    Text(String),
    Bytes(Vec<u8>),
    Status(u16),
}

/// A running fixture server with per-path hit counters.
pub struct Server {
    pub base: String,
    feed_hits: Arc<AtomicUsize>,
    sheet_hits: Arc<AtomicUsize>,
}

impl Server {
    pub fn feed_url(&self) -> String {
        format!("{}/feed", self.base)
    }

    pub fn sheet_url(&self) -> String {
        format!("{}/sheet.xlsx", self.base)
    }

    pub fn feed_hits(&self) -> usize {
        self.feed_hits.load(Ordering::SeqCst)
    }

    pub fn sheet_hits(&self) -> usize {
        self.sheet_hits.load(Ordering::SeqCst)
    }
}

fn route(reply: Reply, hits: Arc<AtomicUsize>) -> axum::routing::MethodRouter {
    get(move || {
        let reply = reply.clone();
        let hits = hits.clone();
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            match reply {
                Reply::Text(body) => (StatusCode::OK, body.into_bytes()),
                Reply::Bytes(body) => (StatusCode::OK, body),
                Reply::Status(code) => (
                    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                    Vec::new(),
                ),
            }
        }
    })
}

/// Serve `/feed` and `/sheet.xlsx` on an ephemeral local port.
pub async fn serve(feed: Reply, sheet: Reply) -> Server {
    let feed_hits = Arc::new(AtomicUsize::new(0));
    let sheet_hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/feed", route(feed, feed_hits.clone()))
        .route("/sheet.xlsx", route(sheet, sheet_hits.clone()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Server {
        base: format!("http://{}", addr),
        feed_hits,
        sheet_hits,
    }
}

/// A URL on a port nothing listens on.
pub fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/gone", listener.local_addr().unwrap());
    drop(listener);
    url
}

/// Write a config file under `root` and return its path.
pub fn write_config(
    root: &Path,
    fast_feed_url: Option<&str>,
    spreadsheet_url: Option<&str>,
    mode: &str,
) -> PathBuf {
    let config_dir = root.join("config");
    std::fs::create_dir_all(&config_dir).unwrap();

    let mut content = format!(
        "[db]\npath = \"{}/data/vlk.sqlite\"\n\n[sources]\ntimeout_secs = 5\n",
        root.display()
    );
    if let Some(url) = fast_feed_url {
        content.push_str(&format!("fast_feed_url = \"{}\"\n", url));
    }
    if let Some(url) = spreadsheet_url {
        content.push_str(&format!("spreadsheet_url = \"{}\"\n", url));
    }
    content.push_str(&format!(
        "\n[connectivity]\nmode = \"{}\"\nprobe_timeout_secs = 2\n",
        mode
    ));

    let path = config_dir.join("vlk.toml");
    std::fs::write(&path, content).unwrap();
    path
}
