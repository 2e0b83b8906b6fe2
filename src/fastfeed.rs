//! Fast-feed payload decoding.
//!
//! The feed answers with a JSON object wrapped in arbitrary text, typically
//! a JavaScript callback:
//!
//! ```text
//! /*O_o*/
//! google.visualization.Query.setResponse({"status":"ok","table":{...}});
//! ```
//!
//! Everything from the first `{` to the last `}` is decoded. Columns name
//! the fields in order: the column `label`, else its `id`, else
//! `column_{index}`. Each cell takes its raw value `v`, then its formatted
//! value `f`, then the empty string.

use serde::Deserialize;
use serde_json::Value;

use vehicle_lookup_core::models::Record;
use vehicle_lookup_core::normalize::normalize;

use crate::sources::SourceError;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    errors: Vec<FeedMessage>,
    #[serde(default)]
    table: Option<Table>,
}

#[derive(Debug, Deserialize)]
struct FeedMessage {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Table {
    #[serde(default)]
    cols: Vec<Column>,
    #[serde(default)]
    rows: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct Column {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(default)]
    c: Vec<Option<Cell>>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    #[serde(default)]
    v: Option<Value>,
    #[serde(default)]
    f: Option<String>,
}

/// Decode a fast-feed response body into records.
///
/// Rows whose every cell is empty are dropped. An empty table decodes to an
/// empty list; rejecting it is the caller's decision.
pub fn parse(body: &str) -> Result<Vec<Record>, SourceError> {
    let json = unwrap_payload(body)
        .ok_or_else(|| SourceError::MalformedFastFeed("no JSON object in response".into()))?;
    let envelope: Envelope = serde_json::from_str(json)
        .map_err(|e| SourceError::MalformedFastFeed(e.to_string()))?;

    if envelope.status.as_deref() == Some("error") {
        let message = envelope
            .errors
            .into_iter()
            .find_map(|e| e.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "feed reported an error".to_string());
        return Err(SourceError::FeedError(message));
    }

    let table = envelope
        .table
        .ok_or_else(|| SourceError::MalformedFastFeed("response has no table".into()))?;

    let names: Vec<String> = table
        .cols
        .iter()
        .enumerate()
        .map(|(i, col)| column_name(col, i))
        .collect();

    let records = table
        .rows
        .into_iter()
        .filter_map(|row| {
            let fields = row.c.into_iter().enumerate().map(|(i, cell)| {
                let name = names
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| placeholder(i));
                (name, cell_value(cell))
            });
            Record::from_fields(fields)
        })
        .collect();

    Ok(records)
}

fn unwrap_payload(body: &str) -> Option<&str> {
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (start < end).then(|| &body[start..=end])
}

fn column_name(col: &Column, index: usize) -> String {
    [col.label.as_deref(), col.id.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| placeholder(index))
}

fn placeholder(index: usize) -> String {
    format!("column_{}", index)
}

fn cell_value(cell: Option<Cell>) -> String {
    match cell {
        Some(Cell { v: Some(v), .. }) if !v.is_null() => normalize(&v),
        Some(Cell { f: Some(f), .. }) => f,
        _ => String::new(),
    }
}
