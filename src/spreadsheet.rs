//! Tabular reading of `.xlsx` workbooks.
//!
//! An xlsx file is a ZIP archive of XML parts. Only the first worksheet is
//! read: the first `<sheet>` of `xl/workbook.xml`, located through
//! `xl/_rels/workbook.xml.rels`, or the lowest-numbered
//! `xl/worksheets/sheetN.xml` when the workbook part can't be followed.
//!
//! The first row holding any value is the header. Blank header cells become
//! `column_{index}` and repeated headers get `_1`, `_2`, ... suffixes. Cells
//! missing from a row read as `""`, and rows without any value are skipped.
//!
//! Numeric cells are rendered through their number format from
//! `xl/styles.xml` when it is a date/time format or a digit mask such as
//! `(00) 00000-0000`; other numbers keep their plain value. Date serials use
//! the 1900 date system.

use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use serde_json::{Number, Value};
use thiserror::Error;
use tracing::{debug, warn};

use vehicle_lookup_core::models::Record;
use vehicle_lookup_core::normalize::normalize;

/// Maximum cells to process in the sheet (avoids unbounded memory).
const MAX_CELLS: usize = 500_000;
/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const STYLES_PART: &str = "xl/styles.xml";
const WORKSHEET_PREFIX: &str = "xl/worksheets/sheet";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpreadsheetError {
    #[error("not a readable xlsx archive: {0}")]
    Archive(String),

    #[error("ZIP entry {name} exceeds size limit ({limit} bytes)")]
    EntryTooLarge { name: String, limit: u64 },

    #[error("invalid workbook XML: {0}")]
    Xml(String),

    #[error("workbook has no worksheet")]
    NoWorksheet,

    #[error("worksheet exceeds {limit} cells")]
    TooManyCells { limit: usize },
}

type Archive<'a> = zip::ZipArchive<Cursor<&'a [u8]>>;

/// Decode the first worksheet of an xlsx workbook into records.
pub fn read_records(bytes: &[u8]) -> Result<Vec<Record>, SpreadsheetError> {
    let rows = read_first_sheet(bytes)?;
    Ok(rows_to_records(rows))
}

/// Raw rows of the first worksheet, keyed by zero-based column index.
fn read_first_sheet(bytes: &[u8]) -> Result<Vec<BTreeMap<usize, String>>, SpreadsheetError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| SpreadsheetError::Archive(e.to_string()))?;

    let shared_strings = if archive.by_name(SHARED_STRINGS_PART).is_ok() {
        let xml = read_zip_entry_bounded(&mut archive, SHARED_STRINGS_PART)?;
        read_shared_strings(&xml)?
    } else {
        Vec::new()
    };

    let styles = if archive.by_name(STYLES_PART).is_ok() {
        let xml = read_zip_entry_bounded(&mut archive, STYLES_PART)?;
        read_styles(&xml)?
    } else {
        Styles::default()
    };

    let sheet = first_sheet_part(&mut archive).ok_or(SpreadsheetError::NoWorksheet)?;
    debug!(sheet = %sheet, shared = shared_strings.len(), "reading worksheet");
    let xml = read_zip_entry_bounded(&mut archive, &sheet)?;
    read_sheet_rows(&xml, &shared_strings, &styles, MAX_CELLS)
}

fn read_zip_entry_bounded(archive: &mut Archive<'_>, name: &str) -> Result<Vec<u8>, SpreadsheetError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| SpreadsheetError::Archive(e.to_string()))?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| SpreadsheetError::Archive(e.to_string()))?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(SpreadsheetError::EntryTooLarge {
            name: name.to_string(),
            limit: MAX_XML_ENTRY_BYTES,
        });
    }
    Ok(out)
}

fn xml_error(e: quick_xml::Error) -> SpreadsheetError {
    SpreadsheetError::Xml(e.to_string())
}

fn attr(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes().flatten().find_map(|a| {
        if a.key.local_name().as_ref() == local {
            a.unescape_value().ok().map(|v| v.into_owned())
        } else {
            None
        }
    })
}

// ============ Worksheet lookup ============

fn first_sheet_part(archive: &mut Archive<'_>) -> Option<String> {
    if let Some(part) = first_sheet_from_workbook(archive) {
        if archive.by_name(&part).is_ok() {
            return Some(part);
        }
        warn!(part = %part, "workbook points at a missing worksheet");
    }
    lowest_numbered_sheet(archive)
}

fn first_sheet_from_workbook(archive: &mut Archive<'_>) -> Option<String> {
    let workbook = read_zip_entry_bounded(archive, WORKBOOK_PART).ok()?;
    let rels = read_zip_entry_bounded(archive, WORKBOOK_RELS_PART).ok()?;

    let rel_id = first_sheet_rel_id(&workbook)?;
    let target = relationship_target(&rels, &rel_id)?;
    Some(match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    })
}

fn first_sheet_rel_id(xml: &[u8]) -> Option<String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                // The relationship id is the namespaced `r:id`, not `sheetId`.
                return attr(&e, b"id");
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

fn relationship_target(xml: &[u8], rel_id: &str) -> Option<String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if attr(&e, b"Id").as_deref() == Some(rel_id) {
                    return attr(&e, b"Target");
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

fn lowest_numbered_sheet(archive: &Archive<'_>) -> Option<String> {
    archive
        .file_names()
        .filter_map(|name| {
            let n = name
                .strip_prefix(WORKSHEET_PREFIX)?
                .strip_suffix(".xml")?
                .parse::<u32>()
                .ok()?;
            Some((n, name.to_string()))
        })
        .min_by_key(|(n, _)| *n)
        .map(|(_, name)| name)
}

// ============ Shared strings ============

/// Read the shared string table. Rich-text runs are concatenated; phonetic
/// hints (`rPh`) are ignored.
fn read_shared_strings(xml: &[u8]) -> Result<Vec<String>, SpreadsheetError> {
    let mut strings = Vec::new();
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    let mut in_phonetic = false;
    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_t = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(te) if in_t && !in_phonetic => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&te.unescape().map_err(xml_error)?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(current.take().unwrap_or_default()),
                b"t" => in_t = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

// ============ Worksheet cells ============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Number,
    Shared,
    Inline,
    FormulaString,
    Boolean,
    Other,
}

impl CellKind {
    fn from_attr(t: Option<&str>) -> Self {
        match t {
            None | Some("n") => CellKind::Number,
            Some("s") => CellKind::Shared,
            Some("inlineStr") => CellKind::Inline,
            Some("str") => CellKind::FormulaString,
            Some("b") => CellKind::Boolean,
            Some(_) => CellKind::Other,
        }
    }
}

struct CellState {
    column: usize,
    kind: CellKind,
    style: Option<usize>,
    raw: String,
}

/// Reading stops with [`SpreadsheetError::TooManyCells`] past `max_cells`
/// rather than returning a partial sheet.
fn read_sheet_rows(
    xml: &[u8],
    shared_strings: &[String],
    styles: &Styles,
    max_cells: usize,
) -> Result<Vec<BTreeMap<usize, String>>, SpreadsheetError> {
    let mut rows = Vec::new();
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut row: Option<BTreeMap<usize, String>> = None;
    let mut next_column = 0usize;
    let mut cell: Option<CellState> = None;
    let mut in_value = false;
    let mut in_inline_text = false;
    let mut cell_count = 0usize;

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    row = Some(BTreeMap::new());
                    next_column = 0;
                }
                b"c" => {
                    let column = attr(&e, b"r")
                        .and_then(|r| column_index(&r))
                        .unwrap_or(next_column);
                    next_column = column + 1;
                    cell = Some(CellState {
                        column,
                        kind: CellKind::from_attr(attr(&e, b"t").as_deref()),
                        style: attr(&e, b"s").and_then(|v| v.parse().ok()),
                        raw: String::new(),
                    });
                }
                b"v" => in_value = true,
                b"t" if cell.is_some() => in_inline_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"row" => rows.push(BTreeMap::new()),
                b"c" => {
                    let column = attr(&e, b"r")
                        .and_then(|r| column_index(&r))
                        .unwrap_or(next_column);
                    next_column = column + 1;
                }
                _ => {}
            },
            Event::Text(te) if in_value || in_inline_text => {
                if let Some(c) = cell.as_mut() {
                    c.raw.push_str(&te.unescape().map_err(xml_error)?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" => in_value = false,
                b"t" => in_inline_text = false,
                b"c" => {
                    if let (Some(c), Some(r)) = (cell.take(), row.as_mut()) {
                        cell_count += 1;
                        if cell_count > max_cells {
                            warn!(limit = max_cells, "worksheet exceeds cell limit");
                            return Err(SpreadsheetError::TooManyCells { limit: max_cells });
                        }
                        let value = cell_text(&c, shared_strings, styles);
                        if !value.is_empty() {
                            r.insert(c.column, value);
                        }
                    }
                }
                b"row" => {
                    if let Some(r) = row.take() {
                        rows.push(r);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}

fn cell_text(cell: &CellState, shared_strings: &[String], styles: &Styles) -> String {
    match cell.kind {
        CellKind::Shared => cell
            .raw
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|i| shared_strings.get(i).cloned())
            .unwrap_or_default(),
        CellKind::Boolean => match cell.raw.trim() {
            "1" => "TRUE".to_string(),
            "0" => "FALSE".to_string(),
            other => other.to_string(),
        },
        CellKind::Number => {
            let raw = cell.raw.trim();
            let Ok(value) = raw.parse::<f64>() else {
                return raw.to_string();
            };
            cell.style
                .and_then(|s| styles.format_code(s))
                .and_then(|code| format_number(value, code))
                .or_else(|| Number::from_f64(value).map(|n| normalize(&Value::Number(n))))
                .unwrap_or_else(|| raw.to_string())
        }
        CellKind::Inline | CellKind::FormulaString | CellKind::Other => cell.raw.clone(),
    }
}

/// Zero-based column index of a cell reference such as `"AB12"`.
fn column_index(reference: &str) -> Option<usize> {
    let letters: Vec<u8> = reference
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .collect();
    if letters.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for b in letters {
        index = index
            .checked_mul(26)?
            .checked_add((b.to_ascii_uppercase() - b'A') as usize + 1)?;
    }
    Some(index - 1)
}

// ============ Number formats ============

/// Number format ids per cell style, from `<cellXfs>`, plus the workbook's
/// custom format codes.
#[derive(Debug, Default)]
struct Styles {
    cell_formats: Vec<u32>,
    custom: HashMap<u32, String>,
}

impl Styles {
    fn format_code(&self, style: usize) -> Option<&str> {
        let id = *self.cell_formats.get(style)?;
        self.custom
            .get(&id)
            .map(String::as_str)
            .or_else(|| builtin_format(id))
    }
}

/// Built-in date and time formats. Ids not listed here render as plain
/// numbers.
fn builtin_format(id: u32) -> Option<&'static str> {
    match id {
        14 => Some("m/d/yy"),
        15 => Some("d-mmm-yy"),
        16 => Some("d-mmm"),
        17 => Some("mmm-yy"),
        18 => Some("h:mm AM/PM"),
        19 => Some("h:mm:ss AM/PM"),
        20 => Some("h:mm"),
        21 => Some("h:mm:ss"),
        22 => Some("m/d/yy h:mm"),
        45 => Some("mm:ss"),
        _ => None,
    }
}

fn read_styles(xml: &[u8]) -> Result<Styles, SpreadsheetError> {
    let mut styles = Styles::default();
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_cell_xfs = false;
    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = true,
            Event::End(e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"numFmt" => {
                    let id = attr(&e, b"numFmtId").and_then(|v| v.parse().ok());
                    if let (Some(id), Some(code)) = (id, attr(&e, b"formatCode")) {
                        styles.custom.insert(id, code);
                    }
                }
                b"xf" if in_cell_xfs => {
                    let id = attr(&e, b"numFmtId").and_then(|v| v.parse().ok());
                    styles.cell_formats.push(id.unwrap_or(0));
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(styles)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FormatToken {
    Literal(String),
    Year(usize),
    Month(usize),
    Minute(usize),
    Day(usize),
    Hour(usize),
    Second(usize),
    AmPm,
    Digit,
}

impl FormatToken {
    fn is_date_part(&self) -> bool {
        !matches!(
            self,
            FormatToken::Literal(_) | FormatToken::Digit | FormatToken::AmPm
        )
    }
}

/// Tokens of the first section of a format code, or `None` for codes that
/// need a full number formatter (`General`, decimals, grouping, percent,
/// scientific, text).
fn tokenize_format(code: &str) -> Option<Vec<FormatToken>> {
    if code.trim().eq_ignore_ascii_case("general") {
        return None;
    }
    let chars: Vec<char> = code.chars().collect();
    let mut tokens = Vec::new();
    let mut numeric_symbols = false;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ';' => break,
            '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&q| q == '"')
                    .map(|p| i + 1 + p)
                    .unwrap_or(chars.len());
                tokens.push(FormatToken::Literal(chars[i + 1..end].iter().collect()));
                i = end + 1;
                continue;
            }
            '\\' => {
                if let Some(&next) = chars.get(i + 1) {
                    tokens.push(FormatToken::Literal(next.to_string()));
                }
                i += 2;
                continue;
            }
            '[' => {
                // Locale and colour tags such as `[$-416]` or `[Red]`.
                i = chars[i..]
                    .iter()
                    .position(|&b| b == ']')
                    .map(|p| i + p + 1)
                    .unwrap_or(chars.len());
                continue;
            }
            '_' => {
                tokens.push(FormatToken::Literal(" ".to_string()));
                i += 2;
                continue;
            }
            '*' => {
                i += 2;
                continue;
            }
            '0' => tokens.push(FormatToken::Digit),
            '#' | '?' | '.' | ',' | '%' | 'E' | 'e' | '@' => {
                numeric_symbols = true;
                tokens.push(FormatToken::Literal(c.to_string()));
            }
            _ if chars[i..]
                .iter()
                .take(5)
                .collect::<String>()
                .eq_ignore_ascii_case("AM/PM") =>
            {
                tokens.push(FormatToken::AmPm);
                i += 5;
                continue;
            }
            _ if matches!(c.to_ascii_lowercase(), 'y' | 'm' | 'd' | 'h' | 's') => {
                let lower = c.to_ascii_lowercase();
                let run = chars[i..]
                    .iter()
                    .take_while(|x| x.to_ascii_lowercase() == lower)
                    .count();
                tokens.push(match lower {
                    'y' => FormatToken::Year(run),
                    'm' => FormatToken::Month(run),
                    'd' => FormatToken::Day(run),
                    'h' => FormatToken::Hour(run),
                    _ => FormatToken::Second(run),
                });
                i += run;
                continue;
            }
            _ => tokens.push(FormatToken::Literal(c.to_string())),
        }
        i += 1;
    }

    let has_date = tokens.iter().any(FormatToken::is_date_part);
    if !has_date && numeric_symbols {
        return None;
    }
    resolve_minutes(&mut tokens);
    Some(tokens)
}

/// `m`/`mm` right after an hour or right before a second means minutes.
fn resolve_minutes(tokens: &mut [FormatToken]) {
    let parts: Vec<usize> = (0..tokens.len())
        .filter(|&i| tokens[i].is_date_part())
        .collect();
    for (pos, &i) in parts.iter().enumerate() {
        let FormatToken::Month(n) = tokens[i] else {
            continue;
        };
        if n > 2 {
            continue;
        }
        let after_hour = pos > 0 && matches!(tokens[parts[pos - 1]], FormatToken::Hour(_));
        let before_second = parts
            .get(pos + 1)
            .is_some_and(|&j| matches!(tokens[j], FormatToken::Second(_)));
        if after_hour || before_second {
            tokens[i] = FormatToken::Minute(n);
        }
    }
}

/// Render `value` with a format code, or `None` when the code is not a
/// date/time format or a plain digit mask.
fn format_number(value: f64, code: &str) -> Option<String> {
    let tokens = tokenize_format(code)?;
    if tokens.iter().any(FormatToken::is_date_part) {
        format_date(value, &tokens)
    } else if tokens.contains(&FormatToken::Digit) {
        format_digit_mask(value, &tokens)
    } else {
        None
    }
}

fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    // 2958465 is 9999-12-31.
    if !(0.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let days = serial.floor();
    let seconds = ((serial - days) * 86_400.0).round() as i64;
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    epoch
        .checked_add_signed(TimeDelta::try_days(days as i64)?)?
        .checked_add_signed(TimeDelta::try_seconds(seconds)?)
}

fn format_date(serial: f64, tokens: &[FormatToken]) -> Option<String> {
    let dt = serial_to_datetime(serial)?;
    let twelve_hour = tokens.contains(&FormatToken::AmPm);
    let pad = |n: usize, v: u32| if n >= 2 { format!("{:02}", v) } else { v.to_string() };

    let mut out = String::new();
    for token in tokens {
        let piece = match *token {
            FormatToken::Literal(ref text) => text.clone(),
            FormatToken::Digit => "0".to_string(),
            FormatToken::Year(n) if n <= 2 => format!("{:02}", dt.year().rem_euclid(100)),
            FormatToken::Year(_) => format!("{:04}", dt.year()),
            FormatToken::Month(n) if n <= 2 => pad(n, dt.month()),
            FormatToken::Month(3) => dt.format("%b").to_string(),
            FormatToken::Month(5) => dt.format("%b").to_string().chars().take(1).collect(),
            FormatToken::Month(_) => dt.format("%B").to_string(),
            FormatToken::Day(n) if n <= 2 => pad(n, dt.day()),
            FormatToken::Day(3) => dt.format("%a").to_string(),
            FormatToken::Day(_) => dt.format("%A").to_string(),
            FormatToken::Hour(n) if twelve_hour => pad(n, dt.hour12().1),
            FormatToken::Hour(n) => pad(n, dt.hour()),
            FormatToken::Minute(n) => pad(n, dt.minute()),
            FormatToken::Second(n) => pad(n, dt.second()),
            FormatToken::AmPm => dt.format("%p").to_string(),
        };
        out.push_str(&piece);
    }
    Some(out)
}

/// Fill `0` placeholders right to left with the digits of a non-negative
/// integer; surplus digits go before the first placeholder.
fn format_digit_mask(value: f64, tokens: &[FormatToken]) -> Option<String> {
    if value < 0.0 || value.fract() != 0.0 || value >= 1e15 {
        return None;
    }
    let slots = tokens.iter().filter(|t| **t == FormatToken::Digit).count();
    let digits = format!("{:0width$}", value as u64, width = slots);
    let surplus = digits.len() - slots;

    let mut next = digits.chars();
    let mut out = String::new();
    let mut first = true;
    for token in tokens {
        match token {
            FormatToken::Digit => {
                let take = if first { surplus + 1 } else { 1 };
                first = false;
                out.extend(next.by_ref().take(take));
            }
            FormatToken::Literal(text) => out.push_str(text),
            _ => {}
        }
    }
    Some(out)
}

// ============ Rows to records ============

fn rows_to_records(rows: Vec<BTreeMap<usize, String>>) -> Vec<Record> {
    let is_blank = |r: &BTreeMap<usize, String>| r.values().all(|v| v.trim().is_empty());
    let mut rows = rows.into_iter().skip_while(|r| is_blank(r));
    let Some(header_row) = rows.next() else {
        return Vec::new();
    };
    let body: Vec<_> = rows.filter(|r| !is_blank(r)).collect();

    let width = std::iter::once(&header_row)
        .chain(body.iter())
        .filter_map(|r| r.keys().next_back())
        .max()
        .map(|last| last + 1)
        .unwrap_or(0);
    let headers = header_names(&header_row, width);

    body.into_iter()
        .filter_map(|r| {
            Record::from_fields(
                headers
                    .iter()
                    .enumerate()
                    .map(|(i, name)| (name.as_str(), r.get(&i).cloned().unwrap_or_default())),
            )
        })
        .collect()
}

fn header_names(header_row: &BTreeMap<usize, String>, width: usize) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    (0..width)
        .map(|i| {
            let base = header_row
                .get(&i)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("column_{}", i));
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base
            } else {
                format!("{}_{}", base, count)
            };
            *count += 1;
            name
        })
        .collect()
}
