//! Multi-field household search.
//!
//! A linear, case-insensitive scan over the in-memory working set. There is
//! no index and no ranking: results keep the order of the input.
//!
//! # Field groups
//!
//! | Mode | Fields scanned, in order |
//! |------|--------------------------|
//! | [`SearchMode::StickersOnly`] | `Adesivo1..5` |
//! | [`SearchMode::AllFields`] | `Placa1..5`, `Adesivo1..5`, `Marca/Modelo1..5`, `Aluno1..4`, `Pai`/`Mãe`/`Identificação`, `Email Pai`/`Email Mãe`/`Celular`/`Telefone Residencial` |
//!
//! A record matches when any scanned field matches; the scan stops at the
//! first hit. The order only affects how early the scan stops.
//!
//! Matching lower-cases both sides and performs no diacritic folding, so
//! `"mae"` does not match `"Mãe"`.

use std::fmt;
use std::str::FromStr;

use crate::models::{FieldKey, FixedField, Record, STUDENT_SLOTS, VEHICLE_SLOTS};

/// Which fields a query is matched against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchMode {
    #[default]
    AllFields,
    StickersOnly,
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" | "all-fields" => Ok(SearchMode::AllFields),
            "stickers" | "stickers-only" => Ok(SearchMode::StickersOnly),
            other => Err(format!(
                "Unknown search mode: '{}'. Use all or stickers.",
                other
            )),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::AllFields => write!(f, "all"),
            SearchMode::StickersOnly => write!(f, "stickers"),
        }
    }
}

/// How a field value is compared with the query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strictness {
    /// Substring containment.
    #[default]
    Partial,
    /// Whole-value equality.
    Exact,
}

impl Strictness {
    pub fn from_exact(exact: bool) -> Self {
        if exact {
            Strictness::Exact
        } else {
            Strictness::Partial
        }
    }
}

/// Filter `records` by `query`, preserving input order.
///
/// A blank query (after trimming) returns every record unchanged.
pub fn filter<'a>(
    records: &'a [Record],
    query: &str,
    mode: SearchMode,
    strictness: Strictness,
) -> Vec<&'a Record> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return records.iter().collect();
    }
    records
        .iter()
        .filter(|r| matches(r, &needle, mode, strictness))
        .collect()
}

/// Whether a single record matches an already trimmed, lower-cased needle.
pub fn matches(record: &Record, needle: &str, mode: SearchMode, strictness: Strictness) -> bool {
    match mode {
        // Sticker values are compared trimmed: stickers are typed by hand and
        // often carry stray whitespace.
        SearchMode::StickersOnly => sticker_keys()
            .any(|key| field_matches(record.get(key).trim(), needle, strictness)),
        SearchMode::AllFields => all_field_keys()
            .any(|key| field_matches(record.get(key), needle, strictness)),
    }
}

fn field_matches(value: &str, needle: &str, strictness: Strictness) -> bool {
    if value.is_empty() {
        return false;
    }
    let value = value.to_lowercase();
    match strictness {
        Strictness::Exact => value == needle,
        Strictness::Partial => value.contains(needle),
    }
}

fn sticker_keys() -> impl Iterator<Item = FieldKey> {
    (0..VEHICLE_SLOTS).map(FieldKey::Sticker)
}

fn all_field_keys() -> impl Iterator<Item = FieldKey> {
    let plates = (0..VEHICLE_SLOTS).map(FieldKey::Plate);
    let makes = (0..VEHICLE_SLOTS).map(FieldKey::MakeModel);
    let students = (0..STUDENT_SLOTS).map(FieldKey::Student);
    let guardians = [
        FixedField::Father,
        FixedField::Mother,
        FixedField::Identification,
    ];
    let contacts = [
        FixedField::FatherEmail,
        FixedField::MotherEmail,
        FixedField::Mobile,
        FixedField::HomePhone,
    ];
    plates
        .chain(sticker_keys())
        .chain(makes)
        .chain(students)
        .chain(guardians.into_iter().map(FieldKey::Fixed))
        .chain(contacts.into_iter().map(FieldKey::Fixed))
}
