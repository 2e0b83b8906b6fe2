//! Core data models used throughout Vehicle Lookup.
//!
//! A [`Record`] is one household row from the registration spreadsheet.
//! Vehicle and student columns are numbered in the source (`Placa1`..`Placa5`,
//! `Aluno1`..`Aluno4`); here they live in fixed-size slot arrays so callers
//! iterate slots instead of synthesizing column names.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of vehicle slots per household (`Placa1..5`, `Adesivo1..5`, `Marca/Modelo1..5`).
pub const VEHICLE_SLOTS: usize = 5;
/// Number of student slots per household (`Aluno1..4`, `SÉRIE1..4`).
pub const STUDENT_SLOTS: usize = 4;

const PLATE_PREFIX: &str = "Placa";
const STICKER_PREFIX: &str = "Adesivo";
const MAKE_MODEL_PREFIX: &str = "Marca/Modelo";
const STUDENT_PREFIX: &str = "Aluno";
const GRADE_PREFIX: &str = "SÉRIE";

/// Household-level columns with a fixed name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedField {
    Father,
    Mother,
    Mobile,
    Identification,
    HomePhone,
    FatherEmail,
    MotherEmail,
    RegistrationYear,
}

impl FixedField {
    /// All fixed fields, in display order.
    pub const ALL: [FixedField; 8] = [
        FixedField::Identification,
        FixedField::Father,
        FixedField::Mother,
        FixedField::Mobile,
        FixedField::HomePhone,
        FixedField::FatherEmail,
        FixedField::MotherEmail,
        FixedField::RegistrationYear,
    ];

    /// Column name as it appears in the source spreadsheet.
    pub fn column(&self) -> &'static str {
        match self {
            FixedField::Father => "Pai",
            FixedField::Mother => "Mãe",
            FixedField::Mobile => "Celular",
            FixedField::Identification => "Identificação",
            FixedField::HomePhone => "Telefone Residencial",
            FixedField::FatherEmail => "Email Pai",
            FixedField::MotherEmail => "Email Mãe",
            FixedField::RegistrationYear => "Anocadastro",
        }
    }

    fn from_column(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.column() == name)
    }
}

/// A column name resolved to its place in a [`Record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKey {
    Fixed(FixedField),
    /// Zero-based vehicle slot.
    Plate(usize),
    Sticker(usize),
    MakeModel(usize),
    /// Zero-based student slot.
    Student(usize),
    Grade(usize),
}

impl FieldKey {
    /// Resolve a source column name. Returns `None` for unrecognised columns
    /// and for slot numbers outside `1..=N`.
    pub fn parse(name: &str) -> Option<Self> {
        if let Some(fixed) = FixedField::from_column(name) {
            return Some(FieldKey::Fixed(fixed));
        }
        let indexed: [(&str, usize, fn(usize) -> FieldKey); 5] = [
            (MAKE_MODEL_PREFIX, VEHICLE_SLOTS, FieldKey::MakeModel),
            (STICKER_PREFIX, VEHICLE_SLOTS, FieldKey::Sticker),
            (PLATE_PREFIX, VEHICLE_SLOTS, FieldKey::Plate),
            (STUDENT_PREFIX, STUDENT_SLOTS, FieldKey::Student),
            (GRADE_PREFIX, STUDENT_SLOTS, FieldKey::Grade),
        ];
        for (prefix, slots, ctor) in indexed {
            if let Some(rest) = name.strip_prefix(prefix) {
                if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                let n: usize = rest.parse().ok()?;
                if (1..=slots).contains(&n) {
                    return Some(ctor(n - 1));
                }
                return None;
            }
        }
        None
    }

    /// Column name for this key (`Placa1`, `Pai`, ...).
    pub fn column(&self) -> String {
        match self {
            FieldKey::Fixed(f) => f.column().to_string(),
            FieldKey::Plate(i) => format!("{}{}", PLATE_PREFIX, i + 1),
            FieldKey::Sticker(i) => format!("{}{}", STICKER_PREFIX, i + 1),
            FieldKey::MakeModel(i) => format!("{}{}", MAKE_MODEL_PREFIX, i + 1),
            FieldKey::Student(i) => format!("{}{}", STUDENT_PREFIX, i + 1),
            FieldKey::Grade(i) => format!("{}{}", GRADE_PREFIX, i + 1),
        }
    }
}

/// One registered vehicle. Empty strings are absent values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VehicleSlot {
    pub plate: String,
    pub sticker: String,
    pub make_model: String,
}

/// One enrolled student.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentSlot {
    pub name: String,
    pub grade: String,
}

/// A household registration row.
///
/// Serialises as a flat JSON object keyed by source column name, which is the
/// shape persisted in the cache. Empty values are omitted on output and read
/// back as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct Record {
    fixed: [String; 8],
    /// Vehicle slots; `None` when the slot has no data at all.
    pub vehicles: [Option<VehicleSlot>; VEHICLE_SLOTS],
    /// Student slots; `None` when the slot has no data at all.
    pub students: [Option<StudentSlot>; STUDENT_SLOTS],
    /// Columns with no dedicated place, kept so nothing is lost in the cache.
    pub extra: BTreeMap<String, String>,
}

impl Record {
    /// Build a record from `(column, value)` pairs.
    ///
    /// Later duplicates overwrite earlier ones. Returns `None` when every
    /// value is blank: a household must carry at least one value.
    pub fn from_fields<I, K, V>(fields: I) -> Option<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut record = Record::default();
        for (name, value) in fields {
            record.set(name.as_ref().trim(), value.into());
        }
        if record.is_blank() {
            None
        } else {
            Some(record)
        }
    }

    /// Value of a fixed household field (`""` when absent).
    pub fn fixed(&self, field: FixedField) -> &str {
        &self.fixed[Self::fixed_index(field)]
    }

    /// Value for any resolved key (`""` when absent).
    pub fn get(&self, key: FieldKey) -> &str {
        match key {
            FieldKey::Fixed(f) => self.fixed(f),
            FieldKey::Plate(i) => self.vehicle(i).map(|v| v.plate.as_str()).unwrap_or(""),
            FieldKey::Sticker(i) => self.vehicle(i).map(|v| v.sticker.as_str()).unwrap_or(""),
            FieldKey::MakeModel(i) => self
                .vehicle(i)
                .map(|v| v.make_model.as_str())
                .unwrap_or(""),
            FieldKey::Student(i) => self.student(i).map(|s| s.name.as_str()).unwrap_or(""),
            FieldKey::Grade(i) => self.student(i).map(|s| s.grade.as_str()).unwrap_or(""),
        }
    }

    /// Value by source column name, including unrecognised columns.
    pub fn get_column(&self, name: &str) -> &str {
        match FieldKey::parse(name) {
            Some(key) => self.get(key),
            None => self.extra.get(name).map(String::as_str).unwrap_or(""),
        }
    }

    /// Set a value by column name. Empty values clear the field.
    pub fn set(&mut self, name: &str, value: String) {
        let Some(key) = FieldKey::parse(name) else {
            if value.is_empty() {
                self.extra.remove(name);
            } else {
                self.extra.insert(name.to_string(), value);
            }
            return;
        };
        match key {
            FieldKey::Fixed(f) => self.fixed[Self::fixed_index(f)] = value,
            FieldKey::Plate(i) => self.vehicle_mut(i, |v| v.plate = value),
            FieldKey::Sticker(i) => self.vehicle_mut(i, |v| v.sticker = value),
            FieldKey::MakeModel(i) => self.vehicle_mut(i, |v| v.make_model = value),
            FieldKey::Student(i) => self.student_mut(i, |s| s.name = value),
            FieldKey::Grade(i) => self.student_mut(i, |s| s.grade = value),
        }
    }

    pub fn vehicle(&self, slot: usize) -> Option<&VehicleSlot> {
        self.vehicles.get(slot).and_then(Option::as_ref)
    }

    pub fn student(&self, slot: usize) -> Option<&StudentSlot> {
        self.students.get(slot).and_then(Option::as_ref)
    }

    /// Non-empty `(column, value)` pairs in display order: household fields,
    /// vehicle slots, student slots, then any extra columns.
    pub fn fields(&self) -> Vec<(String, &str)> {
        let mut out = Vec::new();
        for f in FixedField::ALL {
            out.push((f.column().to_string(), self.fixed(f)));
        }
        for i in 0..VEHICLE_SLOTS {
            for key in [FieldKey::Plate(i), FieldKey::Sticker(i), FieldKey::MakeModel(i)] {
                out.push((key.column(), self.get(key)));
            }
        }
        for i in 0..STUDENT_SLOTS {
            for key in [FieldKey::Student(i), FieldKey::Grade(i)] {
                out.push((key.column(), self.get(key)));
            }
        }
        for (k, v) in &self.extra {
            out.push((k.clone(), v.as_str()));
        }
        out.retain(|(_, v)| !v.is_empty());
        out
    }

    fn is_blank(&self) -> bool {
        self.fields().iter().all(|(_, v)| v.trim().is_empty())
    }

    fn fixed_index(field: FixedField) -> usize {
        FixedField::ALL
            .iter()
            .position(|f| *f == field)
            .unwrap_or_default()
    }

    fn vehicle_mut(&mut self, slot: usize, apply: impl FnOnce(&mut VehicleSlot)) {
        let entry = &mut self.vehicles[slot];
        let mut v = entry.take().unwrap_or_default();
        apply(&mut v);
        if !(v.plate.is_empty() && v.sticker.is_empty() && v.make_model.is_empty()) {
            *entry = Some(v);
        }
    }

    fn student_mut(&mut self, slot: usize, apply: impl FnOnce(&mut StudentSlot)) {
        let entry = &mut self.students[slot];
        let mut s = entry.take().unwrap_or_default();
        apply(&mut s);
        if !(s.name.is_empty() && s.grade.is_empty()) {
            *entry = Some(s);
        }
    }
}

/// Error raised when a persisted record object carries no values.
#[derive(Debug, thiserror::Error)]
#[error("record has no non-empty fields")]
pub struct BlankRecord;

impl TryFrom<BTreeMap<String, String>> for Record {
    type Error = BlankRecord;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        Record::from_fields(map).ok_or(BlankRecord)
    }
}

impl From<Record> for BTreeMap<String, String> {
    fn from(record: Record) -> Self {
        record
            .fields()
            .into_iter()
            .map(|(k, v)| (k, v.to_string()))
            .collect()
    }
}

/// Where the current working set came from. Display metadata only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    FastFeed,
    Spreadsheet,
    Cache,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::FastFeed => write!(f, "fast-feed"),
            Provenance::Spreadsheet => write!(f, "spreadsheet"),
            Provenance::Cache => write!(f, "cache"),
        }
    }
}

/// The last successfully synchronised record set, as loaded from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub records: Vec<Record>,
    pub version: String,
    pub captured_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_indexed_columns() {
        assert_eq!(FieldKey::parse("Placa1"), Some(FieldKey::Plate(0)));
        assert_eq!(FieldKey::parse("Adesivo5"), Some(FieldKey::Sticker(4)));
        assert_eq!(FieldKey::parse("Marca/Modelo3"), Some(FieldKey::MakeModel(2)));
        assert_eq!(FieldKey::parse("Aluno4"), Some(FieldKey::Student(3)));
        assert_eq!(FieldKey::parse("SÉRIE2"), Some(FieldKey::Grade(1)));
        assert_eq!(
            FieldKey::parse("Mãe"),
            Some(FieldKey::Fixed(FixedField::Mother))
        );
    }

    #[test]
    fn test_parse_rejects_out_of_range_slots() {
        assert_eq!(FieldKey::parse("Placa0"), None);
        assert_eq!(FieldKey::parse("Placa6"), None);
        assert_eq!(FieldKey::parse("Aluno5"), None);
        assert_eq!(FieldKey::parse("Placa"), None);
        assert_eq!(FieldKey::parse("PlacaX"), None);
    }

    #[test]
    fn test_column_names_round_trip_through_parse() {
        for key in [
            FieldKey::Plate(4),
            FieldKey::MakeModel(0),
            FieldKey::Grade(3),
            FieldKey::Fixed(FixedField::HomePhone),
        ] {
            assert_eq!(FieldKey::parse(&key.column()), Some(key));
        }
    }

    #[test]
    fn test_sparse_slots_stay_absent() {
        let r = Record::from_fields([("Placa2", "ABC1234"), ("Aluno3", "Ana")]).unwrap();
        assert!(r.vehicle(0).is_none());
        assert_eq!(r.vehicle(1).unwrap().plate, "ABC1234");
        assert_eq!(r.get(FieldKey::Sticker(1)), "");
        assert_eq!(r.student(2).unwrap().name, "Ana");
        assert!(r.student(3).is_none());
    }

    #[test]
    fn test_blank_rows_are_rejected() {
        assert!(Record::from_fields([("Placa1", ""), ("Pai", "  ")]).is_none());
        assert!(Record::from_fields(Vec::<(String, String)>::new()).is_none());
    }

    #[test]
    fn test_unknown_columns_are_kept() {
        let r = Record::from_fields([("Observação", "portão 2"), ("Pai", "João")]).unwrap();
        assert_eq!(r.get_column("Observação"), "portão 2");
        assert_eq!(r.fixed(FixedField::Father), "João");
    }

    #[test]
    fn test_json_shape_is_flat_object() {
        let r = Record::from_fields([("Placa1", "ABC1234"), ("Mãe", "Maria")]).unwrap();
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "Placa1": "ABC1234", "Mãe": "Maria" })
        );
        let back: Record = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_blank_json_object_fails_to_deserialize() {
        let err = serde_json::from_str::<Record>("{}");
        assert!(err.is_err());
    }

    #[test]
    fn test_provenance_display() {
        assert_eq!(Provenance::FastFeed.to_string(), "fast-feed");
        assert_eq!(
            serde_json::to_string(&Provenance::Spreadsheet).unwrap(),
            "\"spreadsheet\""
        );
    }
}
