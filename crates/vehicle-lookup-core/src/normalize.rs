//! Cell value normalization.
//!
//! Spreadsheet cells arrive as JSON values of any type (numbers, booleans,
//! strings, nulls). Everything downstream, search in particular, works on
//! plain strings, so every value is coerced here and this never fails.

use serde_json::{Number, Value};

/// Largest integer an IEEE-754 double represents exactly (2^53).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Coerce any cell value to its canonical string form.
///
/// `null` becomes `""`. Whole floating-point numbers render without a
/// decimal point (`2023.0` → `"2023"`), matching how the source spreadsheet
/// displays them.
pub fn normalize(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => normalize_number(n),
        Value::Array(items) => items.iter().map(normalize).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Like [`normalize`], treating a missing value as `null`.
pub fn normalize_opt(value: Option<&Value>) -> String {
    value.map(normalize).unwrap_or_default()
}

fn normalize_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < MAX_SAFE_INTEGER => {
            format!("{}", f as i64)
        }
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}
