//! Numeric coercion for loosely formatted spreadsheet exports.
//!
//! Sales exports mix plain numbers, thousands separators, blank cells and
//! null-like tokens in the same column. [`to_numeric()`] folds all of that into
//! `Option<f64>`: a finite float, or `None` when the cell carries no usable
//! number. Coercion never fails and is idempotent.

use crate::data::Value;

/// Tokens that mark an otherwise non-empty cell as having no value.
const PLACEHOLDER_TOKENS: &[&str] = &["", "nan", "none", "null", "na", "n/a", "<na>", "#n/a"];

/// Tokens [`to_numeric()`] treats as missing before attempting a parse.
const NUMERIC_MISSING_TOKENS: &[&str] = &["", "nan", "none"];

pub fn to_numeric(raw: &Value) -> Option<f64> {
    match raw {
        Value::Missing => None,
        Value::Number(n) => finite(*n),
        Value::Text(text) => parse_numeric_text(text),
    }
}

/// Coerces a raw string cell, see [`to_numeric()`].
pub fn parse_numeric_text(text: &str) -> Option<f64> {
    let lowered = text.trim().to_lowercase();
    if NUMERIC_MISSING_TOKENS.contains(&lowered.as_str()) {
        return None;
    }
    let stripped = lowered.replace(',', "");
    stripped.parse::<f64>().ok().and_then(finite)
}

/// Lenient cast for numeric identifiers such as `event_id`.
///
/// Unlike [`to_numeric()`] this does not strip thousands separators: an
/// identifier written as `1,024` is not a number.
pub fn to_identifier_number(raw: &Value) -> Option<f64> {
    match raw {
        Value::Missing => None,
        Value::Number(n) => finite(*n),
        Value::Text(text) => {
            let trimmed = text.trim();
            if is_placeholder(trimmed) {
                return None;
            }
            trimmed.parse::<f64>().ok().and_then(finite)
        }
    }
}

pub fn is_placeholder(text: &str) -> bool {
    let lowered = text.trim().to_ascii_lowercase();
    PLACEHOLDER_TOKENS.contains(&lowered.as_str())
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
