//! Raw tabular input.
//!
//! A [`Dataset`] is an ordered header list plus rows of raw [`Value`] cells,
//! exactly as they came from the source. Nothing here interprets the cells;
//! that is the job of [`crate::schema::normalize()`].

use std::{
    collections::{HashMap, HashSet},
    fmt,
    io::Read,
    path::Path,
};

use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use encoding_rs::Encoding;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    error::{DatasetError, DatasetResult},
    io_utils,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    #[default]
    Missing,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(n) => format_plain_number(*n),
            Value::Missing => String::new(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<Option<f64>> for Value {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Value::Missing, Value::Number)
    }
}

/// Integral values render without a fractional part so `1.0` and `1` read the same.
pub fn format_plain_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Builds a dataset from a header list and positional rows.
    ///
    /// Short rows are padded with [`Value::Missing`]; rows wider than the
    /// header are rejected. A repeated header name gets a `.1`, `.2`, ...
    /// suffix, so only its first occurrence keeps the known column name.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Value>>) -> DatasetResult<Self> {
        let headers = clean_headers(headers)?;
        let width = headers.len();
        let mut padded = Vec::with_capacity(rows.len());
        for (idx, mut row) in rows.into_iter().enumerate() {
            if row.len() > width {
                return Err(DatasetError::RowTooWide {
                    row: idx + 1,
                    expected: width,
                    found: row.len(),
                });
            }
            row.resize(width, Value::Missing);
            padded.push(row);
        }
        Ok(Self {
            headers,
            rows: padded,
        })
    }

    /// Builds a dataset from name/value records.
    ///
    /// The header is the union of all keys in first-seen order; a record that
    /// lacks a key holds [`Value::Missing`] for it.
    pub fn from_records<I, R, K>(records: I) -> DatasetResult<Self>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut headers: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut rows: Vec<Vec<Value>> = Vec::new();
        for record in records {
            let mut row = vec![Value::Missing; headers.len()];
            for (key, value) in record {
                let key = key.into();
                let idx = match positions.get(&key) {
                    Some(idx) => *idx,
                    None => {
                        positions.insert(key.clone(), headers.len());
                        headers.push(key);
                        headers.len() - 1
                    }
                };
                if row.len() <= idx {
                    row.resize(idx + 1, Value::Missing);
                }
                row[idx] = value;
            }
            rows.push(row);
        }
        Self::new(headers, rows)
    }

    /// Reads every record of a CSV stream into memory.
    pub fn from_csv_reader<R>(
        reader: &mut csv::Reader<R>,
        encoding: &'static Encoding,
    ) -> DatasetResult<Self>
    where
        R: Read,
    {
        let header_record = reader.byte_headers()?.clone();
        if header_record.is_empty() {
            return Err(DatasetError::MissingHeader);
        }
        let headers = io_utils::decode_record(&header_record, encoding).ok_or(
            DatasetError::Decode {
                row: 1,
                encoding: encoding.name(),
            },
        )?;

        let mut rows = Vec::new();
        for (row_idx, record) in reader.byte_records().enumerate() {
            let record = record?;
            let decoded =
                io_utils::decode_record(&record, encoding).ok_or(DatasetError::Decode {
                    row: row_idx + 2,
                    encoding: encoding.name(),
                })?;
            if decoded.len() > headers.len() {
                return Err(DatasetError::RowTooWide {
                    row: row_idx + 2,
                    expected: headers.len(),
                    found: decoded.len(),
                });
            }
            rows.push(decoded.into_iter().map(Value::Text).collect());
        }
        debug!("Read {} row(s) across {} column(s)", rows.len(), headers.len());
        Self::new(headers, rows)
    }

    pub fn from_path(
        path: &Path,
        delimiter: u8,
        encoding: &'static Encoding,
    ) -> anyhow::Result<Self> {
        let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
        Self::from_csv_reader(&mut reader, encoding)
            .with_context(|| format!("Reading dataset from {path:?}"))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Iterates one column top to bottom, or `None` when the column is absent.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Value> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }
}

fn clean_headers(headers: Vec<String>) -> DatasetResult<Vec<String>> {
    let mut seen = HashSet::new();
    let mut cleaned = Vec::with_capacity(headers.len());
    for (idx, header) in headers.into_iter().enumerate() {
        let trimmed = header.trim_start_matches('\u{feff}').trim().to_string();
        if trimmed.is_empty() {
            return Err(DatasetError::EmptyHeader { position: idx + 1 });
        }
        let mut name = trimmed.clone();
        let mut suffix = 0;
        while seen.contains(&name) {
            suffix += 1;
            name = format!("{trimmed}.{suffix}");
        }
        if suffix > 0 {
            warn!("Header '{trimmed}' repeats at position {}; renamed to '{name}'", idx + 1);
        }
        seen.insert(name.clone());
        cleaned.push(name);
    }
    Ok(cleaned)
}

pub fn parse_naive_date(value: &str) -> Option<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

pub fn parse_naive_datetime(value: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%m/%d/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%m/%d/%Y %H:%M",
        "%d/%m/%Y %H:%M",
    ];
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Parses an order timestamp down to its calendar date.
///
/// Ambiguous slash dates are read month first; `DD/MM/YYYY` only matches
/// when the first field cannot be a month.
pub fn parse_order_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    parse_naive_date(trimmed)
        .or_else(|| parse_naive_datetime(trimmed).map(|dt| dt.date()))
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|dt| dt.date_naive())
        })
}
