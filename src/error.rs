//! Fatal input errors.
//!
//! Everything that can go wrong with an individual cell or metric is recovered
//! locally (missing values, unavailable metrics). The only failure that reaches
//! the caller is a [`DatasetError`]: the input could not be read as a table.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("input has no header row")]
    MissingHeader,
    #[error("header {position} is empty")]
    EmptyHeader { position: usize },
    #[error("row {row} has {found} field(s) but the header declares {expected}")]
    RowTooWide {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("failed to decode row {row} as {encoding}")]
    Decode { row: usize, encoding: &'static str },
    #[error("malformed CSV input: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type DatasetResult<T> = std::result::Result<T, DatasetError>;
