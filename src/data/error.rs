//! Errors raised while loading source tables.

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::Condition;

/// A recoverable problem with one input table.
///
/// Every variant names the table it concerns so the caller can report it
/// and decide whether to fall back to sample data.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("data unavailable: {}: {source}", .path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse CSV {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: missing required column '{column}'", .path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("{}: no date columns found", .path.display())]
    NoDateColumns { path: PathBuf },

    #[error("{}:{line}: invalid value '{value}' in column '{column}'", .path.display())]
    Malformed {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },

    #[error("{}: column '{column}' repeats date {date}", .path.display())]
    DuplicateDate {
        path: PathBuf,
        column: String,
        date: NaiveDate,
    },

    #[error("{condition} table has a different date axis than confirmed")]
    DateAxisMismatch { condition: Condition },

    #[error("expected the {expected} table, found {found}")]
    ConditionMismatch {
        expected: Condition,
        found: Condition,
    },
}

impl DataError {
    /// True when the file itself could not be read, as opposed to a file
    /// that was read but had the wrong shape.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DataError::Unavailable { .. })
    }
}
