//! Store error types

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading or writing a backing store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable at {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("Write conflict at row {row}: expected '{expected}', found '{found}'")]
    WriteConflict { row: usize, expected: String, found: String },

    #[error("Row {row} out of range (table has {len} rows)")]
    RowOutOfRange { row: usize, len: usize },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Build an `Unavailable` error for a path
    pub fn unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Unavailable {
            path: path.into(),
            source,
        }
    }

    /// Check if the backing resource could not be reached
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. })
    }

    /// Check if this is a row identity conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::WriteConflict { .. })
    }
}
