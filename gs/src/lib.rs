//! GroupStore - tabular record store for road-construction groups
//!
//! Loads a full snapshot of group records from a backing table and writes
//! operator edits back, either one row at a time or as a full rewrite.
//!
//! # Backends
//!
//! ```text
//! CsvStore     delimited text file, row updates keep untouched cells verbatim
//! SqliteStore  `groups` table, partial updates by row index
//! ```
//!
//! Numeric cells are parsed once at this boundary. Malformed values never
//! reach arithmetic: mutable fields default to `0`, coordinates to absent.
//!
//! # Example
//!
//! ```ignore
//! use groupstore::{ColumnMap, CsvStore, DEFAULT_DELIMITER, RecordStore};
//!
//! let store = CsvStore::new("cleaned_data.csv", DEFAULT_DELIMITER, ColumnMap::default());
//! let table = store.load_all()?;
//! for record in &table.records {
//!     println!("{} {}", record.name, record.actual_length);
//! }
//! ```

mod columns;
mod csv_store;
mod error;
mod parse;
mod record;
mod sqlite_store;
mod store;

pub use columns::ColumnMap;
pub use csv_store::CsvStore;
pub use error::{StoreError, StoreResult};
pub use parse::{parse_latitude, parse_longitude, parse_number};
pub use record::{Record, RecordTable};
pub use sqlite_store::SqliteStore;
pub use store::RecordStore;

/// Default field delimiter for CSV stores
pub const DEFAULT_DELIMITER: u8 = b';';

/// Current time in unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
