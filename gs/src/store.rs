//! RecordStore trait - the contract every backing store implements

use crate::error::StoreResult;
use crate::record::{Record, RecordTable};

/// A tabular backing store holding the system of record
///
/// Implementations are constructed explicitly and handed to whoever needs
/// them; there is no process-wide store.
pub trait RecordStore {
    /// Load every row as a typed snapshot
    fn load_all(&self) -> StoreResult<RecordTable>;

    /// Write the mutable fields of a single row
    ///
    /// The row at `row` must still carry `record.name`, otherwise the call
    /// fails with `WriteConflict` and nothing is written.
    fn save_one(&self, record: &Record, row: usize) -> StoreResult<()>;

    /// Overwrite the whole table
    fn save_all(&self, table: &RecordTable) -> StoreResult<()>;

    /// Whether `save_one` touches only one row instead of rewriting the table
    fn supports_partial_update(&self) -> bool;

    /// Short human-readable location, for logs and status lines
    fn describe(&self) -> String;
}

impl<S: RecordStore + ?Sized> RecordStore for Box<S> {
    fn load_all(&self) -> StoreResult<RecordTable> {
        (**self).load_all()
    }

    fn save_one(&self, record: &Record, row: usize) -> StoreResult<()> {
        (**self).save_one(record, row)
    }

    fn save_all(&self, table: &RecordTable) -> StoreResult<()> {
        (**self).save_all(table)
    }

    fn supports_partial_update(&self) -> bool {
        (**self).supports_partial_update()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
