//! Editing session - one loaded snapshot, one store, one edit at a time
//!
//! The session owns the store it was handed at startup. An edit is applied to
//! the in-memory table, then persisted; if persistence fails the record is
//! restored to its pre-edit value and the failure is returned to the caller.

use groupstore::{Record, RecordStore, RecordTable, StoreError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::engine::{ProgressBasis, Severity, apply_edit, classify, recompute};

/// Errors surfaced by session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No group named '{0}'")]
    UnknownGroup(String),

    #[error("Row {row} no longer holds '{name}'")]
    StaleRow { row: usize, name: String },

    #[error("Failed to save '{name}', edit rolled back: {source}")]
    SaveFailed {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a committed edit changed
#[derive(Debug, Clone, PartialEq)]
pub struct EditOutcome {
    /// Row index of the edited record
    pub row: usize,
    /// Record before the edit
    pub previous: Record,
    /// Record as persisted
    pub updated: Record,
    /// Whether the store rewrote the whole table
    pub full_rewrite: bool,
}

impl EditOutcome {
    pub fn severity_before(&self) -> Severity {
        classify(self.previous.progress_percent)
    }

    pub fn severity_after(&self) -> Severity {
        classify(self.updated.progress_percent)
    }
}

/// A loaded snapshot bound to its backing store
pub struct Session<S: RecordStore> {
    store: S,
    basis: ProgressBasis,
    table: RecordTable,
}

impl<S: RecordStore> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("store", &self.store.describe())
            .field("basis", &self.basis)
            .field("rows", &self.table.len())
            .finish()
    }
}

impl<S: RecordStore> Session<S> {
    /// Load every record and recompute progress from current fields
    pub fn load(store: S, basis: ProgressBasis) -> Result<Self, SessionError> {
        debug!(store = %store.describe(), %basis, "Session::load: called");
        let mut table = store.load_all()?;
        for record in &mut table.records {
            recompute(record, basis);
        }
        info!(store = %store.describe(), rows = table.len(), %basis, "Session loaded");
        Ok(Self { store, basis, table })
    }

    /// Discard the in-memory snapshot and load again
    pub fn reload(&mut self) -> Result<(), SessionError> {
        let mut table = self.store.load_all()?;
        for record in &mut table.records {
            recompute(record, self.basis);
        }
        debug!(rows = table.len(), "Session::reload: done");
        self.table = table;
        Ok(())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn basis(&self) -> ProgressBasis {
        self.basis
    }

    pub fn table(&self) -> &RecordTable {
        &self.table
    }

    pub fn records(&self) -> &[Record] {
        &self.table.records
    }

    pub fn find(&self, name: &str) -> Option<(usize, &Record)> {
        self.table.find(name)
    }

    /// Compute what an edit would produce without applying it
    pub fn preview_edit(&self, name: &str, actual_length: f64, absorbed_funds: f64) -> Result<Record, SessionError> {
        let (_, record) = self
            .find(name)
            .ok_or_else(|| SessionError::UnknownGroup(name.to_string()))?;
        Ok(apply_edit(record, self.basis, actual_length, absorbed_funds))
    }

    /// Apply an edit to the first record named `name` and persist it
    pub fn commit_edit(
        &mut self,
        name: &str,
        actual_length: f64,
        absorbed_funds: f64,
    ) -> Result<EditOutcome, SessionError> {
        let (row, _) = self
            .find(name)
            .ok_or_else(|| SessionError::UnknownGroup(name.to_string()))?;
        self.commit_edit_at(row, name, actual_length, absorbed_funds)
    }

    /// Apply an edit to the record at `row` and persist it
    ///
    /// The row must still carry `name`. Uses `save_one` when the store can
    /// update a single row, otherwise rewrites the table. On a failed write
    /// the in-memory record is restored.
    pub fn commit_edit_at(
        &mut self,
        row: usize,
        name: &str,
        actual_length: f64,
        absorbed_funds: f64,
    ) -> Result<EditOutcome, SessionError> {
        debug!(row, %name, actual_length, absorbed_funds, "Session::commit_edit_at: called");
        let previous = match self.table.get(row) {
            Some(record) if record.name == name => record.clone(),
            _ => {
                return Err(SessionError::StaleRow {
                    row,
                    name: name.to_string(),
                });
            }
        };
        let updated = apply_edit(&previous, self.basis, actual_length, absorbed_funds);

        self.table.replace(row, updated.clone())?;

        let full_rewrite = !self.store.supports_partial_update();
        let result = if full_rewrite {
            debug!(row, "Session::commit_edit_at: store has no partial update, rewriting table");
            self.store.save_all(&self.table)
        } else {
            debug!(row, "Session::commit_edit_at: saving single row");
            self.store.save_one(&updated, row)
        };

        if let Err(source) = result {
            warn!(%name, row, error = %source, "Save failed, restoring previous values");
            self.table.replace(row, previous)?;
            return Err(SessionError::SaveFailed {
                name: name.to_string(),
                source,
            });
        }

        info!(
            %name,
            row,
            progress = updated.progress_percent,
            severity = %classify(updated.progress_percent),
            "Edit saved"
        );
        Ok(EditOutcome {
            row,
            previous,
            updated,
            full_rewrite,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupstore::{ColumnMap, CsvStore, SqliteStore, StoreResult};
    use std::cell::{Cell, RefCell};
    use tempfile::TempDir;

    /// In-memory store that can be told to fail writes
    struct FlakyStore {
        table: RefCell<RecordTable>,
        partial: bool,
        fail_writes: Cell<bool>,
        saves: Cell<usize>,
    }

    impl FlakyStore {
        fn new(partial: bool) -> Self {
            let mut stale = Record::new("Kelompok A", 100.0, 1000.0);
            stale.progress_percent = 87.0;
            Self {
                table: RefCell::new(RecordTable::new(
                    Vec::new(),
                    vec![stale, Record::new("Kelompok B", 0.0, 0.0)],
                )),
                partial,
                fail_writes: Cell::new(false),
                saves: Cell::new(0),
            }
        }

        fn check(&self) -> StoreResult<()> {
            if self.fail_writes.get() {
                return Err(StoreError::unavailable(
                    "flaky",
                    std::io::Error::new(std::io::ErrorKind::BrokenPipe, "connection dropped"),
                ));
            }
            self.saves.set(self.saves.get() + 1);
            Ok(())
        }
    }

    impl RecordStore for FlakyStore {
        fn load_all(&self) -> StoreResult<RecordTable> {
            Ok(self.table.borrow().clone())
        }

        fn save_one(&self, record: &Record, row: usize) -> StoreResult<()> {
            self.check()?;
            self.table.borrow_mut().replace(row, record.clone())?;
            Ok(())
        }

        fn save_all(&self, table: &RecordTable) -> StoreResult<()> {
            self.check()?;
            *self.table.borrow_mut() = table.clone();
            Ok(())
        }

        fn supports_partial_update(&self) -> bool {
            self.partial
        }

        fn describe(&self) -> String {
            "flaky".to_string()
        }
    }

    #[test]
    fn test_load_recomputes_stored_progress() {
        let session = Session::load(FlakyStore::new(true), ProgressBasis::ActualLength).unwrap();
        assert_eq!(session.records()[0].progress_percent, 0.0);
    }

    #[test]
    fn test_commit_edit_partial_store() {
        let mut session = Session::load(FlakyStore::new(true), ProgressBasis::ActualLength).unwrap();
        let outcome = session.commit_edit("Kelompok A", 25.0, 100.0).unwrap();

        assert_eq!(outcome.row, 0);
        assert!(!outcome.full_rewrite);
        assert_eq!(outcome.updated.progress_percent, 25.0);
        assert_eq!(outcome.severity_before(), Severity::Critical);
        assert_eq!(outcome.severity_after(), Severity::Low);
        assert_eq!(session.records()[0].actual_length, 25.0);
        assert_eq!(session.store().table.borrow().records[0].actual_length, 25.0);
    }

    #[test]
    fn test_commit_edit_full_rewrite_store() {
        let mut session = Session::load(FlakyStore::new(false), ProgressBasis::ActualLength).unwrap();
        let outcome = session.commit_edit("Kelompok B", 10.0, 0.0).unwrap();
        assert!(outcome.full_rewrite);
        assert_eq!(outcome.updated.progress_percent, 0.0);
        assert_eq!(outcome.severity_after(), Severity::Critical);
        assert_eq!(session.store().saves.get(), 1);
    }

    #[test]
    fn test_failed_save_restores_record() {
        let mut session = Session::load(FlakyStore::new(true), ProgressBasis::ActualLength).unwrap();
        session.store().fail_writes.set(true);

        let before = session.records()[0].clone();
        let err = session.commit_edit("Kelompok A", 80.0, 5.0).unwrap_err();
        assert!(matches!(err, SessionError::SaveFailed { .. }));
        assert_eq!(session.records()[0], before);
    }

    #[test]
    fn test_unknown_group() {
        let mut session = Session::load(FlakyStore::new(true), ProgressBasis::ActualLength).unwrap();
        let err = session.commit_edit("Kelompok Z", 1.0, 1.0).unwrap_err();
        assert!(matches!(err, SessionError::UnknownGroup(ref n) if n == "Kelompok Z"));
        assert!(session.preview_edit("Kelompok Z", 1.0, 1.0).is_err());
    }

    #[test]
    fn test_commit_edit_at_targets_duplicate_row() {
        let store = FlakyStore::new(true);
        store.table.borrow_mut().records[1].name = "Kelompok A".to_string();
        let mut session = Session::load(store, ProgressBasis::ActualLength).unwrap();

        let outcome = session.commit_edit_at(1, "Kelompok A", 50.0, 0.0).unwrap();
        assert_eq!(outcome.row, 1);
        assert_eq!(session.records()[0].actual_length, 0.0);
        assert_eq!(session.records()[1].actual_length, 50.0);
        assert_eq!(session.store().table.borrow().records[0].actual_length, 0.0);
        assert_eq!(session.store().table.borrow().records[1].actual_length, 50.0);
    }

    #[test]
    fn test_commit_edit_at_rejects_mismatched_row() {
        let mut session = Session::load(FlakyStore::new(true), ProgressBasis::ActualLength).unwrap();
        let err = session.commit_edit_at(1, "Kelompok A", 5.0, 0.0).unwrap_err();
        assert!(matches!(err, SessionError::StaleRow { row: 1, .. }));
        let err = session.commit_edit_at(9, "Kelompok A", 5.0, 0.0).unwrap_err();
        assert!(matches!(err, SessionError::StaleRow { row: 9, .. }));
        assert_eq!(session.store().saves.get(), 0);
    }

    #[test]
    fn test_preview_does_not_mutate() {
        let session = Session::load(FlakyStore::new(true), ProgressBasis::ActualLength).unwrap();
        let preview = session.preview_edit("Kelompok A", 50.0, 0.0).unwrap();
        assert_eq!(preview.progress_percent, 50.0);
        assert_eq!(session.records()[0].actual_length, 0.0);
    }

    #[test]
    fn test_commit_edit_is_idempotent() {
        let mut session = Session::load(FlakyStore::new(true), ProgressBasis::AbsorbedFunds).unwrap();
        let first = session.commit_edit("Kelompok A", 10.0, 500.0).unwrap();
        let second = session.commit_edit("Kelompok A", 10.0, 500.0).unwrap();
        assert_eq!(first.updated, second.updated);
        assert_eq!(second.updated.progress_percent, 50.0);
    }

    #[test]
    fn test_csv_round_trip_through_session() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("groups.csv");
        std::fs::write(
            &path,
            "NAMA KELOMPOK;X;Y;Usulan Panjang (m);KEBUTUHAN ANGGARAN\nKelompok A;-6.9;107.6;100;1000\n",
        )
        .unwrap();

        let store = CsvStore::new(&path, b';', ColumnMap::default());
        let mut session = Session::load(store, ProgressBasis::ActualLength).unwrap();
        session.commit_edit("Kelompok A", 25.0, 300.0).unwrap();

        session.reload().unwrap();
        let record = &session.records()[0];
        assert_eq!(record.actual_length, 25.0);
        assert_eq!(record.absorbed_funds, 300.0);
        assert_eq!(record.progress_percent, 25.0);
    }

    #[test]
    fn test_csv_edit_leaves_unedited_rows_untouched() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("groups.csv");
        std::fs::write(
            &path,
            "NAMA KELOMPOK;X;Y;Usulan Panjang (m);KEBUTUHAN ANGGARAN\nA;-6.9;107.6;100;1000\nB;n/a;107.6;1.250;1.500.000\n",
        )
        .unwrap();

        let store = CsvStore::new(&path, b';', ColumnMap::default());
        let mut session = Session::load(store, ProgressBasis::ActualLength).unwrap();
        let outcome = session.commit_edit("A", 25.0, 0.0).unwrap();
        assert!(!outcome.full_rewrite);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[1], "A;-6.9;107.6;100;1000;25;0;25");
        assert_eq!(lines[2], "B;n/a;107.6;1.250;1.500.000;0;0;0");
    }

    #[test]
    fn test_sqlite_store_uses_single_row_save() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .save_all(&RecordTable::new(
                Vec::new(),
                vec![Record::new("Kelompok A", 50.0, 10.0)],
            ))
            .unwrap();

        let mut session = Session::load(store, ProgressBasis::ActualLength).unwrap();
        let outcome = session.commit_edit("Kelompok A", 60.0, 0.0).unwrap();
        assert!(!outcome.full_rewrite);
        assert_eq!(outcome.severity_after(), Severity::Complete);
        assert_eq!(session.store().load_all().unwrap().records[0].progress_percent, 120.0);
    }
}
