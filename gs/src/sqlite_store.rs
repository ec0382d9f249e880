//! SQLite backing store with single-row updates

use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::record::{Record, RecordTable};
use crate::store::RecordStore;

/// A SQLite database holding groups in a `groups` table keyed by row index
pub struct SqliteStore {
    db: Connection,
    path: PathBuf,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").field("path", &self.path).finish()
    }
}

impl SqliteStore {
    /// Open an existing database
    ///
    /// A missing file is `Unavailable`; nothing is created on disk.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(StoreError::unavailable(
                &path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "database file does not exist"),
            ));
        }
        let db = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::init_schema(&db)?;
        debug!(?path, "SqliteStore: opened");
        Ok(Self { db, path })
    }

    /// Open a database, creating the file if needed
    pub fn create(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            return Err(StoreError::unavailable(
                &path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "parent directory does not exist"),
            ));
        }
        let db = Connection::open(&path)?;
        Self::init_schema(&db)?;
        info!(?path, "SqliteStore: created");
        Ok(Self { db, path })
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let db = Connection::open_in_memory()?;
        Self::init_schema(&db)?;
        Ok(Self {
            db,
            path: PathBuf::from(":memory:"),
        })
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS groups (
                row_index INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                latitude REAL,
                longitude REAL,
                proposed_length REAL NOT NULL DEFAULT 0,
                budget_required REAL NOT NULL DEFAULT 0,
                actual_length REAL NOT NULL DEFAULT 0,
                absorbed_funds REAL NOT NULL DEFAULT 0,
                progress_percent REAL NOT NULL DEFAULT 0,
                extra TEXT NOT NULL DEFAULT '{}',
                updated_at INTEGER
            );

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
    }

    fn row_count(&self) -> StoreResult<usize> {
        let count: i64 = self.db.query_row("SELECT COUNT(*) FROM groups", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn load_headers(&self) -> StoreResult<Vec<String>> {
        let raw: Option<String> = self
            .db
            .query_row("SELECT value FROM meta WHERE key = 'headers'", [], |row| row.get(0))
            .optional()?;
        match raw {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }
}

impl RecordStore for SqliteStore {
    fn load_all(&self) -> StoreResult<RecordTable> {
        let mut stmt = self.db.prepare(
            "SELECT name, latitude, longitude, proposed_length, budget_required,
                    actual_length, absorbed_funds, progress_percent, extra
             FROM groups ORDER BY row_index",
        )?;

        let rows = stmt.query_map([], |row| {
            let extra: String = row.get(8)?;
            Ok((
                Record {
                    name: row.get(0)?,
                    latitude: row.get(1)?,
                    longitude: row.get(2)?,
                    proposed_length: row.get(3)?,
                    budget_required: row.get(4)?,
                    actual_length: row.get(5)?,
                    absorbed_funds: row.get(6)?,
                    progress_percent: row.get(7)?,
                    extra: BTreeMap::new(),
                    source: BTreeMap::new(),
                },
                extra,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (mut record, extra) = row?;
            record.extra = serde_json::from_str(&extra)?;
            records.push(record);
        }

        debug!(path = ?self.path, rows = records.len(), "SqliteStore: loaded table");
        Ok(RecordTable::new(self.load_headers()?, records))
    }

    fn save_one(&self, record: &Record, row: usize) -> StoreResult<()> {
        let changed = self.db.execute(
            "UPDATE groups
             SET actual_length = ?1, absorbed_funds = ?2, progress_percent = ?3, updated_at = ?4
             WHERE row_index = ?5 AND name = ?6",
            params![
                record.actual_length,
                record.absorbed_funds,
                record.progress_percent,
                crate::now_ms(),
                row as i64,
                record.name,
            ],
        )?;

        if changed == 0 {
            let found: Option<String> = self
                .db
                .query_row("SELECT name FROM groups WHERE row_index = ?1", params![row as i64], |r| {
                    r.get(0)
                })
                .optional()?;
            return Err(match found {
                Some(found) => StoreError::WriteConflict {
                    row,
                    expected: record.name.clone(),
                    found,
                },
                None => StoreError::RowOutOfRange {
                    row,
                    len: self.row_count()?,
                },
            });
        }

        info!(name = %record.name, row, "SqliteStore: saved row");
        Ok(())
    }

    fn save_all(&self, table: &RecordTable) -> StoreResult<()> {
        let tx = self.db.unchecked_transaction()?;
        tx.execute("DELETE FROM groups", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO groups (row_index, name, latitude, longitude, proposed_length, budget_required,
                                     actual_length, absorbed_funds, progress_percent, extra, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            let now = crate::now_ms();
            for (row, record) in table.records.iter().enumerate() {
                insert.execute(params![
                    row as i64,
                    record.name,
                    record.latitude,
                    record.longitude,
                    record.proposed_length,
                    record.budget_required,
                    record.actual_length,
                    record.absorbed_funds,
                    record.progress_percent,
                    serde_json::to_string(&record.extra)?,
                    now,
                ])?;
            }
        }
        tx.execute(
            "INSERT INTO meta (key, value) VALUES ('headers', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![serde_json::to_string(&table.headers)?],
        )?;
        tx.commit()?;

        info!(rows = table.len(), "SqliteStore: saved table");
        Ok(())
    }

    fn supports_partial_update(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }
}
