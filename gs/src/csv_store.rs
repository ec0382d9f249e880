//! Delimited-text backing store

use fs2::FileExt;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::columns::ColumnMap;
use crate::error::{StoreError, StoreResult};
use crate::parse::{format_number, number_or_zero, parse_latitude, parse_longitude, parse_number};
use crate::record::{Record, RecordTable};
use crate::store::RecordStore;

/// A CSV file holding one group per row
///
/// `save_one` re-reads the file, checks that the target row still belongs to
/// the record and swaps in its mutable fields. Every other cell keeps the text
/// it had on disk. Writes go through a sibling temp file and a rename, under
/// an exclusive lock on a sibling `.lock` file.
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
    delimiter: u8,
    columns: ColumnMap,
}

impl CsvStore {
    pub fn new(path: impl AsRef<Path>, delimiter: u8, columns: ColumnMap) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            delimiter,
            columns,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "groups.csv".to_string());
        self.path.with_file_name(format!(".{}.{}", file_name, suffix))
    }

    /// Run `f` while holding the exclusive write lock
    fn with_lock<T>(&self, f: impl FnOnce() -> StoreResult<T>) -> StoreResult<T> {
        let lock_path = self.sibling("lock");
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| StoreError::unavailable(&lock_path, e))?;
        lock.lock_exclusive()?;
        debug!(?lock_path, "CsvStore: acquired write lock");
        let result = f();
        if let Err(e) = FileExt::unlock(&lock) {
            warn!(error = %e, "CsvStore: failed to release write lock");
        }
        result
    }

    fn read_table(&self) -> StoreResult<RecordTable> {
        let file = File::open(&self.path).map_err(|e| StoreError::unavailable(&self.path, e))?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(file);

        let mut headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();

        let missing = self.columns.missing_required(&headers);
        if !missing.is_empty() {
            return Err(StoreError::Schema { missing });
        }

        for column in self.columns.mutable() {
            if !headers.iter().any(|h| h == column) {
                info!(column, "CsvStore: column missing, defaulting to 0");
                headers.push(column.to_string());
            }
        }

        let position = |column: &str| headers.iter().position(|h| h == column);
        let c = &self.columns;
        let name_idx = position(&c.name);
        let lat_idx = position(&c.latitude);
        let lon_idx = position(&c.longitude);
        let proposed_idx = position(&c.proposed_length);
        let budget_idx = position(&c.budget_required);
        let actual_idx = position(&c.actual_length);
        let funds_idx = position(&c.absorbed_funds);
        let progress_idx = position(&c.progress_percent);

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i)).unwrap_or("");

            let mut extra = BTreeMap::new();
            let mut source = BTreeMap::new();
            for (i, header) in headers.iter().enumerate() {
                let text = row.get(i).unwrap_or("").to_string();
                if !c.is_mapped(header) {
                    extra.insert(header.clone(), text);
                } else if *header != c.name && i < row.len() {
                    source.insert(header.clone(), text);
                }
            }

            records.push(Record {
                name: cell(name_idx).to_string(),
                latitude: parse_latitude(cell(lat_idx)),
                longitude: parse_longitude(cell(lon_idx)),
                proposed_length: number_or_zero(cell(proposed_idx), &c.proposed_length),
                budget_required: number_or_zero(cell(budget_idx), &c.budget_required),
                actual_length: number_or_zero(cell(actual_idx), &c.actual_length),
                absorbed_funds: number_or_zero(cell(funds_idx), &c.absorbed_funds),
                progress_percent: number_or_zero(cell(progress_idx), &c.progress_percent),
                extra,
                source,
            });
        }

        debug!(path = ?self.path, rows = records.len(), "CsvStore: read table");
        Ok(RecordTable::new(headers, records))
    }

    /// Headers to write: the table's own, then any mapped or extra column it lacks
    fn output_headers(&self, table: &RecordTable) -> Vec<String> {
        let c = &self.columns;
        let mut headers = table.headers.clone();
        let mapped = [
            &c.name,
            &c.latitude,
            &c.longitude,
            &c.proposed_length,
            &c.budget_required,
            &c.actual_length,
            &c.absorbed_funds,
            &c.progress_percent,
        ];
        for column in mapped {
            if !headers.iter().any(|h| h == column) {
                headers.push(column.clone());
            }
        }
        for record in &table.records {
            for key in record.extra.keys() {
                if !headers.iter().any(|h| h == key) {
                    headers.push(key.clone());
                }
            }
        }
        headers
    }

    fn cell_for(&self, record: &Record, header: &str) -> String {
        let c = &self.columns;
        let raw = record.source.get(header);
        if header == c.name {
            record.name.clone()
        } else if header == c.latitude {
            coordinate_cell(raw, record.latitude, parse_latitude)
        } else if header == c.longitude {
            coordinate_cell(raw, record.longitude, parse_longitude)
        } else if header == c.proposed_length {
            number_cell(raw, record.proposed_length)
        } else if header == c.budget_required {
            number_cell(raw, record.budget_required)
        } else if header == c.actual_length {
            number_cell(raw, record.actual_length)
        } else if header == c.absorbed_funds {
            number_cell(raw, record.absorbed_funds)
        } else if header == c.progress_percent {
            number_cell(raw, record.progress_percent)
        } else {
            record.extra.get(header).cloned().unwrap_or_default()
        }
    }

    fn write_table(&self, table: &RecordTable) -> StoreResult<()> {
        let headers = self.output_headers(table);
        let tmp_path = self.sibling("tmp");

        {
            let file = File::create(&tmp_path).map_err(|e| StoreError::unavailable(&tmp_path, e))?;
            let mut writer = csv::WriterBuilder::new().delimiter(self.delimiter).from_writer(file);
            writer.write_record(&headers)?;
            for record in &table.records {
                let row: Vec<String> = headers.iter().map(|h| self.cell_for(record, h)).collect();
                writer.write_record(&row)?;
            }
            writer.flush()?;
        }

        fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::unavailable(&self.path, e))?;
        debug!(path = ?self.path, rows = table.len(), "CsvStore: wrote table");
        Ok(())
    }
}

impl RecordStore for CsvStore {
    fn load_all(&self) -> StoreResult<RecordTable> {
        self.read_table()
    }

    fn save_one(&self, record: &Record, row: usize) -> StoreResult<()> {
        self.with_lock(|| {
            let mut table = self.read_table()?;
            let len = table.len();
            let current = table.records.get_mut(row).ok_or(StoreError::RowOutOfRange { row, len })?;
            if current.name != record.name {
                return Err(StoreError::WriteConflict {
                    row,
                    expected: record.name.clone(),
                    found: current.name.clone(),
                });
            }
            current.actual_length = record.actual_length;
            current.absorbed_funds = record.absorbed_funds;
            current.progress_percent = record.progress_percent;
            for column in self.columns.mutable() {
                current.source.remove(column);
            }
            self.write_table(&table)?;
            info!(name = %record.name, row, "CsvStore: saved row");
            Ok(())
        })
    }

    fn save_all(&self, table: &RecordTable) -> StoreResult<()> {
        self.with_lock(|| {
            self.write_table(table)?;
            info!(rows = table.len(), "CsvStore: saved table");
            Ok(())
        })
    }

    fn supports_partial_update(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}

/// Original text while it still reads as `value`, otherwise the formatted value
fn number_cell(raw: Option<&String>, value: f64) -> String {
    match raw {
        Some(text) if parse_number(text).unwrap_or(0.0) == value => text.clone(),
        _ => format_number(value),
    }
}

fn coordinate_cell(raw: Option<&String>, value: Option<f64>, parse: fn(&str) -> Option<f64>) -> String {
    match raw {
        Some(text) if parse(text) == value => text.clone(),
        _ => value.map(format_number).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
NAMA KELOMPOK;X;Y;Usulan Panjang (m);KEBUTUHAN ANGGARAN;KECAMATAN
Kelompok A;-6.91;107.61;100;1000000;Cicalengka
Kelompok B;;;50;0;Nagreg
Kelompok C;abc;107.7;oops;250000;Rancaekek
";

    fn store_with(temp: &TempDir, content: &str) -> CsvStore {
        let path = temp.path().join("groups.csv");
        fs::write(&path, content).unwrap();
        CsvStore::new(&path, b';', ColumnMap::default())
    }

    #[test]
    fn test_load_defaults_missing_mutable_columns() {
        let temp = TempDir::new().unwrap();
        let store = store_with(&temp, SAMPLE);
        let table = store.load_all().unwrap();

        assert_eq!(table.len(), 3);
        assert!(table.headers.contains(&"Panjang Aktual".to_string()));
        assert!(table.headers.contains(&"Progress Control".to_string()));

        let a = &table.records[0];
        assert_eq!(a.name, "Kelompok A");
        assert_eq!(a.position(), Some((-6.91, 107.61)));
        assert_eq!(a.proposed_length, 100.0);
        assert_eq!(a.actual_length, 0.0);
        assert_eq!(a.extra.get("KECAMATAN").map(String::as_str), Some("Cicalengka"));

        assert!(!table.records[1].is_placed());

        let c = &table.records[2];
        assert!(c.latitude.is_none());
        assert_eq!(c.longitude, Some(107.7));
        assert_eq!(c.proposed_length, 0.0);
    }

    #[test]
    fn test_load_trims_headers() {
        let temp = TempDir::new().unwrap();
        let store = store_with(
            &temp,
            " NAMA KELOMPOK ; Usulan Panjang (m) ;KEBUTUHAN ANGGARAN \nKelompok A;10;20\n",
        );
        let table = store.load_all().unwrap();
        assert_eq!(table.records[0].proposed_length, 10.0);
        assert_eq!(table.records[0].budget_required, 20.0);
    }

    #[test]
    fn test_load_missing_required_is_schema_error() {
        let temp = TempDir::new().unwrap();
        let store = store_with(&temp, "NAMA KELOMPOK;X;Y\nKelompok A;1;2\n");
        let err = store.load_all().unwrap_err();
        match err {
            StoreError::Schema { missing } => {
                assert_eq!(missing, vec!["Usulan Panjang (m)", "KEBUTUHAN ANGGARAN"]);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_missing_file_is_unavailable() {
        let temp = TempDir::new().unwrap();
        let store = CsvStore::new(temp.path().join("nope.csv"), b';', ColumnMap::default());
        assert!(store.load_all().unwrap_err().is_unavailable());
    }

    #[test]
    fn test_save_all_preserves_unknown_columns_and_order() {
        let temp = TempDir::new().unwrap();
        let store = store_with(&temp, SAMPLE);
        let mut table = store.load_all().unwrap();
        table.records[0].actual_length = 25.0;
        table.records[0].progress_percent = 25.0;
        store.save_all(&table).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        let header = content.lines().next().unwrap();
        assert_eq!(
            header,
            "NAMA KELOMPOK;X;Y;Usulan Panjang (m);KEBUTUHAN ANGGARAN;KECAMATAN;Panjang Aktual;Uang Terserap;Progress Control"
        );

        let reloaded = store.load_all().unwrap();
        assert_eq!(reloaded.headers, table.headers);
        assert_eq!(reloaded.records[0].actual_length, 25.0);
        assert_eq!(reloaded.records[0].extra.get("KECAMATAN").map(String::as_str), Some("Cicalengka"));
        assert_eq!(reloaded.records[2].extra.get("KECAMATAN").map(String::as_str), Some("Rancaekek"));
    }

    #[test]
    fn test_save_one_updates_only_mutable_fields() {
        let temp = TempDir::new().unwrap();
        let store = store_with(&temp, SAMPLE);
        let table = store.load_all().unwrap();

        let mut edited = table.records[1].clone();
        edited.proposed_length = 9999.0;
        edited.actual_length = 10.0;
        edited.absorbed_funds = 5.0;
        edited.progress_percent = 20.0;
        store.save_one(&edited, 1).unwrap();

        let reloaded = store.load_all().unwrap();
        let b = &reloaded.records[1];
        assert_eq!(b.actual_length, 10.0);
        assert_eq!(b.absorbed_funds, 5.0);
        assert_eq!(b.progress_percent, 20.0);
        assert_eq!(b.proposed_length, 50.0);
        assert_eq!(reloaded.records[0].actual_length, 0.0);
    }

    #[test]
    fn test_save_one_detects_moved_row() {
        let temp = TempDir::new().unwrap();
        let store = store_with(&temp, SAMPLE);
        let table = store.load_all().unwrap();

        let err = store.save_one(&table.records[0], 1).unwrap_err();
        assert!(err.is_conflict());

        let err = store.save_one(&table.records[0], 7).unwrap_err();
        assert!(matches!(err, StoreError::RowOutOfRange { row: 7, len: 3 }));
    }

    #[test]
    fn test_save_all_into_new_file_writes_mapped_headers() {
        let temp = TempDir::new().unwrap();
        let store = CsvStore::new(temp.path().join("fresh.csv"), b';', ColumnMap::default());
        let table = RecordTable::new(Vec::new(), vec![Record::new("Kelompok A", 10.0, 20.0).at(1.5, 2.0)]);
        store.save_all(&table).unwrap();

        let reloaded = store.load_all().unwrap();
        assert_eq!(reloaded.records[0].name, "Kelompok A");
        assert_eq!(reloaded.records[0].position(), Some((1.5, 2.0)));
        assert_eq!(store.describe(), format!("csv:{}", temp.path().join("fresh.csv").display()));
        assert!(store.supports_partial_update());
    }

    #[test]
    fn test_save_one_leaves_other_rows_verbatim() {
        let temp = TempDir::new().unwrap();
        let store = store_with(
            &temp,
            "NAMA KELOMPOK;X;Y;Usulan Panjang (m);KEBUTUHAN ANGGARAN;Panjang Aktual;Uang Terserap;Progress Control\n\
             A;-6.9;107.6;100;1000;0;0;0\n\
             B;n/a;107.6;1.250;1.500.000;abc; 7 ;12\n",
        );
        let table = store.load_all().unwrap();
        assert_eq!(table.records[1].budget_required, 0.0);
        assert!(table.records[1].latitude.is_none());

        let mut edited = table.records[0].clone();
        edited.actual_length = 25.0;
        edited.progress_percent = 25.0;
        store.save_one(&edited, 0).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[1], "A;-6.9;107.6;100;1000;25;0;25");
        assert_eq!(lines[2], "B;n/a;107.6;1.250;1.500.000;abc; 7 ;12");
    }

    #[test]
    fn test_save_all_keeps_unparsed_cell_text() {
        let temp = TempDir::new().unwrap();
        let store = store_with(&temp, SAMPLE);
        let mut table = store.load_all().unwrap();
        table.records[2].proposed_length = 5.0;
        store.save_all(&table).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        // Latitude "abc" still reads as absent, so its text survives; the
        // changed length does not.
        assert!(content.contains("Kelompok C;abc;107.7;5;250000;Rancaekek;0;0;0"));
        assert!(content.contains("Kelompok B;;;50;0;Nagreg;0;0;0"));
    }

    #[test]
    fn test_latitude_outside_ninety_is_unplaced() {
        let temp = TempDir::new().unwrap();
        let store = store_with(
            &temp,
            "NAMA KELOMPOK;X;Y;Usulan Panjang (m);KEBUTUHAN ANGGARAN\nKelompok A;107.6;-6.9;1;1\n",
        );
        let record = &store.load_all().unwrap().records[0];
        assert!(record.latitude.is_none());
        assert_eq!(record.longitude, Some(-6.9));
        assert!(!record.is_placed());
    }
}
