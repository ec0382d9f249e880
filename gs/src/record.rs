//! Group record and in-memory table

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{StoreError, StoreResult};

/// One road-construction group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique human-readable label
    pub name: String,

    /// Latitude, absent when the cell is missing or invalid
    pub latitude: Option<f64>,

    /// Longitude, absent when the cell is missing or invalid
    pub longitude: Option<f64>,

    /// Planned length in metres
    pub proposed_length: f64,

    /// Planned cost
    pub budget_required: f64,

    /// Length built so far (operator-entered)
    pub actual_length: f64,

    /// Funds absorbed so far (operator-entered)
    pub absorbed_funds: f64,

    /// Derived progress; overwritten on load and on every edit
    pub progress_percent: f64,

    /// Unmapped columns of the backing row, carried through untouched
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,

    /// Cell text of the mapped numeric columns as read, keyed by header
    ///
    /// A store writes this text back unchanged while the typed field still
    /// holds the value the text parsed to.
    #[serde(skip)]
    pub source: BTreeMap<String, String>,
}

impl Record {
    /// Create a record with no position and no progress
    pub fn new(name: impl Into<String>, proposed_length: f64, budget_required: f64) -> Self {
        Self {
            name: name.into(),
            latitude: None,
            longitude: None,
            proposed_length,
            budget_required,
            actual_length: 0.0,
            absorbed_funds: 0.0,
            progress_percent: 0.0,
            extra: BTreeMap::new(),
            source: BTreeMap::new(),
        }
    }

    /// Builder: set position
    pub fn at(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// Position as `(latitude, longitude)` when both are present
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }

    /// Check if the record can be placed on a map
    pub fn is_placed(&self) -> bool {
        self.position().is_some()
    }
}

/// Full snapshot of a backing table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordTable {
    /// Column headers in backing-store order
    pub headers: Vec<String>,

    /// Records in row order
    pub records: Vec<Record>,
}

impl RecordTable {
    pub fn new(headers: Vec<String>, records: Vec<Record>) -> Self {
        Self { headers, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Find the first record with `name`, returning its row index
    pub fn find(&self, name: &str) -> Option<(usize, &Record)> {
        self.records.iter().enumerate().find(|(_, r)| r.name == name)
    }

    /// Get a record by row index
    pub fn get(&self, row: usize) -> Option<&Record> {
        self.records.get(row)
    }

    /// Replace the record at `row`, returning the previous one
    pub fn replace(&mut self, row: usize, record: Record) -> StoreResult<Record> {
        let len = self.records.len();
        let slot = self.records.get_mut(row).ok_or(StoreError::RowOutOfRange { row, len })?;
        Ok(std::mem::replace(slot, record))
    }

    /// Records that carry a usable position
    pub fn placed(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(|r| r.is_placed())
    }
}
