//! Column header mapping between backing tables and record fields

use serde::{Deserialize, Serialize};

/// Header names used to find each record field in a backing table
///
/// Defaults match the field survey spreadsheets the dashboard was built for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    /// Group name, the lookup key for edits
    pub name: String,

    /// Latitude
    pub latitude: String,

    /// Longitude
    pub longitude: String,

    /// Proposed length in metres
    #[serde(rename = "proposed-length")]
    pub proposed_length: String,

    /// Budget required
    #[serde(rename = "budget-required")]
    pub budget_required: String,

    /// Actual length built so far
    #[serde(rename = "actual-length")]
    pub actual_length: String,

    /// Funds absorbed so far
    #[serde(rename = "absorbed-funds")]
    pub absorbed_funds: String,

    /// Derived progress percentage
    #[serde(rename = "progress-percent")]
    pub progress_percent: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            name: "NAMA KELOMPOK".to_string(),
            latitude: "X".to_string(),
            longitude: "Y".to_string(),
            proposed_length: "Usulan Panjang (m)".to_string(),
            budget_required: "KEBUTUHAN ANGGARAN".to_string(),
            actual_length: "Panjang Aktual".to_string(),
            absorbed_funds: "Uang Terserap".to_string(),
            progress_percent: "Progress Control".to_string(),
        }
    }
}

impl ColumnMap {
    /// Columns whose absence makes a table unusable
    pub fn required(&self) -> [&str; 3] {
        [&self.name, &self.proposed_length, &self.budget_required]
    }

    /// Columns the dashboard writes; added to the header when missing
    pub fn mutable(&self) -> [&str; 3] {
        [&self.actual_length, &self.absorbed_funds, &self.progress_percent]
    }

    /// Check if a header is mapped to a record field
    pub fn is_mapped(&self, header: &str) -> bool {
        header == self.latitude
            || header == self.longitude
            || self.required().contains(&header)
            || self.mutable().contains(&header)
    }

    /// Required columns that are not present in `headers`
    pub fn missing_required(&self, headers: &[String]) -> Vec<String> {
        self.required()
            .iter()
            .filter(|col| !headers.iter().any(|h| h == *col))
            .map(|col| col.to_string())
            .collect()
    }
}
