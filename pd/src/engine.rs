//! Progress engine
//!
//! Derives a progress percentage from a record, buckets it into a severity
//! class for display and applies a single operator edit. Everything here is
//! pure; persistence is the session's job.

use groupstore::Record;
use serde::{Deserialize, Serialize};

/// Which pair of fields progress is measured on
///
/// A deployment picks exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressBasis {
    /// `actual_length / proposed_length`
    #[default]
    ActualLength,
    /// `absorbed_funds / budget_required`
    AbsorbedFunds,
}

impl ProgressBasis {
    /// `(numerator, denominator)` for a record under this basis
    pub fn operands(self, record: &Record) -> (f64, f64) {
        match self {
            Self::ActualLength => (record.actual_length, record.proposed_length),
            Self::AbsorbedFunds => (record.absorbed_funds, record.budget_required),
        }
    }
}

impl std::fmt::Display for ProgressBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ActualLength => write!(f, "actual_length"),
            Self::AbsorbedFunds => write!(f, "absorbed_funds"),
        }
    }
}

impl std::str::FromStr for ProgressBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "actual_length" | "length" => Ok(Self::ActualLength),
            "absorbed_funds" | "funds" => Ok(Self::AbsorbedFunds),
            _ => Err(format!("Unknown progress basis: {}. Use: actual_length or absorbed_funds", s)),
        }
    }
}

/// Progress as a percentage, unclamped
///
/// A denominator that is not a positive finite number yields `0`, as does a
/// non-finite numerator.
pub fn compute_progress(numerator: f64, denominator: f64) -> f64 {
    if !denominator.is_finite() || denominator <= 0.0 || !numerator.is_finite() {
        return 0.0;
    }
    (numerator / denominator) * 100.0
}

/// Display severity derived from progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Low,
    Medium,
    High,
    Complete,
}

impl Severity {
    /// All buckets, lowest first
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Complete,
    ];

    /// Marker color as `#RRGGBB`
    pub fn color(self) -> &'static str {
        match self {
            Self::Critical => "#FF0000",
            Self::Low => "#FF8000",
            Self::Medium => "#FFD700",
            Self::High => "#7CBE19",
            Self::Complete => "#145214",
        }
    }

    /// Marker color as an RGB triple
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Critical => (0xFF, 0x00, 0x00),
            Self::Low => (0xFF, 0x80, 0x00),
            Self::Medium => (0xFF, 0xD7, 0x00),
            Self::High => (0x7C, 0xBE, 0x19),
            Self::Complete => (0x14, 0x52, 0x14),
        }
    }

    /// Legend label for the bucket's range
    pub fn range_label(self) -> &'static str {
        match self {
            Self::Critical => "0-24%",
            Self::Low => "25-49%",
            Self::Medium => "50-74%",
            Self::High => "75-99%",
            Self::Complete => "100%",
        }
    }

    /// Inclusive lower bound, `None` for the open-ended bottom bucket
    pub fn lower_bound(self) -> Option<f64> {
        match self {
            Self::Critical => None,
            Self::Low => Some(25.0),
            Self::Medium => Some(50.0),
            Self::High => Some(75.0),
            Self::Complete => Some(100.0),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|sev| sev.to_string() == s.to_lowercase())
            .ok_or_else(|| format!("Unknown severity: {}. Use: critical, low, medium, high, complete", s))
    }
}

/// Bucket a percentage; boundaries belong to the upper bucket, NaN is critical
pub fn classify(percent: f64) -> Severity {
    if percent >= 100.0 {
        Severity::Complete
    } else if percent >= 75.0 {
        Severity::High
    } else if percent >= 50.0 {
        Severity::Medium
    } else if percent >= 25.0 {
        Severity::Low
    } else {
        Severity::Critical
    }
}

/// Overwrite `progress_percent` from the record's current fields
pub fn recompute(record: &mut Record, basis: ProgressBasis) {
    let (numerator, denominator) = basis.operands(record);
    record.progress_percent = compute_progress(numerator, denominator);
}

/// Apply an operator edit, returning the updated record
///
/// Values are taken as given; negative numbers are accepted.
pub fn apply_edit(record: &Record, basis: ProgressBasis, actual_length: f64, absorbed_funds: f64) -> Record {
    let mut updated = record.clone();
    updated.actual_length = actual_length;
    updated.absorbed_funds = absorbed_funds;
    recompute(&mut updated, basis);
    updated
}
