//! Terminal reports: record listings, record detail, summary

use colored::*;
use groupstore::Record;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::engine::{ProgressBasis, Severity, classify, compute_progress};
use crate::markers::{format_amount, popup_fields};

/// Aggregate view of a snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub placed: usize,
    pub by_severity: BTreeMap<Severity, usize>,
    pub proposed_length: f64,
    pub actual_length: f64,
    pub budget_required: f64,
    pub absorbed_funds: f64,
    /// Progress of the totals under the session's basis
    pub overall_progress: f64,
}

pub fn summarize(records: &[Record], basis: ProgressBasis) -> Summary {
    let mut by_severity: BTreeMap<Severity, usize> = Severity::ALL.into_iter().map(|s| (s, 0)).collect();
    for record in records {
        *by_severity.entry(classify(record.progress_percent)).or_insert(0) += 1;
    }

    let proposed_length = records.iter().map(|r| r.proposed_length).sum();
    let actual_length = records.iter().map(|r| r.actual_length).sum();
    let budget_required = records.iter().map(|r| r.budget_required).sum();
    let absorbed_funds = records.iter().map(|r| r.absorbed_funds).sum();
    let overall_progress = match basis {
        ProgressBasis::ActualLength => compute_progress(actual_length, proposed_length),
        ProgressBasis::AbsorbedFunds => compute_progress(absorbed_funds, budget_required),
    };

    Summary {
        total: records.len(),
        placed: records.iter().filter(|r| r.is_placed()).count(),
        by_severity,
        proposed_length,
        actual_length,
        budget_required,
        absorbed_funds,
        overall_progress,
    }
}

/// Paint text in a severity's marker color
pub fn paint(text: &str, severity: Severity) -> ColoredString {
    let (r, g, b) = severity.rgb();
    text.truecolor(r, g, b)
}

/// Listing row serialized for `--format json`
#[derive(Debug, Serialize)]
struct RecordRow<'a> {
    row: usize,
    #[serde(flatten)]
    record: &'a Record,
    severity: Severity,
    placed: bool,
}

/// Records as pretty JSON, each annotated with its severity
pub fn render_json(records: &[(usize, &Record)]) -> serde_json::Result<String> {
    let rows: Vec<RecordRow> = records
        .iter()
        .map(|(row, record)| RecordRow {
            row: *row,
            record,
            severity: classify(record.progress_percent),
            placed: record.is_placed(),
        })
        .collect();
    serde_json::to_string_pretty(&rows)
}

/// One line per record: name, progress, severity
pub fn render_text(records: &[(usize, &Record)]) -> String {
    let mut out = String::new();
    for (_, record) in records {
        let severity = classify(record.progress_percent);
        out.push_str(&format!(
            "{} {:.2}% {}\n",
            record.name.bold(),
            record.progress_percent,
            paint(&format!("[{}]", severity), severity)
        ));
    }
    out
}

/// Aligned table of all record fields
pub fn render_table(records: &[(usize, &Record)]) -> String {
    let name_width = records
        .iter()
        .map(|(_, r)| r.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("GROUP".len());

    let mut out = format!(
        "{:>4}  {:<name_width$}  {:>12}  {:>14}  {:>12}  {:>14}  {:>9}  {:<8}  {}\n",
        "ROW", "GROUP", "PROPOSED", "BUDGET", "ACTUAL", "ABSORBED", "PROGRESS", "SEVERITY", "MAP",
    );
    for (row, record) in records {
        let severity = classify(record.progress_percent);
        let line = format!(
            "{:>4}  {:<name_width$}  {:>12}  {:>14}  {:>12}  {:>14}  {:>8.2}%  {:<8}  {}",
            row,
            record.name,
            format_amount(record.proposed_length),
            format_amount(record.budget_required),
            format_amount(record.actual_length),
            format_amount(record.absorbed_funds),
            record.progress_percent,
            severity.to_string(),
            if record.is_placed() { "yes" } else { "-" },
        );
        out.push_str(&format!("{}\n", paint(&line, severity)));
    }
    out
}

/// Every popup field of one record
pub fn render_detail(record: &Record) -> String {
    let severity = classify(record.progress_percent);
    let fields = popup_fields(record);
    let width = fields.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);

    let mut out = String::new();
    for (key, value) in fields {
        out.push_str(&format!("{:<width$}  {}\n", format!("{}:", key).bold(), value, width = width + 1));
    }
    out.push_str(&format!(
        "{:<width$}  {}\n",
        "Severity:".bold(),
        paint(&format!("{} ({})", severity, severity.color()), severity),
        width = width + 1
    ));
    out
}

pub fn render_summary(summary: &Summary, basis: ProgressBasis) -> String {
    let mut out = String::new();
    out.push_str(&format!("Groups:          {}\n", summary.total));
    out.push_str(&format!("  On map:        {}\n", summary.placed));
    out.push_str(&format!("  Without coords: {}\n", summary.total - summary.placed));
    out.push_str(&format!("Proposed length: {}\n", format_amount(summary.proposed_length)));
    out.push_str(&format!("Actual length:   {}\n", format_amount(summary.actual_length)));
    out.push_str(&format!("Budget required: {}\n", format_amount(summary.budget_required)));
    out.push_str(&format!("Absorbed funds:  {}\n", format_amount(summary.absorbed_funds)));
    out.push_str(&format!("Overall ({}): {:.2}%\n", basis, summary.overall_progress));
    out.push_str("By severity:\n");
    for (severity, count) in &summary.by_severity {
        out.push_str(&format!(
            "  {} {:<8} {:>4}\n",
            paint("●", *severity),
            severity.to_string(),
            count
        ));
    }
    out
}

pub fn render_legend() -> String {
    let mut out = String::from("Progress legend\n");
    for entry in crate::markers::legend() {
        out.push_str(&format!(
            "  {} {:<8} {:<7} {}\n",
            paint("■", entry.severity),
            entry.severity.to_string(),
            entry.label,
            entry.color
        ));
    }
    out
}
