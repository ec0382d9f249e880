//! TUI application state
//!
//! Pure data structures for the dashboard. No rendering logic here.

use groupstore::Record;

use crate::engine::{ProgressBasis, Severity, apply_edit, classify};
use crate::markers::format_amount;

/// Interaction mode (modal)
#[derive(Debug, Clone, Default)]
pub enum InteractionMode {
    /// Normal navigation mode
    #[default]
    Normal,
    /// Search/filter mode (/ key)
    Filter(String),
    /// Editing one record (e key)
    Edit(EditForm),
    /// Help overlay
    Help,
}

impl InteractionMode {
    pub fn is_filter(&self) -> bool {
        matches!(self, Self::Filter(_))
    }

    pub fn is_edit(&self) -> bool {
        matches!(self, Self::Edit(_))
    }
}

/// Which input of the edit form has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditField {
    #[default]
    ActualLength,
    AbsorbedFunds,
}

/// Two numeric inputs bound to one record's mutable fields
#[derive(Debug, Clone)]
pub struct EditForm {
    /// Row index of the record in the store
    pub row: usize,
    /// The record being edited, as it was when the form opened
    pub record: Record,
    pub actual_length: String,
    pub absorbed_funds: String,
    pub focus: EditField,
}

impl EditForm {
    /// Open a form pre-filled with the record's current values
    pub fn new(row: usize, record: &Record) -> Self {
        Self {
            row,
            record: record.clone(),
            actual_length: format_amount(record.actual_length),
            absorbed_funds: format_amount(record.absorbed_funds),
            focus: EditField::default(),
        }
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            EditField::ActualLength => &mut self.actual_length,
            EditField::AbsorbedFunds => &mut self.absorbed_funds,
        }
    }

    /// Type a character into the focused input
    ///
    /// Only digits, one decimal point and a leading minus are accepted.
    /// Returns false when the keystroke was rejected.
    pub fn push_char(&mut self, c: char) -> bool {
        let input = self.focused_mut();
        let accepted = match c {
            '0'..='9' => true,
            '.' => !input.contains('.'),
            '-' => input.is_empty(),
            _ => false,
        };
        if accepted {
            input.push(c);
        }
        accepted
    }

    pub fn backspace(&mut self) {
        self.focused_mut().pop();
    }

    /// Clear the focused input
    pub fn clear(&mut self) {
        self.focused_mut().clear();
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            EditField::ActualLength => EditField::AbsorbedFunds,
            EditField::AbsorbedFunds => EditField::ActualLength,
        };
    }

    /// Parse both inputs; an empty input counts as `0`
    pub fn values(&self) -> Result<(f64, f64), String> {
        let parse = |label: &str, raw: &str| -> Result<f64, String> {
            let raw = raw.trim();
            if raw.is_empty() {
                return Ok(0.0);
            }
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| format!("{} is not a number: '{}'", label, raw))
        };
        Ok((
            parse("Actual length", &self.actual_length)?,
            parse("Absorbed funds", &self.absorbed_funds)?,
        ))
    }

    /// Progress the record would have if the form were saved now
    pub fn preview(&self, basis: ProgressBasis) -> Option<f64> {
        let (actual, funds) = self.values().ok()?;
        Some(apply_edit(&self.record, basis, actual, funds).progress_percent)
    }
}

/// An edit confirmed in the form, waiting for the runner to persist it
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEdit {
    pub row: usize,
    pub name: String,
    pub actual_length: f64,
    pub absorbed_funds: f64,
}

/// One line of the status bar
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    Info(String),
    Error(String),
}

/// A record prepared for display
#[derive(Debug, Clone)]
pub struct RecordItem {
    pub row: usize,
    pub record: Record,
    pub severity: Severity,
}

impl RecordItem {
    pub fn new(row: usize, record: &Record) -> Self {
        Self {
            row,
            record: record.clone(),
            severity: classify(record.progress_percent),
        }
    }
}

/// Selection state for list views
#[derive(Debug, Default, Clone)]
pub struct SelectionState {
    pub selected_index: usize,
}

impl SelectionState {
    pub fn select_next(&mut self, max_items: usize) {
        if max_items > 0 && self.selected_index < max_items - 1 {
            self.selected_index += 1;
        }
    }

    pub fn select_prev(&mut self) {
        if self.selected_index > 0 {
            self.selected_index -= 1;
        }
    }

    pub fn select_first(&mut self) {
        self.selected_index = 0;
    }

    pub fn select_last(&mut self, max_items: usize) {
        if max_items > 0 {
            self.selected_index = max_items - 1;
        }
    }

    /// Ensure selection is within bounds
    pub fn clamp(&mut self, max_items: usize) {
        if max_items == 0 {
            self.selected_index = 0;
        } else if self.selected_index >= max_items {
            self.selected_index = max_items - 1;
        }
    }
}

/// Main TUI application state
#[derive(Debug, Default)]
pub struct AppState {
    /// Current interaction mode
    pub interaction_mode: InteractionMode,
    /// Current filter text (for / filtering)
    pub filter_text: String,
    /// Should the app quit
    pub should_quit: bool,
    /// Last status line message
    pub status: Option<StatusMessage>,

    /// All records, in row order
    pub items: Vec<RecordItem>,
    pub selection: SelectionState,

    /// Basis used for edit previews
    pub basis: ProgressBasis,
    /// Where the records come from, for the header
    pub store_label: String,

    // === Pending work for the runner ===
    pub pending_edit: Option<PendingEdit>,
    pub pending_reload: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace displayed records, keeping the selection on the same name if possible
    pub fn set_records(&mut self, records: &[Record]) {
        let selected_name = self.selected_item().map(|item| item.record.name.clone());
        self.items = records.iter().enumerate().map(|(row, r)| RecordItem::new(row, r)).collect();

        let position = selected_name.and_then(|name| {
            self.filtered_items()
                .iter()
                .position(|item| item.record.name == name)
        });
        if let Some(idx) = position {
            self.selection.selected_index = idx;
        }
        let count = self.filtered_items().len();
        self.selection.clamp(count);
    }

    /// Items matching the current filter (case-insensitive substring on name)
    pub fn filtered_items(&self) -> Vec<&RecordItem> {
        let needle = match &self.interaction_mode {
            InteractionMode::Filter(text) => text.to_lowercase(),
            _ => self.filter_text.to_lowercase(),
        };
        self.items
            .iter()
            .filter(|item| needle.is_empty() || item.record.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn selected_item(&self) -> Option<&RecordItem> {
        self.filtered_items().get(self.selection.selected_index).copied()
    }

    pub fn item_count(&self) -> usize {
        self.filtered_items().len()
    }

    /// Count of displayed records per severity, lowest first
    pub fn severity_counts(&self) -> [(Severity, usize); 5] {
        Severity::ALL.map(|sev| (sev, self.items.iter().filter(|i| i.severity == sev).count()))
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.status = Some(StatusMessage::Error(msg.into()));
    }

    pub fn set_info(&mut self, msg: impl Into<String>) {
        self.status = Some(StatusMessage::Info(msg.into()));
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<Record> {
        let mut a = Record::new("Kelompok Alpha", 100.0, 1000.0);
        a.actual_length = 30.0;
        a.progress_percent = 30.0;
        let b = Record::new("Kelompok Beta", 50.0, 500.0);
        let mut c = Record::new("Desa Cikalong", 10.0, 10.0);
        c.progress_percent = 100.0;
        vec![a, b, c]
    }

    #[test]
    fn test_selection_bounds() {
        let mut sel = SelectionState::default();
        sel.select_prev();
        assert_eq!(sel.selected_index, 0);
        sel.select_next(2);
        sel.select_next(2);
        assert_eq!(sel.selected_index, 1);
        sel.select_last(5);
        assert_eq!(sel.selected_index, 4);
        sel.clamp(3);
        assert_eq!(sel.selected_index, 2);
        sel.clamp(0);
        assert_eq!(sel.selected_index, 0);
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let mut state = AppState::new();
        state.set_records(&records());
        assert_eq!(state.item_count(), 3);

        state.filter_text = "kelompok".to_string();
        assert_eq!(state.item_count(), 2);

        state.interaction_mode = InteractionMode::Filter("CIK".to_string());
        assert_eq!(state.item_count(), 1);
        assert_eq!(state.selected_item().unwrap().record.name, "Desa Cikalong");
    }

    #[test]
    fn test_set_records_keeps_selection_by_name() {
        let mut state = AppState::new();
        state.set_records(&records());
        state.selection.selected_index = 1;

        let mut reordered = records();
        reordered.swap(0, 1);
        state.set_records(&reordered);
        assert_eq!(state.selected_item().unwrap().record.name, "Kelompok Beta");
        assert_eq!(state.selection.selected_index, 0);
    }

    #[test]
    fn test_severity_counts() {
        let mut state = AppState::new();
        state.set_records(&records());
        let counts = state.severity_counts();
        assert_eq!(counts[0], (Severity::Critical, 1));
        assert_eq!(counts[1], (Severity::Low, 1));
        assert_eq!(counts[4], (Severity::Complete, 1));
    }

    #[test]
    fn test_edit_form_rejects_non_numeric_keys() {
        let mut form = EditForm::new(0, &records()[0]);
        assert_eq!(form.actual_length, "30");
        form.clear();
        assert!(form.push_char('4'));
        assert!(!form.push_char('x'));
        assert!(form.push_char('.'));
        assert!(!form.push_char('.'));
        assert!(form.push_char('5'));
        assert!(!form.push_char('-'));
        assert_eq!(form.actual_length, "4.5");

        form.toggle_focus();
        form.clear();
        assert!(form.push_char('-'));
        assert!(form.push_char('2'));
        assert_eq!(form.values(), Ok((4.5, -2.0)));
    }

    #[test]
    fn test_edit_form_lone_minus_is_invalid() {
        let mut form = EditForm::new(1, &records()[1]);
        form.clear();
        form.push_char('-');
        assert!(form.values().is_err());
        assert!(form.preview(ProgressBasis::ActualLength).is_none());
    }

    #[test]
    fn test_edit_form_preview() {
        let mut form = EditForm::new(1, &records()[1]);
        form.clear();
        for c in "25".chars() {
            form.push_char(c);
        }
        assert_eq!(form.preview(ProgressBasis::ActualLength), Some(50.0));
        assert_eq!(form.preview(ProgressBasis::AbsorbedFunds), Some(0.0));

        form.backspace();
        form.backspace();
        assert_eq!(form.values(), Ok((0.0, 0.0)));
    }
}
