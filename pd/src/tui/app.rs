//! TUI application - event handling and state management
//!
//! The App struct owns the AppState and handles all keyboard events.
//! It does not do any rendering or I/O - saving is handed to the runner
//! through `AppState::pending_edit`.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;

use super::state::{AppState, EditForm, InteractionMode, PendingEdit};

/// TUI application
#[derive(Debug, Default)]
pub struct App {
    /// Application state
    state: AppState,
}

impl App {
    /// Create a new application instance
    pub fn new() -> Self {
        Self { state: AppState::new() }
    }

    /// Get reference to state
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get mutable reference to state
    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    /// Handle a key event
    ///
    /// Returns true if the application should exit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (key.code, key.modifiers) {
            return true; // Force quit
        }

        match &self.state.interaction_mode {
            InteractionMode::Normal => self.handle_normal_key(key),
            InteractionMode::Filter(_) => self.handle_filter_key(key),
            InteractionMode::Edit(_) => self.handle_edit_key(key),
            InteractionMode::Help => self.handle_help_key(key),
        }
        self.state.should_quit
    }

    /// Handle key in normal mode
    fn handle_normal_key(&mut self, key: KeyEvent) {
        // Clear any transient status message on navigation
        self.state.clear_status();

        match key.code {
            // === Quit ===
            KeyCode::Char('q') => {
                self.state.should_quit = true;
            }

            // === Help ===
            KeyCode::Char('?') | KeyCode::F(1) => {
                self.state.interaction_mode = InteractionMode::Help;
            }

            // === Filter ===
            KeyCode::Char('/') => {
                self.state.interaction_mode = InteractionMode::Filter(self.state.filter_text.clone());
            }
            KeyCode::Esc => {
                if !self.state.filter_text.is_empty() {
                    self.state.filter_text.clear();
                    self.state.selection.select_first();
                }
            }

            // === Navigation ===
            KeyCode::Up | KeyCode::Char('k') => {
                self.state.selection.select_prev();
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let max = self.state.item_count();
                self.state.selection.select_next(max);
            }
            KeyCode::Char('g') | KeyCode::Home => {
                self.state.selection.select_first();
            }
            KeyCode::Char('G') | KeyCode::End => {
                let max = self.state.item_count();
                self.state.selection.select_last(max);
            }

            // === Actions ===
            KeyCode::Char('e') | KeyCode::Enter => {
                self.open_edit_form();
            }
            KeyCode::Char('r') => {
                self.state.pending_reload = true;
            }
            _ => {}
        }
    }

    fn open_edit_form(&mut self) {
        match self.state.selected_item() {
            Some(item) => {
                debug!(row = item.row, name = %item.record.name, "open_edit_form: editing");
                let form = EditForm::new(item.row, &item.record);
                self.state.interaction_mode = InteractionMode::Edit(form);
            }
            None => self.state.set_error("No group selected"),
        }
    }

    /// Handle key in filter mode
    fn handle_filter_key(&mut self, key: KeyEvent) {
        let InteractionMode::Filter(text) = &mut self.state.interaction_mode else {
            return;
        };
        match key.code {
            KeyCode::Esc => {
                self.state.filter_text.clear();
                self.state.interaction_mode = InteractionMode::Normal;
            }
            KeyCode::Enter => {
                self.state.filter_text = std::mem::take(text);
                self.state.interaction_mode = InteractionMode::Normal;
            }
            KeyCode::Backspace => {
                text.pop();
            }
            KeyCode::Char(c) => {
                text.push(c);
            }
            _ => {}
        }
        self.state.selection.clamp(self.state.item_count());
    }

    /// Handle key in edit mode
    fn handle_edit_key(&mut self, key: KeyEvent) {
        let InteractionMode::Edit(form) = &mut self.state.interaction_mode else {
            return;
        };
        match key.code {
            KeyCode::Esc => {
                self.state.interaction_mode = InteractionMode::Normal;
                self.state.set_info("Edit cancelled");
            }
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                form.toggle_focus();
            }
            KeyCode::Backspace => {
                form.backspace();
            }
            KeyCode::Delete => {
                form.clear();
            }
            KeyCode::Char(c) => {
                if !form.push_char(c) {
                    self.state.set_error(format!("'{}' is not allowed in a number", c));
                }
            }
            KeyCode::Enter => match form.values() {
                Ok((actual_length, absorbed_funds)) => {
                    let name = form.record.name.clone();
                    debug!(row = form.row, %name, actual_length, absorbed_funds, "handle_edit_key: edit confirmed");
                    self.state.pending_edit = Some(PendingEdit {
                        row: form.row,
                        name,
                        actual_length,
                        absorbed_funds,
                    });
                    self.state.interaction_mode = InteractionMode::Normal;
                }
                Err(e) => self.state.set_error(e),
            },
            _ => {}
        }
    }

    /// Handle key in help mode - any key closes the overlay
    fn handle_help_key(&mut self, _key: KeyEvent) {
        self.state.interaction_mode = InteractionMode::Normal;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::state::StatusMessage;
    use groupstore::Record;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app() -> App {
        let mut app = App::new();
        let mut a = Record::new("Kelompok A", 100.0, 1000.0);
        a.actual_length = 10.0;
        app.state_mut()
            .set_records(&[a, Record::new("Kelompok B", 50.0, 500.0), Record::new("Desa C", 1.0, 1.0)]);
        app
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_quit() {
        let mut app = app();
        assert!(app.handle_key(key(KeyCode::Char('q'))));

        let mut app = self::app();
        assert!(app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
    }

    #[test]
    fn test_navigation() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('j')));
        assert_eq!(app.state().selected_item().unwrap().record.name, "Kelompok B");
        app.handle_key(key(KeyCode::Char('G')));
        assert_eq!(app.state().selected_item().unwrap().record.name, "Desa C");
        app.handle_key(key(KeyCode::Down));
        assert_eq!(app.state().selection.selected_index, 2);
        app.handle_key(key(KeyCode::Char('g')));
        assert_eq!(app.state().selection.selected_index, 0);
    }

    #[test]
    fn test_filter_mode() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('/')));
        assert!(app.state().interaction_mode.is_filter());
        type_str(&mut app, "desa");
        assert_eq!(app.state().item_count(), 1);
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.state().filter_text, "desa");
        assert_eq!(app.state().selected_item().unwrap().record.name, "Desa C");

        app.handle_key(key(KeyCode::Esc));
        assert!(app.state().filter_text.is_empty());
        assert_eq!(app.state().item_count(), 3);
    }

    #[test]
    fn test_edit_and_confirm_queues_pending_edit() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('e')));
        assert!(app.state().interaction_mode.is_edit());

        app.handle_key(key(KeyCode::Delete));
        type_str(&mut app, "25");
        app.handle_key(key(KeyCode::Tab));
        app.handle_key(key(KeyCode::Delete));
        type_str(&mut app, "300");
        app.handle_key(key(KeyCode::Enter));

        assert!(!app.state().interaction_mode.is_edit());
        assert_eq!(
            app.state().pending_edit,
            Some(PendingEdit {
                row: 0,
                name: "Kelompok A".to_string(),
                actual_length: 25.0,
                absorbed_funds: 300.0,
            })
        );
    }

    #[test]
    fn test_edit_of_duplicate_name_keeps_selected_row() {
        let mut app = App::new();
        app.state_mut()
            .set_records(&[Record::new("A", 100.0, 100.0), Record::new("A", 100.0, 100.0)]);

        app.handle_key(key(KeyCode::Char('j')));
        app.handle_key(key(KeyCode::Char('e')));
        app.handle_key(key(KeyCode::Delete));
        type_str(&mut app, "50");
        app.handle_key(key(KeyCode::Enter));

        let pending = app.state().pending_edit.clone().unwrap();
        assert_eq!(pending.row, 1);
        assert_eq!(pending.name, "A");
        assert_eq!(pending.actual_length, 50.0);
    }

    #[test]
    fn test_edit_rejects_letters_and_cancel_discards() {
        let mut app = app();
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Char('x')));
        assert!(matches!(app.state().status, Some(StatusMessage::Error(_))));
        if let InteractionMode::Edit(form) = &app.state().interaction_mode {
            assert_eq!(form.actual_length, "10");
        } else {
            panic!("expected edit mode");
        }

        app.handle_key(key(KeyCode::Esc));
        assert!(app.state().pending_edit.is_none());
        assert_eq!(app.state().status, Some(StatusMessage::Info("Edit cancelled".to_string())));
    }

    #[test]
    fn test_edit_with_no_records() {
        let mut app = App::new();
        app.handle_key(key(KeyCode::Char('e')));
        assert!(!app.state().interaction_mode.is_edit());
        assert!(matches!(app.state().status, Some(StatusMessage::Error(_))));
    }

    #[test]
    fn test_help_and_reload() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('?')));
        assert!(matches!(app.state().interaction_mode, InteractionMode::Help));
        app.handle_key(key(KeyCode::Char('x')));
        assert!(matches!(app.state().interaction_mode, InteractionMode::Normal));

        app.handle_key(key(KeyCode::Char('r')));
        assert!(app.state().pending_reload);
    }
}
