//! TUI Runner - main loop that owns the terminal and the editing session
//!
//! The runner draws, waits for the next event, hands keys to the App and
//! then carries out whatever work the App queued (saving an edit, reloading).

use std::time::Duration;

use eyre::Result;
use groupstore::RecordStore;
use tracing::{debug, warn};

use crate::session::Session;

use super::Tui;
use super::app::App;
use super::events::{Event, EventHandler};
use super::views;

/// TUI Runner that manages the terminal and event loop
pub struct TuiRunner<S: RecordStore> {
    /// Application state
    app: App,
    /// Terminal handle
    terminal: Tui,
    /// Loaded snapshot and its store
    session: Session<S>,
    /// Event handler
    event_handler: EventHandler,
}

impl<S: RecordStore> TuiRunner<S> {
    pub fn new(terminal: Tui, session: Session<S>, tick_rate: Duration) -> Self {
        let mut app = App::new();
        {
            let state = app.state_mut();
            state.basis = session.basis();
            state.store_label = session.store().describe();
        }
        Self {
            app,
            terminal,
            session,
            event_handler: EventHandler::new(tick_rate),
        }
    }

    /// Run the TUI main loop
    pub fn run(&mut self) -> Result<()> {
        self.sync_records();

        loop {
            self.terminal.draw(|frame| views::render(self.app.state(), frame))?;

            match self.event_handler.next()? {
                Event::Key(key_event) => {
                    if self.app.handle_key(key_event) {
                        break;
                    }
                }
                Event::Resize(width, height) => {
                    debug!(width, height, "TuiRunner: resize");
                }
                Event::Tick => {}
            }

            self.process_pending();

            if self.app.state().should_quit {
                break;
            }
        }

        Ok(())
    }

    /// Carry out work queued by the App
    fn process_pending(&mut self) {
        if let Some(edit) = self.app.state_mut().pending_edit.take() {
            match self
                .session
                .commit_edit_at(edit.row, &edit.name, edit.actual_length, edit.absorbed_funds)
            {
                Ok(outcome) => {
                    let message = format!(
                        "Saved {}: {:.2}% ({})",
                        outcome.updated.name,
                        outcome.updated.progress_percent,
                        outcome.severity_after()
                    );
                    self.sync_records();
                    self.app.state_mut().set_info(message);
                }
                Err(e) => {
                    warn!(name = %edit.name, error = %e, "TuiRunner: edit not saved");
                    self.sync_records();
                    self.app.state_mut().set_error(e.to_string());
                }
            }
        }

        if std::mem::take(&mut self.app.state_mut().pending_reload) {
            match self.session.reload() {
                Ok(()) => {
                    self.sync_records();
                    let count = self.session.records().len();
                    self.app.state_mut().set_info(format!("Reloaded {} groups", count));
                }
                Err(e) => {
                    warn!(error = %e, "TuiRunner: reload failed");
                    self.app.state_mut().set_error(format!("Reload failed: {}", e));
                }
            }
        }
    }

    /// Push the session's records into the display state
    fn sync_records(&mut self) {
        let records = self.session.records();
        debug!(rows = records.len(), "TuiRunner::sync_records: called");
        self.app.state_mut().set_records(records);
    }
}
