//! TUI views and rendering

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};

use super::state::{AppState, EditField, EditForm, InteractionMode, StatusMessage};
use crate::engine::{Severity, classify};
use crate::markers::{legend, popup_fields};

/// Terminal color for a severity bucket
fn severity_color(severity: Severity) -> Color {
    let (r, g, b) = severity.rgb();
    Color::Rgb(r, g, b)
}

/// Main render function
pub fn render(state: &AppState, frame: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Main content
            Constraint::Length(3), // Footer
        ])
        .split(frame.area());

    render_header(state, frame, chunks[0]);
    render_main(state, frame, chunks[1]);
    render_footer(state, frame, chunks[2]);

    match &state.interaction_mode {
        InteractionMode::Edit(form) => render_edit_overlay(state, form, frame, chunks[1]),
        InteractionMode::Help => render_help_overlay(frame, chunks[1]),
        _ => {}
    }
}

/// Render the header bar
fn render_header(state: &AppState, frame: &mut Frame, area: Rect) {
    let mut spans = vec![
        Span::styled(
            "ProgressDash ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw("│ "),
        Span::styled(state.store_label.as_str(), Style::default().fg(Color::Yellow)),
        Span::raw(" │ "),
        Span::raw(format!("basis: {}", state.basis)),
        Span::raw(" │ "),
        Span::raw(format!("{} groups", state.items.len())),
    ];
    for (severity, count) in state.severity_counts() {
        spans.push(Span::raw(" │ "));
        spans.push(Span::styled(
            format!("{} {}", count, severity),
            Style::default().fg(severity_color(severity)),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL).title(" Status "));
    frame.render_widget(header, area);
}

fn render_main(state: &AppState, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    render_record_table(state, frame, chunks[0]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(7)])
        .split(chunks[1]);

    render_detail(state, frame, side[0]);
    render_legend(frame, side[1]);
}

/// Render the record table
fn render_record_table(state: &AppState, frame: &mut Frame, area: Rect) {
    let items = state.filtered_items();
    let rows: Vec<Row> = items
        .iter()
        .map(|item| {
            let color = severity_color(item.severity);
            Row::new(vec![
                Cell::from(Span::styled("●", Style::default().fg(color))),
                Cell::from(item.record.name.clone()),
                Cell::from(format!("{:>8.2}%", item.record.progress_percent)),
                Cell::from(Span::styled(item.severity.to_string(), Style::default().fg(color))),
                Cell::from(if item.record.is_placed() { "yes" } else { "-" }),
            ])
        })
        .collect();

    let title = if state.filter_text.is_empty() {
        format!(" Groups ({}) ", items.len())
    } else {
        format!(" Groups ({}) /{} ", items.len(), state.filter_text)
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(2),
            Constraint::Min(16),
            Constraint::Length(10),
            Constraint::Length(9),
            Constraint::Length(4),
        ],
    )
    .header(
        Row::new(vec!["", "Group", "Progress", "Severity", "Map"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL).title(title))
    .row_highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut table_state = TableState::default();
    if !items.is_empty() {
        table_state.select(Some(state.selection.selected_index));
    }
    frame.render_stateful_widget(table, area, &mut table_state);
}

/// Render the detail pane (popup fields of the selected record)
fn render_detail(state: &AppState, frame: &mut Frame, area: Rect) {
    let content = match state.selected_item() {
        Some(item) => {
            let mut lines: Vec<Line> = popup_fields(&item.record)
                .into_iter()
                .map(|(key, value)| {
                    Line::from(vec![
                        Span::styled(format!("{}: ", key), Style::default().add_modifier(Modifier::BOLD)),
                        Span::raw(value),
                    ])
                })
                .collect();
            if !item.record.is_placed() {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "No valid coordinates - not shown on the map",
                    Style::default().fg(Color::DarkGray),
                )));
            }
            lines
        }
        None => vec![Line::from("No group selected")],
    };

    let detail = Paragraph::new(content)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: true });
    frame.render_widget(detail, area);
}

/// Render the progress legend
fn render_legend(frame: &mut Frame, area: Rect) {
    let lines: Vec<Line> = legend()
        .into_iter()
        .map(|entry| {
            Line::from(vec![
                Span::styled("■ ", Style::default().fg(severity_color(entry.severity))),
                Span::raw(format!("{:<7} {}", entry.label, entry.severity)),
            ])
        })
        .collect();

    let legend = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Progress Legend "));
    frame.render_widget(legend, area);
}

/// Render the edit form overlay
fn render_edit_overlay(state: &AppState, form: &EditForm, frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(50, 50, area);
    frame.render_widget(Clear, popup_area);

    let input_line = |label: &str, value: &str, focused: bool| {
        let style = if focused {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default()
        };
        let cursor = if focused { "▏" } else { "" };
        Line::from(vec![
            Span::styled(format!("{:<20}", label), Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(format!(" {}{} ", value, cursor), style),
        ])
    };

    let preview = match form.preview(state.basis) {
        Some(percent) => {
            let severity = classify(percent);
            Span::styled(
                format!("{:.2}% ({})", percent, severity),
                Style::default().fg(severity_color(severity)),
            )
        }
        None => Span::styled("invalid input", Style::default().fg(Color::Red)),
    };

    let text = vec![
        Line::from(vec![Span::styled(
            form.record.name.as_str(),
            Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )]),
        Line::from(""),
        Line::from(format!(
            "Proposed length (m): {}",
            crate::markers::format_amount(form.record.proposed_length)
        )),
        Line::from(format!(
            "Budget required:     {}",
            crate::markers::format_amount(form.record.budget_required)
        )),
        Line::from(format!("Current progress:    {:.2}%", form.record.progress_percent)),
        Line::from(""),
        input_line("Actual length (m)", &form.actual_length, form.focus == EditField::ActualLength),
        input_line("Absorbed funds", &form.absorbed_funds, form.focus == EditField::AbsorbedFunds),
        Line::from(""),
        Line::from(vec![Span::raw("New progress:        "), preview]),
        Line::from(""),
        Line::from(Span::styled(
            "Tab switch field │ Enter save │ Esc cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let form_widget = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title(" Update Data "))
        .wrap(Wrap { trim: false });
    frame.render_widget(form_widget, popup_area);
}

/// Render help overlay
fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let key_line = |keys: &'static str, action: &'static str| {
        Line::from(vec![
            Span::styled(format!("{:<11}", keys), Style::default().fg(Color::Cyan)),
            Span::raw(action),
        ])
    };

    let help_text = vec![
        Line::from(vec![Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )]),
        Line::from(""),
        key_line("q, Ctrl+c", "Quit"),
        key_line("?, F1", "Toggle help"),
        key_line("↑/↓, j/k", "Navigate groups"),
        key_line("g/G", "First / last group"),
        key_line("/", "Filter by name"),
        key_line("Esc", "Clear filter / close"),
        key_line("e, Enter", "Edit selected group"),
        key_line("r", "Reload from store"),
        Line::from(""),
        Line::from(vec![Span::styled("Edit form", Style::default().add_modifier(Modifier::BOLD))]),
        key_line("Tab", "Switch field"),
        key_line("Del", "Clear field"),
        key_line("Enter", "Save"),
        key_line("Esc", "Cancel"),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help ")
                .style(Style::default().bg(Color::DarkGray)),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(help, popup_area);
}

/// Render the footer bar
fn render_footer(state: &AppState, frame: &mut Frame, area: Rect) {
    let line = if let InteractionMode::Filter(text) = &state.interaction_mode {
        Line::from(vec![
            Span::styled("/", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(text.as_str()),
            Span::raw("▏"),
        ])
    } else {
        match &state.status {
            Some(StatusMessage::Error(msg)) => Line::from(Span::styled(
                format!(" ✗ {}", msg),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            Some(StatusMessage::Info(msg)) => {
                Line::from(Span::styled(format!(" ✓ {}", msg), Style::default().fg(Color::Green)))
            }
            None => Line::from(vec![
                Span::styled(" q", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
                Span::raw(" Quit "),
                Span::styled(" ?", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
                Span::raw(" Help "),
                Span::styled(" ↑↓", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
                Span::raw(" Navigate "),
                Span::styled(" e", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
                Span::raw(" Edit "),
                Span::styled(" /", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
                Span::raw(" Filter "),
            ]),
        }
    };

    let footer = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, area);
}

/// Helper to create a centered rect
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
