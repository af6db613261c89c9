use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::error::{ErrorKind, RecordError};

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Extract the most relevant error message from a chained error.
pub(crate) fn surface_error(err: &anyhow::Error) -> String {
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}

/// User-facing message for a failed record operation. Storage failures get a
/// fixed prefix so they read differently from input mistakes.
pub(crate) fn record_error_message(err: &RecordError) -> String {
    match err.kind() {
        ErrorKind::Validation | ErrorKind::Conflict => err.to_string(),
        ErrorKind::Storage => format!("Database error: {err}"),
    }
}

/// Render `Label: value` with the value highlighted when focused, or a dim
/// placeholder when empty.
pub(crate) fn field_line(label: &str, value: &str, placeholder: &str, active: bool) -> Line<'static> {
    let display = if value.is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    };

    let style = if active {
        Style::default().fg(Color::Yellow)
    } else if value.is_empty() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };

    Line::from(vec![
        Span::raw(format!("{label}: ")),
        Span::styled(display, style),
    ])
}

/// Cursor x position just after the value of a `Label: value` line.
pub(crate) fn cursor_after(area: Rect, label: &str, value_len: usize) -> u16 {
    area.x + (label.len() + 2 + value_len) as u16
}
