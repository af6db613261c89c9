use std::mem;
use std::path::{Path, PathBuf};

use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};
use ratatui::Frame;
use tracing::{info, warn};

use crate::config::Settings;
use crate::db::{Confirmation, SearchOutcome, StudentStore, UpdateOutcome};
use crate::error::ErrorKind;
use crate::export::write_csv;
use crate::models::SearchCriteria;

use super::forms::{
    ConfirmDelete, ExportPrompt, SettingsField, SettingsForm, StudentField, StudentForm,
};
use super::helpers::{centered_rect, cursor_after, record_error_message, surface_error};
use super::screens::{ActiveFilter, TableScreen};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Title banner above the table.
const HEADER_HEIGHT: u16 = 3;
/// Rows skipped by PageUp / PageDown.
const PAGE_STEP: isize = 10;
const DEFAULT_EXPORT_FILE: &str = "students.csv";
const TABLE_HEADINGS: [&str; 6] = [
    "Registration#",
    "Name",
    "Email",
    "Contact#",
    "D.O.B",
    "Hostelite",
];

/// Fine-grained modes layered over the table screen.
enum Mode {
    Normal,
    AddingStudent(StudentForm),
    EditingStudent {
        registration_no: String,
        form: StudentForm,
    },
    ConfirmDelete(ConfirmDelete),
    ConfirmClearAll,
    Searching(SearchState),
    Exporting(ExportPrompt),
    Configuring(SettingsForm),
}

/// State for the search bar. The criteria sticks between searches.
struct SearchState {
    criteria: SearchCriteria,
    query: String,
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI.
pub struct App<'a> {
    store: StudentStore<'a>,
    /// File contents without environment overrides; the settings dialog
    /// edits and rewrites these.
    settings: Settings,
    config_path: PathBuf,
    table: TableScreen,
    total: usize,
    last_criteria: SearchCriteria,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl<'a> App<'a> {
    pub fn new(store: StudentStore<'a>, settings: Settings, config_path: PathBuf) -> Self {
        let mut app = Self {
            store,
            settings,
            config_path,
            table: TableScreen::default(),
            total: 0,
            last_criteria: SearchCriteria::default(),
            mode: Mode::Normal,
            status: None,
        };

        if app.store.gateway().is_connected() {
            app.reload(None);
        } else {
            let message = format!(
                "Database unavailable at {}. Press 'c' to review settings, then restart.",
                app.store.gateway().location()
            );
            app.set_status(message, StatusKind::Error);
        }
        app
    }

    /// Show an informational message in the footer, e.g. after first-run
    /// bootstrap.
    pub fn notify<S: Into<String>>(&mut self, text: S) {
        self.set_status(text, StatusKind::Info);
    }

    /// Process one key press. Returns `true` when the user asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit),
            Mode::AddingStudent(form) => self.handle_add_student(code, form),
            Mode::EditingStudent {
                registration_no,
                form,
            } => self.handle_edit_student(code, registration_no, form),
            Mode::ConfirmDelete(confirm) => self.handle_confirm_delete(code, confirm),
            Mode::ConfirmClearAll => self.handle_confirm_clear_all(code),
            Mode::Searching(state) => self.handle_search(code, state),
            Mode::Exporting(prompt) => self.handle_export(code, prompt),
            Mode::Configuring(form) => self.handle_configure(code, form),
        };

        exit
    }

    /// Ctrl+U: empty the focused input, whichever dialog is open.
    pub(crate) fn handle_ctrl_u(&mut self) {
        match &mut self.mode {
            Mode::AddingStudent(form) | Mode::EditingStudent { form, .. } => form.clear_active(),
            Mode::Searching(state) => state.query.clear(),
            Mode::Exporting(prompt) => prompt.path.clear(),
            Mode::Configuring(form) => form.clear_active(),
            Mode::Normal | Mode::ConfirmDelete(_) | Mode::ConfirmClearAll => {}
        }
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Mode {
        match code {
            KeyCode::Char('q') => *exit = true,
            KeyCode::Esc => {
                if self.table.filter.is_some() {
                    self.clear_status();
                    self.reload(None);
                } else {
                    *exit = true;
                }
            }
            KeyCode::Up => self.table.move_selection(-1),
            KeyCode::Down => self.table.move_selection(1),
            KeyCode::PageUp => self.table.move_selection(-PAGE_STEP),
            KeyCode::PageDown => self.table.move_selection(PAGE_STEP),
            KeyCode::Home => self.table.select_first(),
            KeyCode::End => self.table.select_last(),
            KeyCode::Char('+') | KeyCode::Char('a') => {
                self.clear_status();
                return Mode::AddingStudent(StudentForm::default());
            }
            KeyCode::Enter | KeyCode::Char('e') => {
                if let Some(record) = self.table.current_record() {
                    let registration_no = record.registration_no.clone();
                    let form = StudentForm::from_record(record);
                    self.clear_status();
                    return Mode::EditingStudent {
                        registration_no,
                        form,
                    };
                }
                self.set_status("Please select a record to update!", StatusKind::Error);
            }
            KeyCode::Char('-') | KeyCode::Char('d') => {
                if let Some(record) = self.table.current_record() {
                    let confirm = ConfirmDelete::from(record);
                    self.clear_status();
                    return Mode::ConfirmDelete(confirm);
                }
                self.set_status("Please select a record to delete!", StatusKind::Error);
            }
            KeyCode::Char('X') => {
                self.clear_status();
                return Mode::ConfirmClearAll;
            }
            KeyCode::Char('f') | KeyCode::Char('/') => {
                self.clear_status();
                return Mode::Searching(SearchState {
                    criteria: self.last_criteria,
                    query: String::new(),
                });
            }
            KeyCode::Char('r') => {
                self.clear_status();
                self.reload(self.selected_key().as_deref());
            }
            KeyCode::Char('x') => {
                self.clear_status();
                return Mode::Exporting(ExportPrompt::new(DEFAULT_EXPORT_FILE));
            }
            KeyCode::Char('c') => {
                self.clear_status();
                return Mode::Configuring(SettingsForm::from_settings(&self.settings.database));
            }
            _ => {}
        }
        Mode::Normal
    }

    fn handle_add_student(&mut self, code: KeyCode, mut form: StudentForm) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status("Add cancelled.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Enter => match self.store.add(&form.registration_no, &form.fields()) {
                Ok(record) => {
                    self.reload(Some(&record.registration_no));
                    self.set_status("Student record added successfully!", StatusKind::Info);
                    return Mode::Normal;
                }
                Err(err) => {
                    let message = record_error_message(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            code => edit_student_form(&mut form, code),
        }
        Mode::AddingStudent(form)
    }

    fn handle_edit_student(&mut self, code: KeyCode, registration_no: String, mut form: StudentForm) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status("Edit cancelled.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Enter => match self.store.update(&registration_no, &form.fields()) {
                Ok(UpdateOutcome::Updated) => {
                    self.reload(Some(&registration_no));
                    self.set_status("Student record updated successfully!", StatusKind::Info);
                    return Mode::Normal;
                }
                Ok(UpdateOutcome::Unmatched) => {
                    self.reload(None);
                    self.set_status(
                        format!("Registration# {registration_no} no longer exists; nothing was updated."),
                        StatusKind::Info,
                    );
                    return Mode::Normal;
                }
                Err(err) => {
                    let message = record_error_message(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            code => edit_student_form(&mut form, code),
        }
        Mode::EditingStudent {
            registration_no,
            form,
        }
    }

    fn handle_confirm_delete(&mut self, code: KeyCode, confirm: ConfirmDelete) -> Mode {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Mode::Normal
            }
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self
                    .store
                    .delete(&confirm.registration_no, Confirmation::granted())
                {
                    Ok(_) => {
                        self.reload(None);
                        self.set_status("Student record deleted successfully!", StatusKind::Info);
                        Mode::Normal
                    }
                    Err(err) => {
                        self.set_status(record_error_message(&err), StatusKind::Error);
                        Mode::ConfirmDelete(confirm)
                    }
                }
            }
            _ => Mode::ConfirmDelete(confirm),
        }
    }

    fn handle_confirm_clear_all(&mut self, code: KeyCode) -> Mode {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Clear cancelled.", StatusKind::Info);
                Mode::Normal
            }
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.store.clear_all(Confirmation::granted()) {
                    Ok(removed) => {
                        self.reload(None);
                        self.set_status(
                            format!("All records have been deleted ({removed})."),
                            StatusKind::Info,
                        );
                    }
                    Err(err) => {
                        self.set_status(record_error_message(&err), StatusKind::Error);
                    }
                }
                Mode::Normal
            }
            _ => Mode::ConfirmClearAll,
        }
    }

    fn handle_search(&mut self, code: KeyCode, mut state: SearchState) -> Mode {
        match code {
            KeyCode::Esc => {
                self.clear_status();
                return Mode::Normal;
            }
            KeyCode::Tab | KeyCode::Right => state.criteria = state.criteria.next(),
            KeyCode::BackTab | KeyCode::Left => state.criteria = state.criteria.previous(),
            KeyCode::Backspace => {
                state.query.pop();
            }
            KeyCode::Char(ch) => {
                if !ch.is_control() {
                    state.query.push(ch);
                }
            }
            KeyCode::Enter => {
                self.last_criteria = state.criteria;
                return self.run_search(state);
            }
            _ => {}
        }
        Mode::Searching(state)
    }

    fn run_search(&mut self, state: SearchState) -> Mode {
        let term = state.query.trim().to_string();
        if term.is_empty() {
            self.reload(None);
            self.clear_status();
            return Mode::Normal;
        }

        match self.store.search(state.criteria, &term) {
            Ok(outcome) => {
                if let Ok(total) = self.store.count() {
                    self.total = total;
                }
                let filter = Some(ActiveFilter {
                    criteria: state.criteria,
                    term,
                });
                match outcome {
                    SearchOutcome::Matches(records) => {
                        let count = records.len();
                        self.table.set_records(records, filter);
                        self.table.select_first();
                        self.set_status(
                            format!("{count} matching record(s). Esc shows all."),
                            StatusKind::Info,
                        );
                    }
                    SearchOutcome::NoMatches => {
                        self.table.set_records(Vec::new(), filter);
                        self.set_status("No matching records found", StatusKind::Info);
                    }
                }
                Mode::Normal
            }
            Err(err) => {
                self.set_status(record_error_message(&err), StatusKind::Error);
                if err.kind() == ErrorKind::Validation {
                    Mode::Searching(state)
                } else {
                    Mode::Normal
                }
            }
        }
    }

    fn handle_export(&mut self, code: KeyCode, mut prompt: ExportPrompt) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status("Export cancelled.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Backspace => {
                prompt.path.pop();
                prompt.error = None;
            }
            KeyCode::Char(ch) => {
                if prompt.push_char(ch) {
                    prompt.error = None;
                }
            }
            KeyCode::Enter => {
                let destination = prompt.path.trim().to_string();
                if destination.is_empty() {
                    prompt.error = Some("Choose a file to export to.".to_string());
                    return Mode::Exporting(prompt);
                }
                return self.export_to(Path::new(&destination), prompt);
            }
            _ => {}
        }
        Mode::Exporting(prompt)
    }

    fn export_to(&mut self, destination: &Path, mut prompt: ExportPrompt) -> Mode {
        let records = match self.store.list_all() {
            Ok(records) => records,
            Err(err) => {
                self.set_status(record_error_message(&err), StatusKind::Error);
                return Mode::Normal;
            }
        };
        if records.is_empty() {
            self.set_status("No records to export!", StatusKind::Info);
            return Mode::Normal;
        }

        match write_csv(&records, destination) {
            Ok(path) => {
                self.set_status(
                    format!("Records exported to {}", path.display()),
                    StatusKind::Info,
                );
                Mode::Normal
            }
            Err(err) => {
                let message = surface_error(&err);
                warn!(error = ?err, "export failed");
                prompt.error = Some(message.clone());
                self.set_status(format!("Failed to export records: {message}"), StatusKind::Error);
                Mode::Exporting(prompt)
            }
        }
    }

    fn handle_configure(&mut self, code: KeyCode, mut form: SettingsForm) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status("Configuration unchanged.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Tab | KeyCode::Down => form.toggle_field(),
            KeyCode::BackTab | KeyCode::Up => form.previous_field(),
            KeyCode::Backspace => {
                form.backspace();
                form.error = None;
            }
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            KeyCode::Enter => match form.parse_inputs() {
                Ok(database) => {
                    let mut updated = self.settings.clone();
                    updated.database = database;
                    match updated.save(&self.config_path) {
                        Ok(()) => {
                            info!(path = %self.config_path.display(), "settings saved");
                            self.settings = updated;
                            self.set_status(
                                "Configuration saved successfully! Please restart the application.",
                                StatusKind::Info,
                            );
                            return Mode::Normal;
                        }
                        Err(err) => {
                            let message = surface_error(&err);
                            form.error = Some(message.clone());
                            self.set_status(message, StatusKind::Error);
                        }
                    }
                }
                Err(message) => {
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            _ => {}
        }
        Mode::Configuring(form)
    }

    /// Reload every record, dropping any active search, and optionally move
    /// the cursor onto `focus`.
    fn reload(&mut self, focus: Option<&str>) {
        match self.store.list_all() {
            Ok(records) => {
                self.total = records.len();
                self.table.set_records(records, None);
                if let Some(key) = focus {
                    self.table.focus(key);
                }
            }
            Err(err) => {
                self.set_status(record_error_message(&err), StatusKind::Error);
            }
        }
    }

    fn selected_key(&self) -> Option<String> {
        self.table
            .current_record()
            .map(|record| record.registration_no.clone())
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT.min(area.height)),
                Constraint::Min(0),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        self.draw_header(frame, chunks[0]);
        self.draw_table(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);

        match &self.mode {
            Mode::AddingStudent(form) => self.draw_student_form(frame, area, "Add Student", form),
            Mode::EditingStudent { form, .. } => {
                self.draw_student_form(frame, area, "Update Student", form)
            }
            Mode::ConfirmDelete(confirm) => self.draw_confirm_delete(frame, area, confirm),
            Mode::ConfirmClearAll => self.draw_confirm_clear_all(frame, area),
            Mode::Searching(state) => self.draw_search_bar(frame, chunks[1], state),
            Mode::Exporting(prompt) => self.draw_export_prompt(frame, area, prompt),
            Mode::Configuring(form) => self.draw_settings_form(frame, area, form),
            Mode::Normal => {}
        }
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let title = Paragraph::new(Line::from(Span::styled(
            "Student Management System",
            Style::default().add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(title, area);
    }

    fn draw_table(&self, frame: &mut Frame, area: Rect) {
        let title = match &self.table.filter {
            Some(filter) => format!(
                "Students • {} contains '{}' ({} of {})",
                filter.criteria,
                filter.term,
                self.table.records.len(),
                self.total
            ),
            None => format!("Students ({})", self.table.records.len()),
        };
        let block = Block::default().title(title).borders(Borders::ALL);

        if self.table.records.is_empty() {
            let message = if self.table.filter.is_some() {
                "No matching records found."
            } else {
                "No students yet. Press '+' to add one."
            };
            let paragraph = Paragraph::new(message)
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(paragraph, area);
            return;
        }

        let header = Row::new(TABLE_HEADINGS.iter().map(|heading| {
            Cell::from(*heading).style(Style::default().add_modifier(Modifier::BOLD))
        }))
        .style(Style::default().fg(Color::Cyan));

        let rows = self
            .table
            .records
            .iter()
            .map(|record| Row::new(record.display_values().map(Cell::from)));

        let widths = [
            Constraint::Length(14),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Length(14),
            Constraint::Length(11),
            Constraint::Length(9),
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .row_highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
            .highlight_symbol("▶ ");

        let mut state = TableState::default();
        state.select(Some(self.table.selected));
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let pairs: &[(&str, &str)] = match &self.mode {
            Mode::Normal => &[
                ("[↑↓]", " Navigate   "),
                ("[+]", " Add   "),
                ("[e]", " Update   "),
                ("[-]", " Delete   "),
                ("[f]", " Search   "),
                ("[r]", " Show All   "),
                ("[x]", " Export CSV   "),
                ("[X]", " Clear Table   "),
                ("[c]", " Configure DB   "),
                ("[q]", " Quit"),
            ],
            Mode::AddingStudent(_) | Mode::EditingStudent { .. } => &[
                ("[Tab]", " Next Field   "),
                ("[Space]", " Hostelite   "),
                ("[Ctrl+U]", " Clear Field   "),
                ("[Enter]", " Save   "),
                ("[Esc]", " Cancel"),
            ],
            Mode::ConfirmDelete(_) | Mode::ConfirmClearAll => {
                &[("[y]", " Confirm   "), ("[n/Esc]", " Cancel")]
            }
            Mode::Searching(_) => &[
                ("[Tab]", " Criteria   "),
                ("[Enter]", " Search   "),
                ("[Esc]", " Cancel"),
            ],
            Mode::Exporting(_) => &[("[Enter]", " Export   "), ("[Esc]", " Cancel")],
            Mode::Configuring(_) => &[
                ("[Tab]", " Next Field   "),
                ("[Enter]", " Save   "),
                ("[Esc]", " Cancel"),
            ],
        };

        let spans: Vec<Span<'static>> = pairs
            .iter()
            .flat_map(|(key, label)| [Span::styled(*key, key_style), Span::raw(*label)])
            .collect();
        Line::from(spans)
    }

    fn draw_student_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &StudentForm) {
        let popup_area = centered_rect(60, 50, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines: Vec<Line> = StudentField::ALL
            .iter()
            .map(|field| form.build_line(*field))
            .collect();
        lines.push(Line::from(""));

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save • Tab to switch • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines);
        frame.render_widget(paragraph, inner);

        if form.active != StudentField::Hostelite {
            let cursor_x = cursor_after(inner, form.active.label(), form.value_len(form.active));
            frame.set_cursor_position((cursor_x, inner.y + form.active_row()));
        }
    }

    fn draw_confirm_delete(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Confirm").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!(
                "Delete {} ({})?",
                confirm.registration_no, confirm.name
            )),
            Line::from("Are you sure you want to delete this record?"),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_confirm_clear_all(&self, frame: &mut Frame, area: Rect) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Confirm Clear")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red));
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!("Delete ALL {} records?", self.total)),
            Line::from("This action cannot be undone!"),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_search_bar(&self, frame: &mut Frame, area: Rect, state: &SearchState) {
        let height = 3u16.min(area.height);
        let popup_area = Rect {
            x: area.x,
            y: area.y,
            width: area.width,
            height,
        };
        frame.render_widget(Clear, popup_area);

        let title = format!("Search By: {} (Tab to change)", state.criteria);
        let block = Block::default().borders(Borders::ALL).title(title);
        let paragraph = Paragraph::new(Span::raw(format!("Search: {}", state.query)))
            .block(block.clone())
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);

        let inner = block.inner(popup_area);
        let cursor_x = inner.x + "Search: ".len() as u16 + state.query.chars().count() as u16;
        frame.set_cursor_position((cursor_x, inner.y));
    }

    fn draw_export_prompt(&self, frame: &mut Frame, area: Rect, prompt: &ExportPrompt) {
        let popup_area = centered_rect(70, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Save Student Records")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![prompt.build_line(), Line::from("")];
        if let Some(error) = &prompt.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "A .csv extension is added when missing.",
                Style::default().fg(Color::Gray),
            )));
        }

        frame.render_widget(Paragraph::new(lines), inner);
        let cursor_x = cursor_after(inner, "Save to", prompt.path.chars().count());
        frame.set_cursor_position((cursor_x, inner.y));
    }

    fn draw_settings_form(&self, frame: &mut Frame, area: Rect, form: &SettingsForm) {
        let popup_area = centered_rect(60, 40, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Database Configuration")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = form.all_lines();
        lines.push(Line::from(""));
        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Changes apply after restarting the application.",
                Style::default().fg(Color::Gray),
            )));
        }

        frame.render_widget(Paragraph::new(lines), inner);

        let active: SettingsField = form.active;
        let cursor_x = cursor_after(inner, active.label(), form.value_len(active));
        frame.set_cursor_position((cursor_x, inner.y + form.active_row()));
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }
}

/// Keys shared by the add and update forms.
fn edit_student_form(form: &mut StudentForm, code: KeyCode) {
    match code {
        KeyCode::Tab | KeyCode::Down => form.next_field(),
        KeyCode::BackTab | KeyCode::Up => form.previous_field(),
        KeyCode::Left | KeyCode::Right if form.active == StudentField::Hostelite => {
            form.cycle_hostelite();
        }
        KeyCode::Backspace => {
            form.backspace();
            form.error = None;
        }
        KeyCode::Char(ch) => {
            if form.push_char(ch) {
                form.error = None;
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ensure_schema, Gateway};
    use crate::models::{Hostelite, StudentFields};

    fn type_text(app: &mut App<'_>, text: &str) {
        for ch in text.chars() {
            app.handle_key(KeyCode::Char(ch));
        }
    }

    fn app_with(gateway: &Gateway) -> App<'_> {
        ensure_schema(gateway).unwrap();
        App::new(
            StudentStore::new(gateway),
            Settings::default(),
            PathBuf::from("unused-config.toml"),
        )
    }

    fn status_text(app: &App<'_>) -> String {
        app.status
            .as_ref()
            .map(|s| s.text.clone())
            .unwrap_or_default()
    }

    #[test]
    fn add_form_stores_student_and_refreshes_table() {
        let gateway = Gateway::open_in_memory();
        let mut app = app_with(&gateway);

        app.handle_key(KeyCode::Char('+'));
        type_text(&mut app, "S100");
        app.handle_key(KeyCode::Tab);
        type_text(&mut app, "Ayesha");
        app.handle_key(KeyCode::Tab);
        app.handle_key(KeyCode::Tab);
        app.handle_key(KeyCode::Tab);
        type_text(&mut app, "2002-03-04");
        app.handle_key(KeyCode::Tab);
        app.handle_key(KeyCode::Char('y'));
        app.handle_key(KeyCode::Enter);

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(status_text(&app), "Student record added successfully!");
        assert_eq!(app.table.records.len(), 1);
        let record = app.table.current_record().unwrap();
        assert_eq!(record.registration_no, "S100");
        assert_eq!(record.dob_text(), "2002-03-04");
        assert_eq!(record.hostelite, Some(Hostelite::Yes));
    }

    #[test]
    fn add_form_keeps_open_on_validation_error() {
        let gateway = Gateway::open_in_memory();
        let mut app = app_with(&gateway);

        app.handle_key(KeyCode::Char('a'));
        type_text(&mut app, "S1");
        app.handle_key(KeyCode::Enter);

        match &app.mode {
            Mode::AddingStudent(form) => {
                assert_eq!(form.error.as_deref(), Some("Name is required."));
            }
            _ => panic!("form should stay open"),
        }
        assert!(app.table.records.is_empty());
    }

    #[test]
    fn duplicate_key_is_reported() {
        let gateway = Gateway::open_in_memory();
        let store = StudentStore::new(&gateway);
        ensure_schema(&gateway).unwrap();
        store
            .add(
                "S1",
                &StudentFields {
                    name: "First".into(),
                    ..StudentFields::default()
                },
            )
            .unwrap();
        let mut app = app_with(&gateway);

        app.handle_key(KeyCode::Char('+'));
        type_text(&mut app, "S1");
        app.handle_key(KeyCode::Tab);
        type_text(&mut app, "Second");
        app.handle_key(KeyCode::Enter);

        assert_eq!(status_text(&app), "Registration# S1 already exists!");
        assert_eq!(app.table.records.len(), 1);
        assert_eq!(app.table.records[0].name, "First");
    }

    #[test]
    fn edit_then_delete_selected_row() {
        let gateway = Gateway::open_in_memory();
        let mut app = app_with(&gateway);
        app.handle_key(KeyCode::Char('+'));
        type_text(&mut app, "K1");
        app.handle_key(KeyCode::Tab);
        type_text(&mut app, "Old");
        app.handle_key(KeyCode::Enter);

        app.handle_key(KeyCode::Char('e'));
        for _ in 0..3 {
            app.handle_key(KeyCode::Backspace);
        }
        type_text(&mut app, "New");
        app.handle_key(KeyCode::Enter);
        assert_eq!(status_text(&app), "Student record updated successfully!");
        assert_eq!(app.table.records[0].name, "New");

        app.handle_key(KeyCode::Char('-'));
        app.handle_key(KeyCode::Char('n'));
        assert_eq!(app.table.records.len(), 1);

        app.handle_key(KeyCode::Char('-'));
        app.handle_key(KeyCode::Char('y'));
        assert!(app.table.records.is_empty());
        assert_eq!(status_text(&app), "Student record deleted successfully!");
    }

    #[test]
    fn search_filters_and_escape_restores() {
        let gateway = Gateway::open_in_memory();
        let mut app = app_with(&gateway);
        for (key, name) in [("S1", "Hannan"), ("S2", "Zara"), ("S3", "Danish")] {
            app.handle_key(KeyCode::Char('+'));
            type_text(&mut app, key);
            app.handle_key(KeyCode::Tab);
            type_text(&mut app, name);
            app.handle_key(KeyCode::Enter);
        }

        app.handle_key(KeyCode::Char('f'));
        app.handle_key(KeyCode::Tab);
        type_text(&mut app, "an");
        app.handle_key(KeyCode::Enter);

        assert_eq!(app.table.records.len(), 2);
        assert_eq!(
            app.table.filter,
            Some(ActiveFilter {
                criteria: SearchCriteria::Name,
                term: "an".into()
            })
        );

        app.handle_key(KeyCode::Esc);
        assert!(app.table.filter.is_none());
        assert_eq!(app.table.records.len(), 3);
    }

    #[test]
    fn bad_date_search_stays_in_search_mode() {
        let gateway = Gateway::open_in_memory();
        let mut app = app_with(&gateway);

        app.handle_key(KeyCode::Char('f'));
        app.handle_key(KeyCode::BackTab);
        type_text(&mut app, "31/12/2000");
        app.handle_key(KeyCode::Enter);

        assert!(matches!(app.mode, Mode::Searching(_)));
        assert!(status_text(&app).starts_with("Invalid date format"));
    }

    #[test]
    fn clear_all_requires_confirmation() {
        let gateway = Gateway::open_in_memory();
        let mut app = app_with(&gateway);
        app.handle_key(KeyCode::Char('+'));
        type_text(&mut app, "S1");
        app.handle_key(KeyCode::Tab);
        type_text(&mut app, "Ana");
        app.handle_key(KeyCode::Enter);

        app.handle_key(KeyCode::Char('X'));
        app.handle_key(KeyCode::Esc);
        assert_eq!(app.table.records.len(), 1);

        app.handle_key(KeyCode::Char('X'));
        app.handle_key(KeyCode::Char('y'));
        assert!(app.table.records.is_empty());
    }

    #[test]
    fn disconnected_database_is_reported_not_fatal() {
        let gateway = Gateway::disconnected("/nowhere/uobs.sqlite");
        let mut app = App::new(
            StudentStore::new(&gateway),
            Settings::default(),
            PathBuf::from("unused-config.toml"),
        );
        assert!(status_text(&app).starts_with("Database unavailable"));

        app.handle_key(KeyCode::Char('+'));
        type_text(&mut app, "S1");
        app.handle_key(KeyCode::Tab);
        type_text(&mut app, "Ana");
        app.handle_key(KeyCode::Enter);
        assert_eq!(status_text(&app), "Database error: no database connection");
    }

    #[test]
    fn settings_dialog_rewrites_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        let gateway = Gateway::open_in_memory();
        ensure_schema(&gateway).unwrap();
        let mut app = App::new(StudentStore::new(&gateway), Settings::default(), config.clone());

        app.handle_key(KeyCode::Char('c'));
        for _ in 0..3 {
            app.handle_key(KeyCode::Tab);
        }
        app.handle_ctrl_u();
        type_text(&mut app, "campus");
        app.handle_key(KeyCode::Enter);

        assert!(matches!(app.mode, Mode::Normal));
        let saved = Settings::load_stored(&config).unwrap();
        assert_eq!(saved.database.name, "campus");
        assert_eq!(saved.database.password, "password");
    }

    #[test]
    fn quit_keys_exit_from_normal_mode() {
        let gateway = Gateway::open_in_memory();
        let mut app = app_with(&gateway);
        assert!(!app.handle_key(KeyCode::Char('a')));
        assert!(!app.handle_key(KeyCode::Char('q')));
        app.handle_key(KeyCode::Esc);
        assert!(app.handle_key(KeyCode::Char('q')));
    }
}
