use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::config::DatabaseSettings;
use crate::models::{Hostelite, StudentFields, StudentRecord};

use super::helpers::field_line;

/// Longest accepted date input (`YYYY-MM-DD`).
const DATE_INPUT_LEN: usize = 10;

/// Fields of the student form, in focus order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum StudentField {
    RegistrationNo,
    Name,
    Email,
    Contact,
    DateOfBirth,
    Hostelite,
}

impl StudentField {
    pub(crate) const ALL: [StudentField; 6] = [
        StudentField::RegistrationNo,
        StudentField::Name,
        StudentField::Email,
        StudentField::Contact,
        StudentField::DateOfBirth,
        StudentField::Hostelite,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            StudentField::RegistrationNo => "Registration#",
            StudentField::Name => "Student Name",
            StudentField::Email => "Email",
            StudentField::Contact => "Contact#",
            StudentField::DateOfBirth => "D.O.B",
            StudentField::Hostelite => "Hostelite",
        }
    }

    fn placeholder(self) -> &'static str {
        match self {
            StudentField::RegistrationNo | StudentField::Name => "<required>",
            StudentField::DateOfBirth => "<YYYY-MM-DD>",
            StudentField::Hostelite => "<Space to choose>",
            StudentField::Email | StudentField::Contact => "<optional>",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }
}

impl Default for StudentField {
    fn default() -> Self {
        StudentField::RegistrationNo
    }
}

/// Internal representation of the student form. When editing, the key is
/// locked so focus skips it and typing cannot change it.
#[derive(Default, Clone, Debug)]
pub(crate) struct StudentForm {
    pub(crate) registration_no: String,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) contact: String,
    pub(crate) date_of_birth: String,
    pub(crate) hostelite: Option<Hostelite>,
    pub(crate) active: StudentField,
    pub(crate) key_locked: bool,
    pub(crate) error: Option<String>,
}

impl StudentForm {
    /// Populate the form from a selected row for editing.
    pub(crate) fn from_record(record: &StudentRecord) -> Self {
        let fields = StudentFields::from_record(record);
        Self {
            registration_no: record.registration_no.clone(),
            name: fields.name,
            email: fields.email,
            contact: fields.contact,
            date_of_birth: fields.date_of_birth,
            hostelite: fields.hostelite,
            active: StudentField::Name,
            key_locked: true,
            error: None,
        }
    }

    pub(crate) fn fields(&self) -> StudentFields {
        StudentFields {
            name: self.name.clone(),
            email: self.email.clone(),
            contact: self.contact.clone(),
            date_of_birth: self.date_of_birth.clone(),
            hostelite: self.hostelite.clone(),
        }
    }

    pub(crate) fn next_field(&mut self) {
        self.step(1);
    }

    pub(crate) fn previous_field(&mut self) {
        self.step(StudentField::ALL.len() - 1);
    }

    fn step(&mut self, by: usize) {
        let len = StudentField::ALL.len();
        let mut idx = self.active.index();
        loop {
            idx = (idx + by) % len;
            let candidate = StudentField::ALL[idx];
            if !(self.key_locked && candidate == StudentField::RegistrationNo) {
                self.active = candidate;
                return;
            }
        }
    }

    /// Append a character to the active field. The date field only takes
    /// digits and dashes; the hostel field only takes y/n or Space.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            StudentField::RegistrationNo => {
                if self.key_locked || ch.is_whitespace() {
                    return false;
                }
                self.registration_no.push(ch);
            }
            StudentField::Name => self.name.push(ch),
            StudentField::Email => self.email.push(ch),
            StudentField::Contact => self.contact.push(ch),
            StudentField::DateOfBirth => {
                if !(ch.is_ascii_digit() || ch == '-')
                    || self.date_of_birth.chars().count() >= DATE_INPUT_LEN
                {
                    return false;
                }
                self.date_of_birth.push(ch);
            }
            StudentField::Hostelite => match ch {
                'y' | 'Y' => self.hostelite = Some(Hostelite::Yes),
                'n' | 'N' => self.hostelite = Some(Hostelite::No),
                ' ' => self.cycle_hostelite(),
                _ => return false,
            },
        }
        true
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            StudentField::RegistrationNo => {
                if !self.key_locked {
                    self.registration_no.pop();
                }
            }
            StudentField::Name => {
                self.name.pop();
            }
            StudentField::Email => {
                self.email.pop();
            }
            StudentField::Contact => {
                self.contact.pop();
            }
            StudentField::DateOfBirth => {
                self.date_of_birth.pop();
            }
            StudentField::Hostelite => self.hostelite = None,
        }
    }

    /// Empty the active field.
    pub(crate) fn clear_active(&mut self) {
        match self.active {
            StudentField::RegistrationNo => {
                if !self.key_locked {
                    self.registration_no.clear();
                }
            }
            StudentField::Name => self.name.clear(),
            StudentField::Email => self.email.clear(),
            StudentField::Contact => self.contact.clear(),
            StudentField::DateOfBirth => self.date_of_birth.clear(),
            StudentField::Hostelite => self.hostelite = None,
        }
    }

    pub(crate) fn cycle_hostelite(&mut self) {
        self.hostelite = Hostelite::cycle(self.hostelite.as_ref());
    }

    fn value(&self, field: StudentField) -> String {
        match field {
            StudentField::RegistrationNo => self.registration_no.clone(),
            StudentField::Name => self.name.clone(),
            StudentField::Email => self.email.clone(),
            StudentField::Contact => self.contact.clone(),
            StudentField::DateOfBirth => self.date_of_birth.clone(),
            StudentField::Hostelite => self
                .hostelite
                .as_ref()
                .map(|h| h.as_str().to_string())
                .unwrap_or_default(),
        }
    }

    pub(crate) fn build_line(&self, field: StudentField) -> Line<'static> {
        let value = self.value(field);
        if field == StudentField::RegistrationNo && self.key_locked {
            return Line::from(vec![
                Span::raw(format!("{}: ", field.label())),
                Span::styled(value, Style::default().fg(Color::Gray)),
                Span::styled(" (locked)", Style::default().fg(Color::DarkGray)),
            ]);
        }
        field_line(
            field.label(),
            &value,
            field.placeholder(),
            self.active == field,
        )
    }

    pub(crate) fn value_len(&self, field: StudentField) -> usize {
        self.value(field).chars().count()
    }

    /// Row offset of the active field inside the popup, for cursor placement.
    pub(crate) fn active_row(&self) -> u16 {
        self.active.index() as u16
    }
}

/// State for confirming the removal of one record.
#[derive(Clone, Debug)]
pub(crate) struct ConfirmDelete {
    pub(crate) registration_no: String,
    pub(crate) name: String,
}

impl ConfirmDelete {
    pub(crate) fn from(record: &StudentRecord) -> Self {
        Self {
            registration_no: record.registration_no.clone(),
            name: record.name.clone(),
        }
    }
}

/// Destination prompt shown before writing a CSV export.
#[derive(Clone, Debug)]
pub(crate) struct ExportPrompt {
    pub(crate) path: String,
    pub(crate) error: Option<String>,
}

impl ExportPrompt {
    pub(crate) fn new(default_path: impl Into<String>) -> Self {
        Self {
            path: default_path.into(),
            error: None,
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        self.path.push(ch);
        true
    }

    pub(crate) fn build_line(&self) -> Line<'static> {
        field_line("Save to", &self.path, "<path>.csv", true)
    }
}

/// Fields of the database settings dialog.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum SettingsField {
    Host,
    User,
    Password,
    Database,
}

impl SettingsField {
    const ALL: [SettingsField; 4] = [
        SettingsField::Host,
        SettingsField::User,
        SettingsField::Password,
        SettingsField::Database,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            SettingsField::Host => "Host",
            SettingsField::User => "Username",
            SettingsField::Password => "Password",
            SettingsField::Database => "Database",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }
}

/// Editable copy of the database settings. The password is masked on screen.
#[derive(Clone, Debug)]
pub(crate) struct SettingsForm {
    pub(crate) host: String,
    pub(crate) user: String,
    pub(crate) password: String,
    pub(crate) database: String,
    pub(crate) active: SettingsField,
    pub(crate) error: Option<String>,
}

impl SettingsForm {
    pub(crate) fn from_settings(settings: &DatabaseSettings) -> Self {
        Self {
            host: settings.host.clone(),
            user: settings.user.clone(),
            password: settings.password.clone(),
            database: settings.name.clone(),
            active: SettingsField::Host,
            error: None,
        }
    }

    pub(crate) fn toggle_field(&mut self) {
        let idx = (self.active.index() + 1) % SettingsField::ALL.len();
        self.active = SettingsField::ALL[idx];
    }

    pub(crate) fn previous_field(&mut self) {
        let len = SettingsField::ALL.len();
        let idx = (self.active.index() + len - 1) % len;
        self.active = SettingsField::ALL[idx];
    }

    fn active_value(&mut self) -> &mut String {
        match self.active {
            SettingsField::Host => &mut self.host,
            SettingsField::User => &mut self.user,
            SettingsField::Password => &mut self.password,
            SettingsField::Database => &mut self.database,
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        self.active_value().push(ch);
        true
    }

    pub(crate) fn backspace(&mut self) {
        self.active_value().pop();
    }

    pub(crate) fn clear_active(&mut self) {
        self.active_value().clear();
    }

    /// Validate and convert to the persisted settings shape.
    pub(crate) fn parse_inputs(&self) -> Result<DatabaseSettings, String> {
        let database = self.database.trim();
        if database.is_empty() {
            return Err("Database name is required.".to_string());
        }
        Ok(DatabaseSettings {
            host: self.host.trim().to_string(),
            user: self.user.trim().to_string(),
            password: self.password.clone(),
            name: database.to_string(),
        })
    }

    fn display_value(&self, field: SettingsField) -> String {
        match field {
            SettingsField::Host => self.host.clone(),
            SettingsField::User => self.user.clone(),
            SettingsField::Password => "*".repeat(self.password.chars().count()),
            SettingsField::Database => self.database.clone(),
        }
    }

    pub(crate) fn build_line(&self, field: SettingsField) -> Line<'static> {
        let placeholder = match field {
            SettingsField::Database => "<required>",
            _ => "",
        };
        field_line(
            field.label(),
            &self.display_value(field),
            placeholder,
            self.active == field,
        )
    }

    pub(crate) fn all_lines(&self) -> Vec<Line<'static>> {
        SettingsField::ALL
            .iter()
            .map(|field| self.build_line(*field))
            .collect()
    }

    pub(crate) fn value_len(&self, field: SettingsField) -> usize {
        self.display_value(field).chars().count()
    }

    pub(crate) fn active_row(&self) -> u16 {
        self.active.index() as u16
    }
}
