use chrono::NaiveDate;
use rusqlite::{params, Row};
use tracing::{debug, info};

use crate::db::Gateway;
use crate::error::{RecordError, RecordResult, StorageError};
use crate::models::{
    parse_date, parse_optional_date, SearchCriteria, StudentFields, StudentRecord,
};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS students (
    RegistrationNo VARCHAR(20) PRIMARY KEY,
    Name VARCHAR(50) NOT NULL,
    Email VARCHAR(50),
    Contact VARCHAR(15),
    DOB DATE,
    Hostelite VARCHAR(5)
)";

/// Column list shared by every read so `map_student` can rely on positions.
/// `rowid` ordering keeps results in insertion order.
const SELECT_ALL: &str = "SELECT RegistrationNo, Name, Email, Contact, DOB, Hostelite
     FROM students ORDER BY rowid";

const SELECT_BY_KEY: &str = "SELECT RegistrationNo, Name, Email, Contact, DOB, Hostelite
     FROM students WHERE RegistrationNo = ?1";

const INSERT: &str = "INSERT INTO students
     (RegistrationNo, Name, Email, Contact, DOB, Hostelite)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const UPDATE: &str = "UPDATE students
     SET Name = ?1, Email = ?2, Contact = ?3, DOB = ?4, Hostelite = ?5
     WHERE RegistrationNo = ?6";

const DELETE_ONE: &str = "DELETE FROM students WHERE RegistrationNo = ?1";

const DELETE_ALL: &str = "DELETE FROM students";

const COUNT: &str = "SELECT COUNT(*) FROM students";

/// Create the `students` table when it is missing. Run once at startup by
/// the process that owns the gateway.
pub fn ensure_schema(gateway: &Gateway) -> Result<(), StorageError> {
    gateway.execute(CREATE_TABLE, [])?;
    info!("students schema ready");
    Ok(())
}

/// Proof that the user agreed to a destructive operation. Only this crate can
/// mint one, and the UI does so only after its confirmation dialog; the store
/// never prompts on its own.
///
/// ```compile_fail
/// let _ = student_records::Confirmation::granted();
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Confirmation(());

impl Confirmation {
    pub(crate) fn granted() -> Self {
        Confirmation(())
    }
}

/// Result of an update. Updating a key that is not stored touches no rows,
/// which is still a successful statement; callers decide how to present it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    Unmatched,
}

/// Result of a search, kept apart from storage failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Matches(Vec<StudentRecord>),
    NoMatches,
}

impl SearchOutcome {
    fn from_rows(rows: Vec<StudentRecord>) -> Self {
        if rows.is_empty() {
            SearchOutcome::NoMatches
        } else {
            SearchOutcome::Matches(rows)
        }
    }

    pub fn into_records(self) -> Vec<StudentRecord> {
        match self {
            SearchOutcome::Matches(rows) => rows,
            SearchOutcome::NoMatches => Vec::new(),
        }
    }
}

/// Record operations over the `students` table. Borrows the gateway; opening
/// and closing the connection stays with whoever owns it.
pub struct StudentStore<'a> {
    gateway: &'a Gateway,
}

impl<'a> StudentStore<'a> {
    pub fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &'a Gateway {
        self.gateway
    }

    /// Insert a new student. Validation runs before any statement, then a key
    /// lookup rejects duplicates with [`RecordError::Duplicate`].
    pub fn add(&self, registration_no: &str, fields: &StudentFields) -> RecordResult<StudentRecord> {
        let key = required_key(registration_no)?;
        let record = validate(key, fields)?;

        if self.find(key)?.is_some() {
            return Err(RecordError::Duplicate(key.to_string()));
        }

        self.gateway.execute(
            INSERT,
            params![
                record.registration_no,
                record.name,
                record.email,
                record.contact,
                record.date_of_birth,
                record.hostelite,
            ],
        )?;
        info!(registration_no = %record.registration_no, "student added");
        Ok(record)
    }

    /// Replace every field except the key. No existence check runs first.
    pub fn update(&self, registration_no: &str, fields: &StudentFields) -> RecordResult<UpdateOutcome> {
        let key = required_key(registration_no)?;
        let record = validate(key, fields)?;

        let affected = self.gateway.execute(
            UPDATE,
            params![
                record.name,
                record.email,
                record.contact,
                record.date_of_birth,
                record.hostelite,
                record.registration_no,
            ],
        )?;

        if affected == 0 {
            debug!(registration_no = %key, "update matched no rows");
            Ok(UpdateOutcome::Unmatched)
        } else {
            info!(registration_no = %key, "student updated");
            Ok(UpdateOutcome::Updated)
        }
    }

    /// Permanently remove one student, returning how many rows went away.
    pub fn delete(&self, registration_no: &str, _confirmed: Confirmation) -> RecordResult<usize> {
        let key = required_key(registration_no)?;
        let removed = self.gateway.execute(DELETE_ONE, [key])?;
        info!(registration_no = %key, removed, "student deleted");
        Ok(removed)
    }

    /// Remove every student.
    pub fn clear_all(&self, _confirmed: Confirmation) -> RecordResult<usize> {
        let removed = self.gateway.execute(DELETE_ALL, [])?;
        info!(removed, "all students cleared");
        Ok(removed)
    }

    pub fn find(&self, registration_no: &str) -> RecordResult<Option<StudentRecord>> {
        let record = self
            .gateway
            .fetch_one(SELECT_BY_KEY, [registration_no.trim()], map_student)?;
        Ok(record)
    }

    pub fn list_all(&self) -> RecordResult<Vec<StudentRecord>> {
        let records = self.gateway.fetch_all(SELECT_ALL, [], map_student)?;
        Ok(records)
    }

    pub fn count(&self) -> RecordResult<usize> {
        let count: Option<i64> = self.gateway.fetch_one(COUNT, [], |row| row.get(0))?;
        Ok(count.map_or(0, |n| usize::try_from(n).unwrap_or(0)))
    }

    /// Search one column. Date of birth matches exactly and must be a valid
    /// `YYYY-MM-DD`; every other column matches as a substring. A blank term
    /// lists everything.
    pub fn search(&self, criteria: SearchCriteria, term: &str) -> RecordResult<SearchOutcome> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(SearchOutcome::from_rows(self.list_all()?));
        }

        let rows = match criteria {
            SearchCriteria::DateOfBirth => {
                let date: NaiveDate = parse_date(term)?;
                self.gateway
                    .fetch_all(search_sql(criteria), [date], map_student)?
            }
            _ => {
                let pattern = format!("%{}%", escape_like(term));
                self.gateway
                    .fetch_all(search_sql(criteria), [pattern], map_student)?
            }
        };

        debug!(criteria = %criteria, matches = rows.len(), "search finished");
        Ok(SearchOutcome::from_rows(rows))
    }
}

/// Complete statement per criteria. Column names never come from user input.
fn search_sql(criteria: SearchCriteria) -> &'static str {
    match criteria {
        SearchCriteria::RegistrationNo => {
            "SELECT RegistrationNo, Name, Email, Contact, DOB, Hostelite FROM students
             WHERE RegistrationNo LIKE ?1 ESCAPE '\\' ORDER BY rowid"
        }
        SearchCriteria::Name => {
            "SELECT RegistrationNo, Name, Email, Contact, DOB, Hostelite FROM students
             WHERE Name LIKE ?1 ESCAPE '\\' ORDER BY rowid"
        }
        SearchCriteria::Email => {
            "SELECT RegistrationNo, Name, Email, Contact, DOB, Hostelite FROM students
             WHERE Email LIKE ?1 ESCAPE '\\' ORDER BY rowid"
        }
        SearchCriteria::Contact => {
            "SELECT RegistrationNo, Name, Email, Contact, DOB, Hostelite FROM students
             WHERE Contact LIKE ?1 ESCAPE '\\' ORDER BY rowid"
        }
        SearchCriteria::DateOfBirth => {
            "SELECT RegistrationNo, Name, Email, Contact, DOB, Hostelite FROM students
             WHERE DOB = ?1 ORDER BY rowid"
        }
    }
}

/// Escape `LIKE` metacharacters so the user's term is matched literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn required_key(registration_no: &str) -> RecordResult<&str> {
    let key = registration_no.trim();
    if key.is_empty() {
        Err(RecordError::MissingField {
            field: "Registration#",
        })
    } else {
        Ok(key)
    }
}

/// Turn raw form input into a storable record.
fn validate(key: &str, fields: &StudentFields) -> RecordResult<StudentRecord> {
    let name = fields.name.trim();
    if name.is_empty() {
        return Err(RecordError::MissingField { field: "Name" });
    }
    let date_of_birth = parse_optional_date(&fields.date_of_birth)?;

    Ok(StudentRecord {
        registration_no: key.to_string(),
        name: name.to_string(),
        email: optional_text(&fields.email),
        contact: optional_text(&fields.contact),
        date_of_birth,
        hostelite: fields.hostelite.clone(),
    })
}

fn optional_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn map_student(row: &Row<'_>) -> rusqlite::Result<StudentRecord> {
    Ok(StudentRecord {
        registration_no: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        contact: row.get(3)?,
        date_of_birth: row.get(4)?,
        hostelite: row.get(5)?,
    })
}
