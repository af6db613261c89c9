//! Domain types that mirror the `students` table. These stay plain data
//! holders; validation lives in the query layer and rendering in the UI.

use std::fmt;

use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

use crate::error::{RecordError, RecordResult};

/// The one date shape accepted from users and written to exports.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Whether the student lives in the hostel. The form only produces `Yes` or
/// `No`, but rows written by other tools may hold anything; that text is kept
/// as `Other` and written back unchanged on update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hostelite {
    Yes,
    No,
    Other(String),
}

impl Hostelite {
    pub fn as_str(&self) -> &str {
        match self {
            Hostelite::Yes => "Yes",
            Hostelite::No => "No",
            Hostelite::Other(text) => text,
        }
    }

    /// Map stored column text onto a variant. Only the exact values the form
    /// writes become `Yes` / `No`.
    pub fn from_stored(text: &str) -> Self {
        match text {
            "Yes" => Hostelite::Yes,
            "No" => Hostelite::No,
            other => Hostelite::Other(other.to_string()),
        }
    }

    /// Step through blank -> Yes -> No -> blank. The form uses this so the
    /// field can only ever be set to one of the allowed values.
    pub fn cycle(current: Option<&Hostelite>) -> Option<Hostelite> {
        match current {
            None | Some(Hostelite::Other(_)) => Some(Hostelite::Yes),
            Some(Hostelite::Yes) => Some(Hostelite::No),
            Some(Hostelite::No) => None,
        }
    }
}

impl fmt::Display for Hostelite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for Hostelite {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Hostelite {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str().map(Hostelite::from_stored)
    }
}

/// One row of the `students` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRecord {
    /// Primary key. Never changes once the record exists.
    pub registration_no: String,
    pub name: String,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub hostelite: Option<Hostelite>,
}

impl StudentRecord {
    /// Date of birth as `YYYY-MM-DD`, or an empty string when unknown.
    pub fn dob_text(&self) -> String {
        self.date_of_birth.map(format_date).unwrap_or_default()
    }

    /// The six display values in table column order.
    pub fn display_values(&self) -> [String; 6] {
        [
            self.registration_no.clone(),
            self.name.clone(),
            self.email.clone().unwrap_or_default(),
            self.contact.clone().unwrap_or_default(),
            self.dob_text(),
            self.hostelite
                .as_ref()
                .map(|h| h.as_str().to_string())
                .unwrap_or_default(),
        ]
    }
}

/// Raw, user-entered values for every column except the key. Add and update
/// both take this so validation runs on exactly what the user typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentFields {
    pub name: String,
    pub email: String,
    pub contact: String,
    /// Empty means "no date". Anything else must be `YYYY-MM-DD`.
    pub date_of_birth: String,
    pub hostelite: Option<Hostelite>,
}

impl StudentFields {
    pub fn from_record(record: &StudentRecord) -> Self {
        Self {
            name: record.name.clone(),
            email: record.email.clone().unwrap_or_default(),
            contact: record.contact.clone().unwrap_or_default(),
            date_of_birth: record.dob_text(),
            hostelite: record.hostelite.clone(),
        }
    }
}

/// Field a search runs against. The mapping to SQL lives in the query layer
/// and is a closed set, so user text never selects a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchCriteria {
    RegistrationNo,
    Name,
    Email,
    Contact,
    DateOfBirth,
}

impl SearchCriteria {
    pub const ALL: [SearchCriteria; 5] = [
        SearchCriteria::RegistrationNo,
        SearchCriteria::Name,
        SearchCriteria::Email,
        SearchCriteria::Contact,
        SearchCriteria::DateOfBirth,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SearchCriteria::RegistrationNo => "Registration#",
            SearchCriteria::Name => "Name",
            SearchCriteria::Email => "Email",
            SearchCriteria::Contact => "Contact#",
            SearchCriteria::DateOfBirth => "D.O.B",
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        let idx = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl Default for SearchCriteria {
    fn default() -> Self {
        SearchCriteria::RegistrationNo
    }
}

impl fmt::Display for SearchCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parse a strict `YYYY-MM-DD` date. Single-digit months or days, extra
/// whitespace inside the value, and impossible dates are all rejected.
///
/// chrono's `%m` and `%d` also accept one digit (`2001-2-3` parses), so the
/// fixed ten-byte shape is checked before handing the text to chrono.
pub fn parse_date(input: &str) -> RecordResult<NaiveDate> {
    let trimmed = input.trim();
    let bytes = trimmed.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(idx, b)| idx == 4 || idx == 7 || b.is_ascii_digit());
    if !shaped {
        return Err(RecordError::InvalidDate {
            input: trimmed.to_string(),
        });
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| RecordError::InvalidDate {
        input: trimmed.to_string(),
    })
}

/// Parse an optional date field: blank input means no date.
pub fn parse_optional_date(input: &str) -> RecordResult<Option<NaiveDate>> {
    if input.trim().is_empty() {
        Ok(None)
    } else {
        parse_date(input).map(Some)
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_accepts_canonical_form() {
        let date = parse_date("2001-02-28").unwrap();
        assert_eq!(format_date(date), "2001-02-28");
        assert_eq!(parse_date(" 1999-12-31 ").unwrap().to_string(), "1999-12-31");
    }

    #[test]
    fn parse_date_rejects_other_shapes() {
        for bad in ["2001-2-28", "28-02-2001", "2001/02/28", "2001-02-30", "", "abcd-ef-gh"] {
            let err = parse_date(bad).unwrap_err();
            assert!(matches!(err, RecordError::InvalidDate { .. }), "{bad}");
        }
    }

    #[test]
    fn optional_date_treats_blank_as_none() {
        assert_eq!(parse_optional_date("   ").unwrap(), None);
        assert!(parse_optional_date("2020-01-01").unwrap().is_some());
        assert!(parse_optional_date("01/01/2020").is_err());
    }

    #[test]
    fn hostelite_cycles_through_allowed_values() {
        assert_eq!(Hostelite::cycle(None), Some(Hostelite::Yes));
        assert_eq!(Hostelite::cycle(Some(&Hostelite::Yes)), Some(Hostelite::No));
        assert_eq!(Hostelite::cycle(Some(&Hostelite::No)), None);
        let legacy = Hostelite::Other("yes".into());
        assert_eq!(Hostelite::cycle(Some(&legacy)), Some(Hostelite::Yes));
        assert_eq!(Hostelite::from_stored("Yes"), Hostelite::Yes);
        assert_eq!(Hostelite::from_stored("yes"), Hostelite::Other("yes".into()));
        assert_eq!(Hostelite::from_stored("yes").as_str(), "yes");
    }

    #[test]
    fn criteria_wraps_in_both_directions() {
        assert_eq!(SearchCriteria::DateOfBirth.next(), SearchCriteria::RegistrationNo);
        assert_eq!(SearchCriteria::RegistrationNo.previous(), SearchCriteria::DateOfBirth);
        assert_eq!(SearchCriteria::Contact.label(), "Contact#");
    }

    #[test]
    fn display_values_blank_missing_columns() {
        let record = StudentRecord {
            registration_no: "S1".into(),
            name: "Ana".into(),
            email: None,
            contact: Some("0300".into()),
            date_of_birth: None,
            hostelite: Some(Hostelite::No),
        };
        assert_eq!(
            record.display_values(),
            ["S1", "Ana", "", "0300", "", "No"].map(String::from)
        );
    }
}
