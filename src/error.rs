//! Error types shared by the storage gateway and the record query layer.
//!
//! The gateway only ever produces [`StorageError`]. The query layer wraps it in
//! [`RecordError`] next to its own validation and conflict failures so the UI
//! can pick a message per [`ErrorKind`].

use thiserror::Error;

/// Failure reported by the storage gateway.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Bootstrap never produced a usable connection, or it was closed.
    #[error("no database connection")]
    Disconnected,
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Failure reported by a record operation.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("{field} is required.")]
    MissingField { field: &'static str },
    #[error("Invalid date format '{input}'. Use YYYY-MM-DD.")]
    InvalidDate { input: String },
    #[error("Registration# {0} already exists!")]
    Duplicate(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Coarse classification used by callers that only care about the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Storage,
}

impl RecordError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RecordError::MissingField { .. } | RecordError::InvalidDate { .. } => {
                ErrorKind::Validation
            }
            RecordError::Duplicate(_) => ErrorKind::Conflict,
            RecordError::Storage(_) => ErrorKind::Storage,
        }
    }
}

pub type RecordResult<T> = Result<T, RecordError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_variants() {
        let missing = RecordError::MissingField { field: "Name" };
        assert_eq!(missing.kind(), ErrorKind::Validation);
        assert_eq!(missing.to_string(), "Name is required.");

        let dup = RecordError::Duplicate("S100".into());
        assert_eq!(dup.kind(), ErrorKind::Conflict);
        assert_eq!(dup.to_string(), "Registration# S100 already exists!");

        let storage = RecordError::from(StorageError::Disconnected);
        assert_eq!(storage.kind(), ErrorKind::Storage);
        assert_eq!(storage.to_string(), "no database connection");
    }
}
