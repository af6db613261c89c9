//! Core library surface for the Student Records TUI application.
//!
//! The storage gateway and record query layer live in [`db`]; the binary wires
//! them to the settings store and the Ratatui front-end.
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod ui;

/// Persistence entry points used by `main.rs` and the UI.
pub use db::{ensure_schema, Confirmation, Gateway, SearchOutcome, StudentStore, UpdateOutcome};

pub use config::{AppPaths, DatabaseSettings, Settings};
pub use error::{ErrorKind, RecordError, StorageError};
pub use models::{Hostelite, SearchCriteria, StudentFields, StudentRecord};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
