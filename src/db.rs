//! Persistence split into the connection-owning gateway and the record
//! operations built on top of it.

mod connection;
mod students;

pub use connection::Gateway;
pub use students::{
    ensure_schema, Confirmation, SearchOutcome, StudentStore, UpdateOutcome,
};
