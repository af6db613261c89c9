use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags, OptionalExtension, Params, Row};
use tracing::{debug, error, info, warn};

use crate::error::StorageError;

/// Owner of the live SQLite connection. Every statement in the application
/// goes through one of the three primitives below, which log driver failures
/// and hand back a [`StorageError`] instead of panicking.
///
/// A gateway whose bootstrap failed keeps `conn` empty for the rest of the
/// process; there is no reconnect on demand.
pub struct Gateway {
    conn: Option<Connection>,
    location: String,
}

impl Gateway {
    /// Open the database at `path`, creating it (and its directory) first when
    /// it does not exist yet. Never fails: an unreachable database yields a
    /// disconnected gateway.
    pub fn connect(path: &Path) -> Self {
        let location = path.display().to_string();

        let conn = match open_existing(path) {
            Ok(conn) => {
                info!(%location, "connected to database");
                Some(conn)
            }
            Err(err) => {
                warn!(%location, error = %err, "database not reachable, attempting to create it");
                match create_database(path).and_then(|()| {
                    open_existing(path).context("failed to reconnect after creating database")
                }) {
                    Ok(conn) => {
                        info!(%location, "created database and connected");
                        Some(conn)
                    }
                    Err(err) => {
                        error!(%location, error = ?err, "database creation failed");
                        None
                    }
                }
            }
        };

        Self { conn, location }
    }

    /// Private in-memory database, mostly useful for tests.
    pub fn open_in_memory() -> Self {
        let conn = match Connection::open_in_memory() {
            Ok(conn) => Some(conn),
            Err(err) => {
                error!(error = %err, "failed to open in-memory database");
                None
            }
        };
        Self {
            conn,
            location: ":memory:".to_string(),
        }
    }

    /// A gateway that never had a connection.
    pub fn disconnected(location: impl Into<String>) -> Self {
        Self {
            conn: None,
            location: location.into(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Run a mutating statement and return the number of affected rows.
    /// SQLite runs in autocommit mode, so a successful call is committed.
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<usize, StorageError> {
        let conn = self.connection(sql)?;
        let affected = conn
            .execute(sql, params)
            .map_err(|err| statement_failed(sql, err))?;
        debug!(statement = %summarize(sql), affected, "executed statement");
        Ok(affected)
    }

    /// Run a read statement and map every resulting row.
    pub fn fetch_all<T, P, F>(&self, sql: &str, params: P, map: F) -> Result<Vec<T>, StorageError>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.connection(sql)?;
        query_all(conn, sql, params, map).map_err(|err| statement_failed(sql, err))
    }

    /// Run a read statement and map only the first row, if any.
    pub fn fetch_one<T, P, F>(&self, sql: &str, params: P, map: F) -> Result<Option<T>, StorageError>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.connection(sql)?;
        conn.query_row(sql, params, map)
            .optional()
            .map_err(|err| statement_failed(sql, err))
    }

    /// Release the connection. Calling this on a disconnected or already
    /// closed gateway is a no-op.
    pub fn close(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        match conn.close() {
            Ok(()) => info!(location = %self.location, "connection closed"),
            Err((_conn, err)) => {
                error!(location = %self.location, error = %err, "failed to close connection cleanly")
            }
        }
    }

    fn connection(&self, sql: &str) -> Result<&Connection, StorageError> {
        self.conn.as_ref().ok_or_else(|| {
            warn!(statement = %summarize(sql), "statement skipped, no database connection");
            StorageError::Disconnected
        })
    }
}

/// Open an existing database file without permission to create one, so a
/// missing file surfaces as an error the bootstrap can react to.
fn open_existing(path: &Path) -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    Connection::open_with_flags(path, flags)
        .with_context(|| format!("failed to open database at {}", path.display()))
}

/// Create the database file and its parent directory, then close the handle.
fn create_database(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context("failed to create database directory")?;
        }
    }
    let conn = Connection::open(path).context("failed to create database file")?;
    conn.close()
        .map_err(|(_, err)| err)
        .context("failed to close bootstrap connection")
}

fn query_all<T, P, F>(conn: &Connection, sql: &str, params: P, map: F) -> rusqlite::Result<Vec<T>>
where
    P: Params,
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, map)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn statement_failed(sql: &str, err: rusqlite::Error) -> StorageError {
    error!(statement = %summarize(sql), error = %err, "statement failed");
    StorageError::Sqlite(err)
}

/// Collapse a multi-line statement into a single log-friendly line.
fn summarize(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_and_fetch_round_trip() {
        let gateway = Gateway::open_in_memory();
        assert!(gateway.is_connected());
        gateway
            .execute("CREATE TABLE t (k TEXT PRIMARY KEY, v INTEGER)", [])
            .unwrap();
        let affected = gateway
            .execute("INSERT INTO t (k, v) VALUES (?1, ?2)", ("a", 1))
            .unwrap();
        assert_eq!(affected, 1);
        gateway
            .execute("INSERT INTO t (k, v) VALUES (?1, ?2)", ("b", 2))
            .unwrap();

        let all: Vec<(String, i64)> = gateway
            .fetch_all("SELECT k, v FROM t ORDER BY k", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(all, vec![("a".to_string(), 1), ("b".to_string(), 2)]);

        let one: Option<i64> = gateway
            .fetch_one("SELECT v FROM t WHERE k = ?1", ["b"], |row| row.get(0))
            .unwrap();
        assert_eq!(one, Some(2));

        let none: Option<i64> = gateway
            .fetch_one("SELECT v FROM t WHERE k = ?1", ["zzz"], |row| row.get(0))
            .unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn malformed_statement_is_reported_not_raised() {
        let gateway = Gateway::open_in_memory();
        let err = gateway.execute("INSERT INTO missing VALUES (1)", []).unwrap_err();
        assert!(matches!(err, StorageError::Sqlite(_)));
        let err = gateway
            .fetch_all("SELEC nonsense", [], |row| row.get::<_, i64>(0))
            .unwrap_err();
        assert!(matches!(err, StorageError::Sqlite(_)));
    }

    #[test]
    fn disconnected_gateway_fails_every_call() {
        let mut gateway = Gateway::disconnected("nowhere");
        assert!(!gateway.is_connected());
        assert!(matches!(
            gateway.execute("SELECT 1", []),
            Err(StorageError::Disconnected)
        ));
        assert!(matches!(
            gateway.fetch_all("SELECT 1", [], |row| row.get::<_, i64>(0)),
            Err(StorageError::Disconnected)
        ));
        assert!(matches!(
            gateway.fetch_one("SELECT 1", [], |row| row.get::<_, i64>(0)),
            Err(StorageError::Disconnected)
        ));
        gateway.close();
        gateway.close();
    }

    #[test]
    fn close_is_idempotent_and_disconnects() {
        let mut gateway = Gateway::open_in_memory();
        gateway.close();
        assert!(!gateway.is_connected());
        gateway.close();
        assert!(matches!(
            gateway.execute("SELECT 1", []),
            Err(StorageError::Disconnected)
        ));
    }

    #[test]
    fn summarize_flattens_whitespace() {
        assert_eq!(summarize("SELECT a,\n    b\n  FROM t"), "SELECT a, b FROM t");
    }
}
