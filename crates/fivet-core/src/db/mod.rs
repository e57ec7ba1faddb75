//! Database layer for the clinic records core.

mod owners;
mod patients;
mod relations;
mod repository;
mod schema;
mod sqlite;
mod visits;

pub use relations::*;
pub use repository::*;
pub use schema::*;
pub use sqlite::*;

use rusqlite::{ffi, Connection, ErrorCode};
use std::path::Path;
use thiserror::Error;

use crate::config::DatabaseConfig;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Storage error: {0}")]
    Storage(#[source] rusqlite::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Record not found: {0}")]
    NotFound(String),
}

impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(err, msg)
                if err.code == ErrorCode::ConstraintViolation
                    && (err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                        || err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY) =>
            {
                DbError::DuplicateKey(msg.clone().unwrap_or_else(|| err.to_string()))
            }
            _ => DbError::Storage(e),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Open the database described by `config`.
    pub fn open_with(config: &DatabaseConfig) -> DbResult<Self> {
        match config {
            DatabaseConfig::InMemory => Self::open_in_memory(),
            DatabaseConfig::File { path } => Self::open(path),
        }
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transaction.
    ///
    /// Repositories borrowed from this database run inside it until it is
    /// committed or dropped.
    pub fn transaction(&self) -> DbResult<rusqlite::Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    /// Repository for one entity type.
    pub fn repository<T: Table>(&self) -> SqliteRepository<'_, T> {
        SqliteRepository::new(self)
    }

    /// Close the connection, reporting any failure to release it.
    pub fn close(self) -> DbResult<()> {
        self.conn.close().map_err(|(_, e)| e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();

        // Check that tables exist
        let tables: Vec<String> = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        for table in [
            "owners",
            "patients",
            "visits",
            "lab_tests",
            "patient_visits",
            "visit_lab_tests",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {}", table);
        }
    }

    #[test]
    fn test_unique_violation_maps_to_duplicate_key() {
        let db = Database::open_in_memory().unwrap();
        db.conn()
            .execute_batch("CREATE TABLE t (k TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();

        let err: DbError = db
            .conn()
            .execute("INSERT INTO t VALUES ('a')", [])
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::DuplicateKey(_)));

        let err: DbError = db
            .conn()
            .execute("INSERT INTO missing VALUES (1)", [])
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::Storage(_)));
    }

    #[test]
    fn test_close() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.close().is_ok());
    }
}
