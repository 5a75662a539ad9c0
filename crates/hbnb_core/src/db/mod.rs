//! Relational backend bootstrap: connection setup and the HBnB schema.
//!
//! # Responsibility
//! - Open SQLite databases (file or `:memory:`) for `DbStorage`.
//! - Bring the seven HBnB tables up to the latest migration.
//! - Wipe and rebuild them for `HBNB_ENV=test` sessions.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - No entity rows are read or written before migrations succeed.
//! - Errors name the migration or table that failed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, IN_MEMORY_DATABASE};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// Connection, pragma or query failure outside a migration step.
    Sqlite(rusqlite::Error),
    /// A migration script (or its version bump) failed; nothing was applied.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
    /// Dropping a table during a test-mode reset failed; no table was dropped.
    SchemaReset {
        table: &'static str,
        source: rusqlite::Error,
    },
    /// The database was written by a newer binary.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Migration { version, source } => {
                write!(f, "schema migration {version} failed: {source}")
            }
            Self::SchemaReset { table, source } => {
                write!(f, "schema reset failed at table {table}: {source}")
            }
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Migration { source, .. } | Self::SchemaReset { source, .. } => Some(source),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

#[cfg(test)]
mod tests {
    use super::DbError;
    use std::error::Error;

    #[test]
    fn step_errors_name_what_failed_and_keep_the_cause() {
        let err = DbError::SchemaReset {
            table: "places",
            source: rusqlite::Error::InvalidQuery,
        };
        assert!(err.to_string().starts_with("schema reset failed at table places: "));
        assert!(err.source().is_some());

        let err = DbError::Migration {
            version: 1,
            source: rusqlite::Error::InvalidQuery,
        };
        assert!(err.to_string().starts_with("schema migration 1 failed: "));
        assert!(err.source().is_some());
    }
}
