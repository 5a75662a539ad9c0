//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Apply pending migrations atomically.
//! - Drop and recreate every schema object when explicitly asked to.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - `reset_schema` is destructive and is never called implicitly.

use crate::db::{DbError, DbResult};
use log::warn;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("0001_init.sql"),
}];

/// Tables in drop order (dependents before the tables they reference).
const DROP_ORDER: &[&str] = &[
    "place_amenity",
    "reviews",
    "places",
    "cities",
    "amenities",
    "users",
    "states",
];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies all pending migrations on the provided connection.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        let step = tx.execute_batch(migration.sql).and_then(|()| {
            tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))
        });
        if let Err(source) = step {
            warn!(
                "event=db_migrate module=db status=error version={} error={}",
                migration.version, source
            );
            return Err(DbError::Migration {
                version: migration.version,
                source,
            });
        }
    }
    tx.commit()?;

    Ok(())
}

/// Drops every schema object and re-applies all migrations.
///
/// All stored rows are lost.
pub fn reset_schema(conn: &mut Connection) -> DbResult<()> {
    warn!("event=schema_reset module=db status=start tables={}", DROP_ORDER.len());

    let tx = conn.transaction()?;
    for &table in DROP_ORDER {
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {table};"))
            .map_err(|source| {
                warn!("event=schema_reset module=db status=error table={table} error={source}");
                DbError::SchemaReset { table, source }
            })?;
    }
    tx.execute_batch("PRAGMA user_version = 0;")?;
    tx.commit()?;

    apply_migrations(conn)
}

fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
