//! Storage contract shared by the file and relational backends.
//!
//! # Responsibility
//! - Define the uniform call surface (`all/get/new/save/delete/reload/
//!   count/close`) both backends implement.
//! - Select exactly one backend per process from configuration.
//!
//! # Invariants
//! - The registry is owned by the backend; callers only see clones.
//! - `new` and `delete` never become durable before `save`.
//! - `count(kind)` always equals `all(kind).len()`.
//! - `close` is idempotent and safe on a never-opened backend.

use crate::config::{Config, StorageConfig};
use crate::db::DbError;
use crate::model::entity::{Entity, EntityError};
use crate::model::kind::Kind;
use log::{error, info};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod cascade;
pub mod db_storage;
pub mod file_storage;
pub mod relations;

pub use db_storage::DbStorage;
pub use file_storage::FileStorage;

/// Composite key (`"<Kind>.<id>"`) to entity mapping.
pub type Registry = BTreeMap<String, Entity>;

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage-layer error for persistence, reload and query operations.
#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Db(DbError),
    Entity(EntityError),
    /// Persisted data is internally inconsistent.
    InvalidData(String),
    /// The backend has no representation for this kind.
    UnsupportedKind(Kind),
    /// The backend was closed and has not been re-established.
    Closed,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Entity(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UnsupportedKind(kind) => write!(f, "kind {kind} is not supported by this storage"),
            Self::Closed => write!(f, "storage is closed"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Entity(err) => Some(err),
            Self::InvalidData(_) | Self::UnsupportedKind(_) | Self::Closed => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<EntityError> for StoreError {
    fn from(value: EntityError) -> Self {
        Self::Entity(value)
    }
}

/// Uniform storage interface implemented by every backend.
pub trait Storage {
    /// Short backend name used in diagnostics (`file` / `db`).
    fn backend_name(&self) -> &'static str;

    /// Whether this backend can hold entities of `kind`.
    fn supports(&self, kind: Kind) -> bool;

    /// Every registered entity, optionally filtered to one kind.
    fn all(&self, kind: Option<Kind>) -> StoreResult<Registry>;

    /// Exact lookup by kind and id.
    fn get(&self, kind: Kind, id: &str) -> StoreResult<Option<Entity>>;

    /// Registers `entity` under its key, replacing any previous entry.
    fn new(&mut self, entity: Entity) -> StoreResult<()>;

    /// Makes every staged change durable.
    fn save(&mut self) -> StoreResult<()>;

    /// Removes `entity` and its dependents; durable after the next `save`.
    fn delete(&mut self, entity: &Entity) -> StoreResult<()>;

    /// Replaces in-memory state with durable state. No-op when nothing is stored.
    fn reload(&mut self) -> StoreResult<()>;

    fn count(&self, kind: Option<Kind>) -> StoreResult<usize>;

    /// Releases backend resources. Idempotent.
    fn close(&mut self) -> StoreResult<()>;
}

/// Opens and loads the backend selected by `config`.
///
/// # Errors
/// Any failure here leaves no usable store; callers must stop.
pub fn open_storage(config: &Config) -> StoreResult<Box<dyn Storage>> {
    let mut storage: Box<dyn Storage> = match &config.storage {
        StorageConfig::File { path } => Box::new(FileStorage::open(path.clone())),
        StorageConfig::Relational(relational) => Box::new(DbStorage::open(relational.clone())?),
    };

    match storage.reload() {
        Ok(()) => {
            info!(
                "event=storage_open module=storage status=ok backend={} objects={}",
                storage.backend_name(),
                storage.count(None)?
            );
            Ok(storage)
        }
        Err(err) => {
            error!(
                "event=storage_open module=storage status=error backend={} error={}",
                storage.backend_name(),
                err
            );
            Err(err)
        }
    }
}
