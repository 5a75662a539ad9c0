//! Persistence engine and command console for the HBnB data model.
//! This crate is the single source of truth for storage invariants.

pub mod config;
pub mod console;
pub mod db;
pub mod logging;
pub mod model;
pub mod storage;

pub use config::{Config, ConfigError, RelationalConfig, StorageConfig};
pub use console::command::{Args, Command, Verb};
pub use console::error::ConsoleError;
pub use console::{Console, Flow, PROMPT};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::entity::{composite_key, Entity, EntityError};
pub use model::kind::{FieldType, Kind};
pub use model::value::AttrValue;
pub use storage::{
    open_storage, DbStorage, FileStorage, Registry, Storage, StoreError, StoreResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
