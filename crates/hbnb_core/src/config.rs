//! Environment-driven process configuration.
//!
//! # Responsibility
//! - Select the storage backend once per process.
//! - Carry relational connection parameters and logging settings.
//!
//! # Invariants
//! - Destructive schema recreation is off unless `HBNB_ENV=test`.
//! - Relational mode requires a database name.

use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::path::PathBuf;

pub const ENV_STORAGE_TYPE: &str = "HBNB_TYPE_STORAGE";
pub const ENV_FILE_PATH: &str = "HBNB_FILE_PATH";
pub const ENV_DB_HOST: &str = "HBNB_MYSQL_HOST";
pub const ENV_DB_USER: &str = "HBNB_MYSQL_USER";
pub const ENV_DB_PASSWORD: &str = "HBNB_MYSQL_PWD";
pub const ENV_DB_NAME: &str = "HBNB_MYSQL_DB";
pub const ENV_RUNTIME: &str = "HBNB_ENV";
pub const ENV_LOG_LEVEL: &str = "HBNB_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "HBNB_LOG_DIR";

const DEFAULT_FILE_PATH: &str = "file.json";
const DEFAULT_LOG_DIR_NAME: &str = "hbnb-logs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    UnsupportedStorageType(String),
    MissingDatabase,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedStorageType(value) => write!(
                f,
                "unsupported {ENV_STORAGE_TYPE} `{value}`; expected file|db"
            ),
            Self::MissingDatabase => write!(f, "{ENV_DB_NAME} is required when {ENV_STORAGE_TYPE}=db"),
        }
    }
}

impl Error for ConfigError {}

/// Connection parameters for the relational backend.
///
/// The embedded engine only needs `database` (a file path or `:memory:`);
/// host and user are kept for diagnostics.
#[derive(Clone, PartialEq, Eq)]
pub struct RelationalConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Drop and recreate the schema when the first session is established.
    pub reset_schema: bool,
}

impl Debug for RelationalConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationalConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("reset_schema", &self.reset_schema)
            .finish()
    }
}

impl RelationalConfig {
    /// Non-destructive configuration for one database.
    pub fn for_database(database: impl Into<String>) -> Self {
        Self {
            host: String::new(),
            user: String::new(),
            password: String::new(),
            database: database.into(),
            reset_schema: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    File { path: PathBuf },
    Relational(RelationalConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub storage: StorageConfig,
    pub log_level: String,
    pub log_dir: PathBuf,
}

impl Config {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, treating blank values as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let storage = match read(ENV_STORAGE_TYPE).as_deref() {
            None | Some("file") => StorageConfig::File {
                path: PathBuf::from(read(ENV_FILE_PATH).unwrap_or_else(|| DEFAULT_FILE_PATH.into())),
            },
            Some("db") => StorageConfig::Relational(RelationalConfig {
                host: read(ENV_DB_HOST).unwrap_or_default(),
                user: read(ENV_DB_USER).unwrap_or_default(),
                password: lookup(ENV_DB_PASSWORD).unwrap_or_default(),
                database: read(ENV_DB_NAME).ok_or(ConfigError::MissingDatabase)?,
                reset_schema: read(ENV_RUNTIME).as_deref() == Some("test"),
            }),
            Some(other) => return Err(ConfigError::UnsupportedStorageType(other.to_string())),
        };

        Ok(Self {
            storage,
            log_level: read(ENV_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: read(ENV_LOG_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_LOG_DIR_NAME)),
        })
    }
}
