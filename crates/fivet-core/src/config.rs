//! Service configuration.
//!
//! Settings are layered: built-in defaults (in-memory store), then an optional
//! JSON or TOML file, then `FIVET_`-prefixed environment variables with `__`
//! between nested keys, e.g. `FIVET_DATABASE__KIND=file` and
//! `FIVET_DATABASE__PATH=/var/lib/fivet/clinic.db`.

use std::path::{Path, PathBuf};

use ::config::builder::DefaultState;
use ::config::{Config, ConfigBuilder, Environment, File, FileFormat, Map};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix of the environment variables read by [`ServiceConfig::from_env`].
pub const ENV_PREFIX: &str = "FIVET";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid config: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Where records are stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatabaseConfig {
    /// Volatile store, lost when the service closes.
    #[default]
    InMemory,
    /// SQLite file, created on first open.
    File { path: PathBuf },
}

/// Top-level configuration for [`crate::service::ClinicService`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl ServiceConfig {
    pub fn in_memory() -> Self {
        Self {
            database: DatabaseConfig::InMemory,
        }
    }

    pub fn file<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            database: DatabaseConfig::File { path: path.into() },
        }
    }

    /// Parse a JSON document such as
    /// `{"database": {"kind": "file", "path": "fivet.db"}}`.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let builder = defaults()?.add_source(File::from_str(json, FileFormat::Json));
        finish(builder)
    }

    /// Read a config file; the format follows the extension (`.json`, `.toml`).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let builder = defaults()?.add_source(File::from(path.as_ref()).required(true));
        finish(builder)
    }

    /// Defaults overridden by `FIVET_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Defaults, then `file` when given, then `FIVET_*` environment variables.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(file, None)
    }

    /// `vars` replaces the process environment when set.
    fn load_with(file: Option<&Path>, vars: Option<Map<String, String>>) -> Result<Self, ConfigError> {
        let mut builder = defaults()?;
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .source(vars),
        );
        finish(builder)
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(Config::builder().set_default("database.kind", "in_memory")?)
}

fn finish(builder: ConfigBuilder<DefaultState>) -> Result<ServiceConfig, ConfigError> {
    Ok(builder.build()?.try_deserialize()?)
}
