//! Configuration
//!
//! Layered configuration: built-in defaults, an optional TOML file, then
//! `NOTEFS_*` environment variables (e.g. `NOTEFS_SERVER__LISTEN`).

use crate::error::FsError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the sled database.
    #[serde(default = "default_data_dir")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address for the HTTP server.
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "notefs", "notefs")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("notefs-data"))
}

fn default_listen() -> String {
    "127.0.0.1:8040".to_string()
}

impl Config {
    /// Load configuration. With an explicit `path` the file must exist;
    /// otherwise `notefs.toml` in the working directory is used if
    /// present. Environment variables override file values.
    pub fn load(path: Option<&Path>) -> Result<Config, FsError> {
        let mut builder = config::Config::builder();
        builder = match path {
            Some(p) => builder.add_source(config::File::from(p)),
            None => builder.add_source(config::File::with_name("notefs").required(false)),
        };
        builder = builder.add_source(
            config::Environment::with_prefix("NOTEFS")
                .prefix_separator("_")
                .separator("__"),
        );
        builder
            .build()
            .and_then(|raw| raw.try_deserialize())
            .map_err(|e| FsError::Config(e.to_string()))
    }
}
