//! Logging
//!
//! Structured logging via the `tracing` crate: configurable level, text
//! or JSON output, with an environment override through `NOTEFS_LOG`.

use crate::error::FsError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::EnvFilter;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Whether logging is enabled (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,

    /// Enable colored output (text format only)
    #[serde(default = "default_true")]
    pub color: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            level: default_log_level(),
            format: default_format(),
            color: default_true(),
        }
    }
}

/// Install the global subscriber. `NOTEFS_LOG` overrides the configured
/// level with a full `EnvFilter` directive string.
pub fn init(config: &LoggingConfig) -> Result<(), FsError> {
    if !config.enabled {
        return Ok(());
    }
    let filter = EnvFilter::try_from_env("NOTEFS_LOG")
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ChronoUtc::rfc_3339());
    let result = if config.format == "json" {
        builder.json().try_init()
    } else {
        builder.with_ansi(config.color).try_init()
    };
    result.map_err(|e| FsError::Config(format!("failed to initialize logging: {e}")))
}
