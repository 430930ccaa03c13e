//! Configuration for the validation worker

use invoice_validation::ValidationConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Actor mailbox capacity
    pub mailbox_capacity: usize,

    /// Log output format
    pub log_format: LogFormat,

    /// Engine configuration
    pub engine: ValidationConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            service_name: "validation-worker".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            mailbox_capacity: 64,
            log_format: LogFormat::Text,
            engine: ValidationConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: WorkerConfig = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    ///
    /// `VALIDATION_WORKER_CONFIG` names an optional TOML file; the remaining
    /// variables override whatever it set.
    pub fn from_env() -> crate::Result<Self> {
        let mut config = match std::env::var("VALIDATION_WORKER_CONFIG") {
            Ok(path) => Self::from_file(PathBuf::from(path))?,
            Err(_) => Self::default(),
        };

        if let Ok(capacity) = std::env::var("VALIDATION_WORKER_MAILBOX") {
            config.mailbox_capacity = capacity.parse().map_err(|e| {
                crate::Error::Config(format!("VALIDATION_WORKER_MAILBOX={}: {}", capacity, e))
            })?;
        }

        if let Ok(format) = std::env::var("VALIDATION_LOG_FORMAT") {
            config.log_format = match format.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Text,
            };
        }

        if config.mailbox_capacity == 0 {
            return Err(crate::Error::Config("mailbox capacity must be at least 1".to_string()));
        }

        config.engine.apply_env()?;
        Ok(config)
    }
}
