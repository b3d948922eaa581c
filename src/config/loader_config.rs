//! Loader configuration file
//!
//! JSON file, every field optional:
//!
//! ```json
//! { "strict_directories": false, "consumer": "tableload::TableLoader", "log_level": "info" }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::env::{JobEnv, LOG_LEVEL, STRICT_DIRECTORIES};
use crate::errors::{LoaderError, LoaderResult};
use crate::observability::Severity;

/// Consumer identity used when none is configured
pub const DEFAULT_CONSUMER: &str = "tableload::TableLoader";

/// Loader configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Fail instead of warn when a location matches a non-directory
    #[serde(default)]
    pub strict_directories: bool,

    /// Identity keying planning artifacts together with the distribution signature
    #[serde(default = "default_consumer")]
    pub consumer: String,

    /// Minimum log severity: trace, info, warn or error
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_consumer() -> String {
    DEFAULT_CONSUMER.to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            strict_directories: false,
            consumer: default_consumer(),
            log_level: default_log_level(),
        }
    }
}

impl LoaderConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> LoaderResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            LoaderError::configuration(format!(
                "Failed to read config '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: LoaderConfig = serde_json::from_str(&content)
            .map_err(|e| LoaderError::configuration(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> LoaderResult<()> {
        if self.consumer.trim().is_empty() {
            return Err(LoaderError::configuration("consumer must not be empty"));
        }
        self.severity()?;
        Ok(())
    }

    /// Returns the configured minimum log severity
    pub fn severity(&self) -> LoaderResult<Severity> {
        Severity::from_name(&self.log_level).ok_or_else(|| {
            LoaderError::configuration(format!(
                "Invalid log_level: '{}'. Expected trace, info, warn or error.",
                self.log_level
            ))
        })
    }

    /// Writes the task-visible settings into a job environment
    pub fn apply_to(&self, env: &mut JobEnv) {
        env.set(STRICT_DIRECTORIES, self.strict_directories.to_string());
        env.set(LOG_LEVEL, self.log_level.clone());
    }
}
