//! Loader configuration
//!
//! - `JobEnv`: the host's mutable key/value job configuration
//! - `TaskEnv`: immutable allow-listed copy seen by partition tasks
//! - `LoaderConfig`: optional JSON configuration file

mod env;
mod loader_config;

pub use env::{
    ConfigView, JobEnv, TaskEnv, ENGINE_PREFIX, INPUT_PATHS, INPUT_PROJECTION, INPUT_SORTED,
    LOG_LEVEL, STRICT_DIRECTORIES,
};
pub use loader_config::{LoaderConfig, DEFAULT_CONSUMER};
