//! Execution environments
//!
//! [`JobEnv`] is the host's mutable job configuration. [`TaskEnv`] is the
//! immutable view a partition runs with, built by copying only allow-listed
//! keys, so keys written by an unrelated execution context sharing the same
//! job configuration (e.g. the other side of a join) never leak in.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{LoaderError, LoaderResult};

/// Input table paths, as a JSON array of strings
pub const INPUT_PATHS: &str = "tableload.input.paths";
/// Projection string handed to the storage engine's input format
pub const INPUT_PROJECTION: &str = "tableload.input.projection";
/// "true" when the input must be read as a sorted table
pub const INPUT_SORTED: &str = "tableload.input.sorted";
/// "true" when a non-directory location match is an error
pub const STRICT_DIRECTORIES: &str = "tableload.input.strict.dirs";
/// Minimum log severity name
pub const LOG_LEVEL: &str = "tableload.log.level";
/// Prefix of storage-engine tuning keys, all of which are task-visible
pub const ENGINE_PREFIX: &str = "tableload.engine.";

const TASK_KEYS: &[&str] = &[INPUT_PATHS, INPUT_SORTED, STRICT_DIRECTORIES, LOG_LEVEL];

/// Read access shared by job and task environments
pub trait ConfigView {
    /// Returns the raw value for `key`
    fn get(&self, key: &str) -> Option<&str>;

    /// Returns the input table paths, empty if unset
    fn input_paths(&self) -> LoaderResult<Vec<PathBuf>> {
        match self.get(INPUT_PATHS) {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str::<Vec<PathBuf>>(raw).map_err(|e| {
                LoaderError::configuration(format!("Invalid {} value: {}", INPUT_PATHS, e))
            }),
        }
    }

    /// Returns a boolean flag, false if unset
    fn flag(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}

/// Mutable job configuration owned by the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEnv {
    entries: BTreeMap<String, String>,
}

impl JobEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Removes `key`, returning its previous value
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Stores the input table paths
    pub fn set_input_paths(&mut self, paths: &[PathBuf]) -> LoaderResult<()> {
        let raw = serde_json::to_string(paths).map_err(|e| {
            LoaderError::configuration(format!("Cannot encode input paths: {}", e))
        })?;
        self.set(INPUT_PATHS, raw);
        Ok(())
    }

    /// Iterates entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl ConfigView for JobEnv {
    fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

/// Immutable task environment built by allow-list copy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEnv {
    entries: BTreeMap<String, String>,
}

impl TaskEnv {
    /// Copies the allow-listed keys of `job`
    pub fn from_job(job: &JobEnv) -> Self {
        let entries = job
            .iter()
            .filter(|(key, _)| Self::is_task_key(key))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self { entries }
    }

    /// Returns true if `key` is visible to partition tasks
    pub fn is_task_key(key: &str) -> bool {
        TASK_KEYS.contains(&key) || key.starts_with(ENGINE_PREFIX)
    }

    /// Returns a copy with `key` set to `value`; only task keys may be set.
    pub fn with(&self, key: &str, value: impl Into<String>) -> LoaderResult<Self> {
        if !Self::is_task_key(key) {
            return Err(LoaderError::configuration(format!(
                "'{}' is not a task environment key",
                key
            )));
        }
        let mut entries = self.entries.clone();
        entries.insert(key.to_string(), value.into());
        Ok(Self { entries })
    }

    /// Returns a copy with `paths` as the input paths
    pub fn with_input_paths(&self, paths: &[PathBuf]) -> LoaderResult<Self> {
        let raw = serde_json::to_string(paths).map_err(|e| {
            LoaderError::configuration(format!("Cannot encode input paths: {}", e))
        })?;
        self.with(INPUT_PATHS, raw)
    }
}

impl ConfigView for TaskEnv {
    fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_env_drops_projection_and_foreign_keys() {
        let mut job = JobEnv::new();
        job.set(INPUT_PROJECTION, "left_side_col");
        job.set(INPUT_SORTED, "true");
        job.set("mapreduce.job.name", "merge-join");
        job.set("tableload.engine.buffer.size", "65536");

        let task = TaskEnv::from_job(&job);
        assert_eq!(task.get(INPUT_PROJECTION), None);
        assert_eq!(task.get("mapreduce.job.name"), None);
        assert_eq!(task.get("tableload.engine.buffer.size"), Some("65536"));
        assert!(task.flag(INPUT_SORTED));
    }

    #[test]
    fn test_input_paths_round_trip() {
        let mut job = JobEnv::new();
        let paths = vec![PathBuf::from("/data/a,b"), PathBuf::from("/data/c")];
        job.set_input_paths(&paths).unwrap();
        assert_eq!(job.input_paths().unwrap(), paths);
        assert_eq!(TaskEnv::from_job(&job).input_paths().unwrap(), paths);
    }

    #[test]
    fn test_missing_paths_are_empty() {
        assert!(JobEnv::new().input_paths().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_paths_are_configuration_error() {
        let mut job = JobEnv::new();
        job.set(INPUT_PATHS, "not json");
        let err = job.input_paths().unwrap_err();
        assert_eq!(err.code(), crate::errors::LoaderErrorCode::ConfigurationError);
    }

    #[test]
    fn test_with_rejects_projection_key() {
        let task = TaskEnv::default();
        assert!(task.with(INPUT_PROJECTION, "a").is_err());
        assert!(task.with(INPUT_SORTED, "true").unwrap().flag(INPUT_SORTED));
    }

    #[test]
    fn test_with_input_paths_does_not_mutate_original() {
        let task = TaskEnv::default();
        let narrowed = task.with_input_paths(&[PathBuf::from("/t")]).unwrap();
        assert!(task.input_paths().unwrap().is_empty());
        assert_eq!(narrowed.input_paths().unwrap().len(), 1);
    }
}
