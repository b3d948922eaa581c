//! Per-partition task descriptor
//!
//! Built once by the coordinator after planning and carried by value into
//! every partition. Partitions read the projection from here; they never
//! plan one of their own.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{LoaderError, LoaderResult};
use crate::schema::Schema;
use crate::sortkey::SortSpec;

/// Planning artifacts shared by all partitions of one load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// Loader identity
    pub consumer: String,
    /// Distribution signature of the load
    pub signature: String,
    /// Resolved table paths, in location order
    pub paths: Vec<PathBuf>,
    /// Effective projection string; `None` reads every column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection: Option<String>,
    pub sorted: bool,
    /// Logical schema of the input tables
    pub schema: Schema,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_spec: Option<SortSpec>,
}

impl TaskDescriptor {
    /// Returns the `(consumer, signature)` pair the artifacts are keyed by
    pub fn artifact_key(&self) -> (&str, &str) {
        (&self.consumer, &self.signature)
    }

    /// Returns the projection string handed to the storage reader
    pub fn projection_str(&self) -> &str {
        self.projection.as_deref().unwrap_or("")
    }

    pub fn to_json(&self) -> LoaderResult<String> {
        serde_json::to_string(self).map_err(|e| {
            LoaderError::configuration(format!("Cannot serialize task descriptor: {}", e))
        })
    }

    pub fn from_json(text: &str) -> LoaderResult<Self> {
        let descriptor: Self = serde_json::from_str(text).map_err(|e| {
            LoaderError::configuration(format!("Invalid task descriptor: {}", e))
        })?;
        if descriptor.paths.is_empty() {
            return Err(LoaderError::no_table_specified().with_details("task descriptor"));
        }
        if descriptor.sorted && descriptor.sort_spec.is_none() {
            return Err(LoaderError::configuration(
                "Sorted task descriptor carries no sort specification",
            ));
        }
        Ok(descriptor)
    }
}
