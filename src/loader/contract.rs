//! Host plugin contract
//!
//! The host framework drives a loader through two phases:
//!
//! - Planning, on the coordinator: `set_distribution_signature`,
//!   `set_location`, `get_schema`, `push_projection`, `describe_input_format`
//! - Execution, once per partition: `initialize` or `bind_reader`, then an
//!   optional `seek_near`, then `next` until end of stream, then `close`

use std::fmt;

use crate::config::JobEnv;
use crate::errors::LoaderResult;
use crate::projection::{RequiredField, RequiredFieldResponse};
use crate::record::Record;
use crate::schema::Schema;
use crate::storage::{TableInputFormat, TableRecordReader, TableSplit};

/// Optional loader capabilities the host may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadFeature {
    /// Column projection pushdown
    Projection,
}

impl fmt::Display for LoadFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadFeature::Projection => write!(f, "PROJECTION"),
        }
    }
}

/// Size estimates of an input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceStatistics {
    pub records: u64,
    pub bytes: u64,
}

/// Operations the host framework invokes on a loader
pub trait LoadFunc {
    /// Records the identifier shared by all instances of one load
    fn set_distribution_signature(&mut self, signature: &str);

    /// Resolves `location` and publishes the input settings into `job`
    fn set_location(&mut self, location: &str, job: &mut JobEnv) -> LoaderResult<()>;

    /// Returns the schema the host sees for `location`
    fn get_schema(&mut self, location: &str, job: &mut JobEnv) -> LoaderResult<Schema>;

    /// Plans the pruned projection from the fields the host needs
    fn push_projection(&mut self, required: &[RequiredField]) -> LoaderResult<RequiredFieldResponse>;

    fn declared_features(&self) -> Vec<LoadFeature> {
        vec![LoadFeature::Projection]
    }

    /// Returns the input format used to enumerate splits
    fn describe_input_format(&self) -> TableInputFormat;

    /// Always `None`: statistics are not available
    fn get_statistics(&self, _location: &str, _job: &JobEnv) -> LoaderResult<Option<ResourceStatistics>> {
        Ok(None)
    }

    /// Always `None`: partition keys are not available
    fn get_partition_keys(&self, _location: &str, _job: &JobEnv) -> LoaderResult<Option<Vec<String>>> {
        Ok(None)
    }

    /// Partition filters are ignored
    fn set_partition_filter(&mut self, _filter: &str) -> LoaderResult<()> {
        Ok(())
    }

    /// Opens the partition's own reader over all input tables
    fn initialize(&mut self, job: &JobEnv) -> LoaderResult<()>;

    /// Attaches a reader the host created for `split`
    fn bind_reader(&mut self, reader: Box<dyn TableRecordReader>, split: &TableSplit) -> LoaderResult<()>;

    /// Positions the partition at the first record whose key is >= that of `target`
    fn seek_near(&mut self, target: &Record) -> LoaderResult<()>;

    /// Returns the next record, `None` at end of stream
    fn next(&mut self) -> LoaderResult<Option<Record>>;

    /// Releases the partition's reader; safe in any state
    fn close(&mut self) -> LoaderResult<()>;
}
