//! Storage engine contract and the local table engine
//!
//! The loader talks to storage only through [`TableStorage`] and
//! [`TableRecordReader`]. [`LocalTableStorage`] implements them over table
//! directories on the local file system.
//!
//! # Table layout
//!
//! - `.schema`: schema text
//! - `.sortinfo`: sort column names, sorted tables only
//! - `records.dat`: checksummed row frames

mod checksum;
mod errors;
mod reader;
mod record;
mod table;
mod writer;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigView, JobEnv, INPUT_PROJECTION};
use crate::errors::LoaderResult;
use crate::projection::parse_selectors;
use crate::record::Record;
use crate::schema::Schema;
use crate::sortkey::{SeekKey, SortSpec};

pub use checksum::{compute_checksum, verify_checksum};
pub use errors::RecordFormatError;
pub use reader::TableFileReader;
pub use record::{decode_frame, encode_row, FRAME_OVERHEAD};
pub use table::{BasicTable, BasicTableReader, LocalTableStorage, ROWS_FILE, SCHEMA_FILE, SORT_INFO_FILE};
pub use writer::BasicTableWriter;

/// A unit of input assigned to one partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSplit {
    pub index: usize,
    pub paths: Vec<PathBuf>,
}

impl TableSplit {
    pub fn new(index: usize, paths: Vec<PathBuf>) -> Self {
        Self { index, paths }
    }
}

/// Storage engine operations used by the loader
pub trait TableStorage: Send + Sync {
    /// Returns the schema of the table at `path`
    fn get_schema(&self, path: &Path, env: &dyn ConfigView) -> LoaderResult<Schema>;

    /// Fails unless every input table is sorted on the same columns.
    ///
    /// When `hint` is given the tables must be sorted on exactly it.
    fn require_sorted_table(&self, env: &dyn ConfigView, hint: Option<&SortSpec>)
        -> LoaderResult<SortSpec>;

    /// Returns the common sort columns of the input tables, if any
    fn get_sort_info(&self, env: &dyn ConfigView) -> LoaderResult<Option<SortSpec>>;

    /// Enumerates the splits of the input tables
    fn splits(&self, env: &dyn ConfigView) -> LoaderResult<Vec<TableSplit>>;

    /// Opens a reader over all input tables bound to `projection`
    fn create_reader(&self, env: &dyn ConfigView, projection: &str)
        -> LoaderResult<Box<dyn TableRecordReader>>;

    /// Opens a reader over one split bound to `projection`
    fn create_split_reader(
        &self,
        env: &dyn ConfigView,
        split: &TableSplit,
        projection: &str,
    ) -> LoaderResult<Box<dyn TableRecordReader>>;
}

/// Pull-based reader produced by a [`TableStorage`]
pub trait TableRecordReader: Send {
    /// Schema of the records returned by `next_record`
    fn schema(&self) -> &Schema;

    /// Positions the reader at the first record whose key is >= `key`
    fn seek_to(&mut self, key: &SeekKey) -> LoaderResult<()>;

    /// Returns the next record, `None` at end of input
    fn next_record(&mut self) -> LoaderResult<Option<Record>>;

    /// Releases the underlying files
    fn close(&mut self) -> LoaderResult<()>;
}

/// Input format handed to the host: split enumeration plus reader creation
#[derive(Clone)]
pub struct TableInputFormat {
    storage: Arc<dyn TableStorage>,
}

impl TableInputFormat {
    pub fn new(storage: Arc<dyn TableStorage>) -> Self {
        Self { storage }
    }

    pub fn splits(&self, env: &dyn ConfigView) -> LoaderResult<Vec<TableSplit>> {
        self.storage.splits(env)
    }

    pub fn create_record_reader(
        &self,
        env: &dyn ConfigView,
        split: &TableSplit,
        projection: &str,
    ) -> LoaderResult<Box<dyn TableRecordReader>> {
        self.storage.create_split_reader(env, split, projection)
    }
}

/// Stores a projection in the job configuration after validating its syntax
pub fn set_projection(env: &mut JobEnv, projection: &str) -> LoaderResult<()> {
    parse_selectors(projection)?;
    env.set(INPUT_PROJECTION, projection);
    Ok(())
}

/// Returns the projection stored in `env`, if any
pub fn get_projection(env: &dyn ConfigView) -> Option<String> {
    env.get(INPUT_PROJECTION)
        .filter(|p| !p.trim().is_empty())
        .map(str::to_string)
}
