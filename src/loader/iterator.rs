//! Per-partition record iterator
//!
//! ```text
//! Created --initialize/bind_reader--> Initialized --seek_near--> Seeked
//!    Initialized | Seeked --next--> Iterating --next (end)--> Exhausted
//!    any state --close--> Closed
//! ```
//!
//! Out-of-order calls fail with `StateError`.

use std::fmt;
use std::sync::Arc;

use super::descriptor::TaskDescriptor;
use crate::config::{JobEnv, TaskEnv, INPUT_SORTED};
use crate::errors::{LoaderError, LoaderResult};
use crate::observability::{log_event_with_fields, Event, Logger};
use crate::record::{Record, Value};
use crate::sortkey::{KeyGenerator, SeekKey, SortSpec};
use crate::storage::{TableRecordReader, TableSplit, TableStorage};

/// Lifecycle state of a [`RecordIterator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IteratorState {
    Created,
    Initialized,
    Seeked,
    Iterating,
    Exhausted,
    Closed,
}

impl fmt::Display for IteratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Cursor over the records of one partition
pub struct RecordIterator {
    descriptor: TaskDescriptor,
    storage: Arc<dyn TableStorage>,
    state: IteratorState,
    env: Option<TaskEnv>,
    reader: Option<Box<dyn TableRecordReader>>,
    sort_spec: Option<SortSpec>,
    tuple_keys: Option<KeyGenerator>,
    records: u64,
}

impl RecordIterator {
    pub fn new(descriptor: TaskDescriptor, storage: Arc<dyn TableStorage>) -> Self {
        Self {
            descriptor,
            storage,
            state: IteratorState::Created,
            env: None,
            reader: None,
            sort_spec: None,
            tuple_keys: None,
            records: 0,
        }
    }

    pub fn state(&self) -> IteratorState {
        self.state
    }

    pub fn descriptor(&self) -> &TaskDescriptor {
        &self.descriptor
    }

    /// Returns the task environment built by `initialize`
    pub fn task_env(&self) -> Option<&TaskEnv> {
        self.env.as_ref()
    }

    /// Returns the number of records returned so far
    pub fn records_read(&self) -> u64 {
        self.records
    }

    fn require(&self, operation: &str, allowed: &[IteratorState]) -> LoaderResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(LoaderError::state(operation, self.state))
        }
    }

    /// Builds the task environment from the allow-listed keys of `job` plus
    /// the descriptor's paths and sortedness.
    fn task_env_from(&self, job: &JobEnv) -> LoaderResult<TaskEnv> {
        let env = TaskEnv::from_job(job).with_input_paths(&self.descriptor.paths)?;
        if self.descriptor.sorted {
            env.with(INPUT_SORTED, "true")
        } else {
            Ok(env)
        }
    }

    /// Opens a reader over every input table of the descriptor.
    ///
    /// For sorted loads the tables must carry the descriptor's sort columns.
    pub fn initialize(&mut self, job: &JobEnv) -> LoaderResult<()> {
        self.require("initialize", &[IteratorState::Created])?;

        let env = self.task_env_from(job)?;
        if self.descriptor.sorted {
            let spec = self
                .storage
                .require_sorted_table(&env, self.descriptor.sort_spec.as_ref())?;
            self.prepare_keys(spec)?;
        }

        let reader = self
            .storage
            .create_reader(&env, self.descriptor.projection_str())?;

        let tables = self.descriptor.paths.len().to_string();
        log_event_with_fields(
            Event::ReaderInitialized,
            &[
                ("projection", self.descriptor.projection_str()),
                ("signature", self.descriptor.signature.as_str()),
                ("sorted", if self.descriptor.sorted { "true" } else { "false" }),
                ("tables", tables.as_str()),
            ],
        );

        self.env = Some(env);
        self.reader = Some(reader);
        self.state = IteratorState::Initialized;
        Ok(())
    }

    /// Attaches a reader the host opened for `split`
    pub fn bind_reader(&mut self, reader: Box<dyn TableRecordReader>, split: &TableSplit) -> LoaderResult<()> {
        self.require("bind_reader", &[IteratorState::Created])?;

        if let Some(spec) = self.descriptor.sort_spec.clone().filter(|_| self.descriptor.sorted) {
            self.prepare_keys(spec)?;
        }

        let index = split.index.to_string();
        log_event_with_fields(
            Event::ReaderBound,
            &[
                ("signature", self.descriptor.signature.as_str()),
                ("split", index.as_str()),
            ],
        );

        self.reader = Some(reader);
        self.state = IteratorState::Initialized;
        Ok(())
    }

    fn prepare_keys(&mut self, spec: SortSpec) -> LoaderResult<()> {
        self.tuple_keys = Some(KeyGenerator::for_key_tuple(&spec)?);
        self.sort_spec = Some(spec);
        Ok(())
    }

    /// Positions the reader at the first record whose key is >= the key of
    /// `target`, a record laid out by the projection schema.
    pub fn seek_near(&mut self, target: &Record) -> LoaderResult<()> {
        self.require("seek_near", &[IteratorState::Initialized])?;
        let (spec, reader) = self.seekable()?;
        let keys = KeyGenerator::compile(spec, reader.schema())?;
        let key = keys.generate_key(target)?;
        self.seek_to(key)
    }

    /// Like [`seek_near`](Self::seek_near) with a bare key tuple whose i-th
    /// value is the i-th sort column.
    pub fn seek_near_key(&mut self, values: &[Value]) -> LoaderResult<()> {
        self.require("seek_near", &[IteratorState::Initialized])?;
        self.seekable()?;
        let key = match &self.tuple_keys {
            Some(keys) => keys.key_for_values(values)?,
            None => return Err(not_sorted()),
        };
        self.seek_to(key)
    }

    fn seekable(&self) -> LoaderResult<(&SortSpec, &dyn TableRecordReader)> {
        let spec = self.sort_spec.as_ref().ok_or_else(not_sorted)?;
        let reader = self
            .reader
            .as_deref()
            .ok_or_else(|| LoaderError::state("seek_near", self.state))?;
        Ok((spec, reader))
    }

    fn seek_to(&mut self, key: SeekKey) -> LoaderResult<()> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| LoaderError::state("seek_near", IteratorState::Initialized))?;
        reader.seek_to(&key)?;

        let width = key.as_bytes().len().to_string();
        log_event_with_fields(
            Event::SeekComplete,
            &[
                ("key_bytes", width.as_str()),
                ("signature", self.descriptor.signature.as_str()),
            ],
        );
        self.state = IteratorState::Seeked;
        Ok(())
    }

    /// Returns the next record, `None` once the partition is exhausted
    pub fn next(&mut self) -> LoaderResult<Option<Record>> {
        match self.state {
            IteratorState::Initialized | IteratorState::Seeked | IteratorState::Iterating => {}
            IteratorState::Exhausted => return Ok(None),
            IteratorState::Created | IteratorState::Closed => {
                return Err(LoaderError::state("next", self.state))
            }
        }

        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| LoaderError::state("next", IteratorState::Created))?;

        match reader.next_record()? {
            Some(record) => {
                self.records += 1;
                self.state = IteratorState::Iterating;
                Ok(Some(record))
            }
            None => {
                let count = self.records.to_string();
                log_event_with_fields(
                    Event::PartitionExhausted,
                    &[
                        ("records", count.as_str()),
                        ("signature", self.descriptor.signature.as_str()),
                    ],
                );
                self.state = IteratorState::Exhausted;
                Ok(None)
            }
        }
    }

    /// Releases the reader. Safe to call in any state, any number of times.
    pub fn close(&mut self) -> LoaderResult<()> {
        if self.state == IteratorState::Closed {
            return Ok(());
        }
        self.state = IteratorState::Closed;

        if let Some(mut reader) = self.reader.take() {
            if let Err(e) = reader.close() {
                let message = e.to_string();
                Logger::warn("READER_CLOSE_FAILED", &[("error", message.as_str())]);
            }
        }
        log_event_with_fields(
            Event::ReaderClosed,
            &[("signature", self.descriptor.signature.as_str())],
        );
        Ok(())
    }
}

fn not_sorted() -> LoaderError {
    LoaderError::configuration("Seek requires a sorted table load")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LoaderErrorCode;
    use crate::config::ConfigView;
    use crate::schema::Schema;
    use crate::storage::{BasicTableWriter, LocalTableStorage};
    use std::path::Path;
    use tempfile::TempDir;

    fn write_sorted(dir: &Path, ids: &[i32]) {
        let schema: Schema = "id:int, name:string".parse().unwrap();
        let mut writer = BasicTableWriter::create(dir, &schema, &["id"]).unwrap();
        for id in ids {
            writer
                .append(&Record::new(vec![Value::Int(*id), Value::String(format!("n{}", id))]))
                .unwrap();
        }
        writer.finish().unwrap();
    }

    fn descriptor(dir: &Path, sorted: bool, projection: Option<&str>) -> TaskDescriptor {
        let schema: Schema = "id:int, name:string".parse().unwrap();
        TaskDescriptor {
            consumer: "test".into(),
            signature: "sig".into(),
            paths: vec![dir.to_path_buf()],
            projection: projection.map(str::to_string),
            sorted,
            sort_spec: Some(SortSpec::from_names(&["id"], &schema).unwrap()),
            schema,
        }
    }

    fn iterator(dir: &Path, sorted: bool, projection: Option<&str>) -> RecordIterator {
        RecordIterator::new(descriptor(dir, sorted, projection), Arc::new(LocalTableStorage::new()))
    }

    #[test]
    fn test_lifecycle() {
        let dir = TempDir::new().unwrap();
        write_sorted(dir.path(), &[1, 2]);
        let mut it = iterator(dir.path(), false, None);
        assert_eq!(it.state(), IteratorState::Created);

        it.initialize(&JobEnv::new()).unwrap();
        assert_eq!(it.state(), IteratorState::Initialized);
        assert!(it.next().unwrap().is_some());
        assert_eq!(it.state(), IteratorState::Iterating);
        assert!(it.next().unwrap().is_some());
        assert!(it.next().unwrap().is_none());
        assert_eq!(it.state(), IteratorState::Exhausted);
        assert!(it.next().unwrap().is_none());
        assert_eq!(it.records_read(), 2);
    }

    #[test]
    fn test_next_before_initialize_is_state_error() {
        let dir = TempDir::new().unwrap();
        let mut it = iterator(dir.path(), false, None);
        assert_eq!(it.next().unwrap_err().code(), LoaderErrorCode::StateError);
    }

    #[test]
    fn test_seek_after_iteration_is_state_error() {
        let dir = TempDir::new().unwrap();
        write_sorted(dir.path(), &[1, 2, 3]);
        let mut it = iterator(dir.path(), true, None);
        it.initialize(&JobEnv::new()).unwrap();
        it.next().unwrap();

        let target = Record::new(vec![Value::Int(2), Value::Null]);
        assert_eq!(it.seek_near(&target).unwrap_err().code(), LoaderErrorCode::StateError);
    }

    #[test]
    fn test_seek_on_unsorted_load_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        write_sorted(dir.path(), &[1]);
        let mut it = iterator(dir.path(), false, None);
        it.initialize(&JobEnv::new()).unwrap();
        let err = it.seek_near_key(&[Value::Int(1)]).unwrap_err();
        assert_eq!(err.code(), LoaderErrorCode::ConfigurationError);
    }

    #[test]
    fn test_seek_with_projected_record() {
        let dir = TempDir::new().unwrap();
        write_sorted(dir.path(), &[1, 3, 5, 7]);
        let mut it = iterator(dir.path(), true, Some("name , id"));
        it.initialize(&JobEnv::new()).unwrap();

        it.seek_near(&Record::new(vec![Value::Null, Value::Int(4)])).unwrap();
        assert_eq!(it.state(), IteratorState::Seeked);
        let first = it.next().unwrap().unwrap();
        assert_eq!(first.get(1), Some(&Value::Int(5)));
    }

    #[test]
    fn test_initialize_ignores_foreign_projection_key() {
        let dir = TempDir::new().unwrap();
        write_sorted(dir.path(), &[1]);
        let mut job = JobEnv::new();
        job.set(crate::config::INPUT_PROJECTION, "other_side_column");

        let mut it = iterator(dir.path(), false, Some("name"));
        it.initialize(&job).unwrap();
        assert_eq!(it.task_env().unwrap().get(crate::config::INPUT_PROJECTION), None);
        assert_eq!(it.next().unwrap().unwrap(), Record::new(vec![Value::String("n1".into())]));
    }

    #[test]
    fn test_close_twice_from_any_state() {
        let dir = TempDir::new().unwrap();
        let mut it = iterator(dir.path(), false, None);
        it.close().unwrap();
        it.close().unwrap();
        assert_eq!(it.state(), IteratorState::Closed);
        assert_eq!(it.next().unwrap_err().code(), LoaderErrorCode::StateError);
    }

    #[test]
    fn test_initialize_twice_is_state_error() {
        let dir = TempDir::new().unwrap();
        write_sorted(dir.path(), &[]);
        let mut it = iterator(dir.path(), false, None);
        it.initialize(&JobEnv::new()).unwrap();
        assert_eq!(
            it.initialize(&JobEnv::new()).unwrap_err().code(),
            LoaderErrorCode::StateError
        );
    }
}
