//! The table loader
//!
//! One `TableLoader` value plays both roles of the host contract. On the
//! coordinator it resolves the location, the logical schema and the pruned
//! projection, then issues a [`TaskDescriptor`]. On a partition it is rebuilt
//! from that descriptor and drives a [`RecordIterator`].

use std::path::PathBuf;
use std::sync::Arc;

use super::contract::LoadFunc;
use super::descriptor::TaskDescriptor;
use super::iterator::RecordIterator;
use crate::config::{JobEnv, LoaderConfig, DEFAULT_CONSUMER, INPUT_SORTED};
use crate::errors::{LoaderError, LoaderResult};
use crate::location::LocationResolver;
use crate::observability::{log_event_with_fields, Event};
use crate::projection::{ProjectionPlanner, RequiredField, RequiredFieldResponse};
use crate::record::{Record, Value};
use crate::schema::{resolve_schema, Schema};
use crate::sortkey::SortSpec;
use crate::storage::{
    set_projection, LocalTableStorage, TableInputFormat, TableRecordReader, TableSplit, TableStorage,
};

/// The only accepted second constructor argument
const SORTED_ARGUMENT: &str = "sorted";

pub struct TableLoader {
    storage: Arc<dyn TableStorage>,
    consumer: String,
    strict_directories: bool,
    sorted: bool,
    signature: Option<String>,
    location: Option<String>,
    paths: Vec<PathBuf>,
    schema: Option<Schema>,
    sort_spec: Option<SortSpec>,
    planner: ProjectionPlanner,
    iterator: Option<RecordIterator>,
}

impl Default for TableLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TableLoader {
    /// Loader reading every column of local tables
    pub fn new() -> Self {
        Self {
            storage: Arc::new(LocalTableStorage::new()),
            consumer: DEFAULT_CONSUMER.to_string(),
            strict_directories: false,
            sorted: false,
            signature: None,
            location: None,
            paths: Vec::new(),
            schema: None,
            sort_spec: None,
            planner: ProjectionPlanner::new(None),
            iterator: None,
        }
    }

    /// Loader with an explicit projection; an empty string selects every column
    pub fn with_projection(projection: &str) -> Self {
        Self {
            planner: ProjectionPlanner::new(Some(projection)),
            ..Self::new()
        }
    }

    /// Loader with an explicit projection that reads the input as sorted tables.
    ///
    /// `sorted` must be the word `sorted`, in any case.
    pub fn with_arguments(projection: &str, sorted: &str) -> LoaderResult<Self> {
        if !sorted.trim().eq_ignore_ascii_case(SORTED_ARGUMENT) {
            return Err(LoaderError::configuration(format!(
                "Invalid argument to the table loader constructor: {}",
                sorted
            )));
        }
        Ok(Self {
            sorted: true,
            ..Self::with_projection(projection)
        })
    }

    /// Builds a loader from positional constructor arguments
    pub fn from_arguments<S: AsRef<str>>(args: &[S]) -> LoaderResult<Self> {
        match args {
            [] => Ok(Self::new()),
            [projection] => Ok(Self::with_projection(projection.as_ref())),
            [projection, sorted] => Self::with_arguments(projection.as_ref(), sorted.as_ref()),
            _ => Err(LoaderError::configuration(format!(
                "Invalid argument to the table loader constructor: expected at most 2 arguments, got {}",
                args.len()
            ))),
        }
    }

    /// Rebuilds a partition-side loader from a coordinator's descriptor
    pub fn from_descriptor(descriptor: TaskDescriptor, storage: Arc<dyn TableStorage>) -> Self {
        Self {
            consumer: descriptor.consumer.clone(),
            sorted: descriptor.sorted,
            signature: Some(descriptor.signature.clone()),
            paths: descriptor.paths.clone(),
            schema: Some(descriptor.schema.clone()),
            sort_spec: descriptor.sort_spec.clone(),
            planner: ProjectionPlanner::from_artifacts(None, descriptor.projection.as_deref()),
            iterator: Some(RecordIterator::new(descriptor, Arc::clone(&storage))),
            storage,
            strict_directories: false,
            location: None,
        }
    }

    /// Replaces the storage engine
    pub fn with_storage(mut self, storage: Arc<dyn TableStorage>) -> Self {
        self.storage = storage;
        self
    }

    /// Applies consumer identity and location strictness from a config file
    pub fn with_config(mut self, config: &LoaderConfig) -> Self {
        self.consumer = config.consumer.clone();
        self.strict_directories = config.strict_directories;
        self
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn planner(&self) -> &ProjectionPlanner {
        &self.planner
    }

    /// Returns the projection string in force, `None` for every column
    pub fn projection(&self) -> Option<&str> {
        self.planner.effective_projection().as_text()
    }

    /// Returns the logical schema, once resolved
    pub fn logical_schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    fn resolve_location(&mut self, location: &str, job: &JobEnv) -> LoaderResult<()> {
        if self.planner.is_sealed() && !self.paths.is_empty() {
            return Ok(());
        }
        if self.location.as_deref() == Some(location) && !self.paths.is_empty() {
            return Ok(());
        }
        let paths = LocationResolver::local()
            .strict(self.strict_directories)
            .resolve(location, job)?;
        self.location = Some(location.to_string());
        self.paths = paths;
        self.schema = None;
        self.sort_spec = None;
        Ok(())
    }

    fn resolve_logical_schema(&mut self, job: &JobEnv) -> LoaderResult<Schema> {
        if let Some(schema) = &self.schema {
            return Ok(schema.clone());
        }
        let schema = resolve_schema(self.storage.as_ref(), &self.paths, job)?;
        self.schema = Some(schema.clone());
        Ok(schema)
    }

    fn publish(&self, job: &mut JobEnv) -> LoaderResult<()> {
        job.set_input_paths(&self.paths)?;
        if self.sorted {
            job.set(INPUT_SORTED, "true");
        }
        if let Some(projection) = self.projection() {
            set_projection(job, projection)?;
        }
        Ok(())
    }

    /// Seals the planner and returns the artifacts every partition runs with
    pub fn task_descriptor(&mut self, job: &JobEnv) -> LoaderResult<TaskDescriptor> {
        let signature = self
            .signature
            .clone()
            .ok_or_else(|| LoaderError::state("task_descriptor", "Unsigned"))?;
        if self.paths.is_empty() {
            return Err(LoaderError::state("task_descriptor", "LocationUnset"));
        }

        let schema = self.resolve_logical_schema(job)?;
        // Fail on the coordinator if the projection does not resolve.
        self.planner.projection_schema(&schema, self.projection())?;

        if self.sorted && self.sort_spec.is_none() {
            let mut env = job.clone();
            env.set_input_paths(&self.paths)?;
            self.sort_spec = Some(self.storage.require_sorted_table(&env, None)?);
        }

        self.planner.seal();
        Ok(TaskDescriptor {
            consumer: self.consumer.clone(),
            signature,
            paths: self.paths.clone(),
            projection: self.projection().map(str::to_string),
            sorted: self.sorted,
            schema,
            sort_spec: self.sort_spec.clone(),
        })
    }

    fn iterator_mut(&mut self, operation: &str) -> LoaderResult<&mut RecordIterator> {
        self.iterator
            .as_mut()
            .ok_or_else(|| LoaderError::state(operation, "NoTaskDescriptor"))
    }

    /// Seeks with a bare key tuple, one value per sort column
    pub fn seek_near_key(&mut self, values: &[Value]) -> LoaderResult<()> {
        self.iterator_mut("seek_near")?.seek_near_key(values)
    }
}

impl LoadFunc for TableLoader {
    fn set_distribution_signature(&mut self, signature: &str) {
        self.signature = Some(signature.to_string());
    }

    fn set_location(&mut self, location: &str, job: &mut JobEnv) -> LoaderResult<()> {
        self.resolve_location(location, job)?;
        self.publish(job)
    }

    fn get_schema(&mut self, location: &str, job: &mut JobEnv) -> LoaderResult<Schema> {
        self.resolve_location(location, job)?;
        let schema = self.resolve_logical_schema(job)?;

        if self.sorted && self.sort_spec.is_none() {
            let mut env = job.clone();
            env.set_input_paths(&self.paths)?;
            self.sort_spec = Some(self.storage.require_sorted_table(&env, None)?);
        }

        self.planner.projection_schema(&schema, self.projection())
    }

    fn push_projection(&mut self, required: &[RequiredField]) -> LoaderResult<RequiredFieldResponse> {
        let schema = self
            .schema
            .clone()
            .ok_or_else(|| LoaderError::state("push_projection", "SchemaUnresolved"))?;
        let rendered = self.planner.plan_projection(&schema, required)?;

        let count = required.len().to_string();
        log_event_with_fields(
            Event::ProjectionPushed,
            &[("fields", count.as_str()), ("projection", rendered.as_str())],
        );
        Ok(RequiredFieldResponse { accepted: true })
    }

    fn describe_input_format(&self) -> TableInputFormat {
        TableInputFormat::new(Arc::clone(&self.storage))
    }

    fn initialize(&mut self, job: &JobEnv) -> LoaderResult<()> {
        if self.iterator.is_none() {
            let descriptor = self.task_descriptor(job)?;
            self.iterator = Some(RecordIterator::new(descriptor, Arc::clone(&self.storage)));
        }
        self.iterator_mut("initialize")?.initialize(job)
    }

    fn bind_reader(&mut self, reader: Box<dyn TableRecordReader>, split: &TableSplit) -> LoaderResult<()> {
        self.iterator_mut("bind_reader")?.bind_reader(reader, split)
    }

    fn seek_near(&mut self, target: &Record) -> LoaderResult<()> {
        self.iterator_mut("seek_near")?.seek_near(target)
    }

    fn next(&mut self) -> LoaderResult<Option<Record>> {
        self.iterator_mut("next")?.next()
    }

    fn close(&mut self) -> LoaderResult<()> {
        match self.iterator.as_mut() {
            Some(iterator) => iterator.close(),
            None => Ok(()),
        }
    }
}
