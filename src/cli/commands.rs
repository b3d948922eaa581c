//! CLI command implementations
//!
//! Each command plays the coordinator locally: resolve the location, plan
//! the projection, issue a task descriptor. `scan` then rebuilds a
//! partition loader from the serialized descriptor and reads it in-process.

use std::io;
use std::sync::Arc;

use serde_json::{json, Value as Json};

use crate::config::{JobEnv, LoaderConfig};
use crate::loader::{LoadFunc, TableLoader, TaskDescriptor};
use crate::observability::Logger;
use crate::projection::RequiredField;
use crate::record::Value;
use crate::sortkey::SortSpec;
use crate::storage::LocalTableStorage;

use super::args::{Command, LoadOptions};
use super::errors::{CliError, CliResult};
use super::io::{write_line, write_response};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Schema { load } => schema(&load),
        Command::Plan { load, fields } => plan(&load, &fields),
        Command::Scan {
            load,
            fields,
            seek,
            limit,
        } => scan(&load, fields.as_deref(), seek.as_deref(), limit),
    }
}

/// Builds the loader and job environment described by `opts`
fn prepare(opts: &LoadOptions) -> CliResult<(TableLoader, JobEnv)> {
    let config = match &opts.config {
        Some(path) => LoaderConfig::load(path)?,
        None => LoaderConfig::default(),
    };
    Logger::set_min_severity(config.severity()?);

    let mut job = JobEnv::new();
    config.apply_to(&mut job);

    let projection = opts.projection.as_deref().unwrap_or("");
    let loader = if opts.sorted {
        TableLoader::with_arguments(projection, "sorted")?
    } else {
        TableLoader::with_projection(projection)
    };
    let mut loader = loader.with_config(&config);
    loader.set_distribution_signature(&opts.signature);

    Ok((loader, job))
}

/// Parses `0,1#x|y` into required fields
pub fn parse_fields(text: &str) -> CliResult<Vec<RequiredField>> {
    text.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(|f| {
            RequiredField::parse_shorthand(f)
                .ok_or_else(|| CliError::usage(format!("Invalid required field '{}'", f)))
        })
        .collect()
}

/// Converts a JSON key tuple into values typed by the sort columns
pub fn parse_seek_key(text: &str, spec: &SortSpec) -> CliResult<Vec<Value>> {
    let json: Json = serde_json::from_str(text)
        .map_err(|e| CliError::usage(format!("Invalid seek key '{}': {}", text, e)))?;
    let items = json
        .as_array()
        .ok_or_else(|| CliError::usage("Seek key must be a JSON array"))?;
    if items.len() > spec.columns().len() {
        return Err(CliError::usage(format!(
            "Seek key has {} values but the table is sorted on {} columns ({})",
            items.len(),
            spec.columns().len(),
            spec
        )));
    }

    items
        .iter()
        .zip(spec.columns())
        .map(|(item, column)| Value::from_json(item, &column.column_type).map_err(CliError::from))
        .collect()
}

/// Print the resolved tables and schema
pub fn schema(opts: &LoadOptions) -> CliResult<()> {
    let (mut loader, mut job) = prepare(opts)?;
    let projected = loader.get_schema(&opts.location, &mut job)?;

    let paths: Vec<String> = loader.paths().iter().map(|p| p.display().to_string()).collect();
    let logical = loader
        .logical_schema()
        .map(|s| s.to_string())
        .unwrap_or_default();

    write_response(json!({
        "paths": paths,
        "schema": logical,
        "projection_schema": projected.to_string(),
    }))
}

/// Plan a pruned projection and print the task descriptor
pub fn plan(opts: &LoadOptions, fields: &str) -> CliResult<()> {
    let (mut loader, mut job) = prepare(opts)?;
    let required = parse_fields(fields)?;

    loader.get_schema(&opts.location, &mut job)?;
    loader.push_projection(&required)?;
    loader.set_location(&opts.location, &mut job)?;
    let descriptor = loader.task_descriptor(&job)?;
    let serialized = serde_json::to_value(&descriptor)?;

    write_response(json!({
        "projection": descriptor.projection,
        "descriptor": serialized,
    }))
}

/// Print records as JSON lines
pub fn scan(opts: &LoadOptions, fields: Option<&str>, seek: Option<&str>, limit: Option<u64>) -> CliResult<()> {
    let (mut loader, mut job) = prepare(opts)?;

    loader.get_schema(&opts.location, &mut job)?;
    if let Some(fields) = fields {
        loader.push_projection(&parse_fields(fields)?)?;
    }
    loader.set_location(&opts.location, &mut job)?;
    let descriptor = TaskDescriptor::from_json(&loader.task_descriptor(&job)?.to_json()?)?;
    let seek_key = match (seek, &descriptor.sort_spec) {
        (Some(seek), Some(spec)) if descriptor.sorted => Some(parse_seek_key(seek, spec)?),
        (Some(_), _) => return Err(CliError::usage("--seek requires --sorted")),
        (None, _) => None,
    };

    let mut partition = TableLoader::from_descriptor(descriptor, Arc::new(LocalTableStorage::new()));
    partition.initialize(&job)?;
    if let Some(key) = seek_key {
        partition.seek_near_key(&key)?;
    }

    let result = print_records(&mut partition, limit);
    partition.close()?;
    result
}

fn print_records(loader: &mut TableLoader, limit: Option<u64>) -> CliResult<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut printed = 0u64;

    while limit.map_or(true, |l| printed < l) {
        match loader.next()? {
            Some(record) => write_line(&mut out, &record.to_json())?,
            None => break,
        }
        printed += 1;
    }
    Ok(())
}
