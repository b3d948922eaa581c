//! Logical schema resolution over resolved table paths

use std::path::PathBuf;

use super::types::Schema;
use crate::config::ConfigView;
use crate::errors::{LoaderError, LoaderResult};
use crate::observability::{log_event_with_fields, Event};
use crate::storage::TableStorage;

/// Returns the logical schema of `paths`.
///
/// One path yields the storage schema verbatim. Several paths are unioned
/// in path order.
pub fn resolve_schema(
    storage: &dyn TableStorage,
    paths: &[PathBuf],
    env: &dyn ConfigView,
) -> LoaderResult<Schema> {
    let (first, rest) = paths
        .split_first()
        .ok_or_else(LoaderError::no_table_specified)?;

    let mut schema = storage.get_schema(first, env)?;
    for path in rest {
        let next = storage.get_schema(path, env)?;
        schema.union_with(&next).map_err(|e| {
            let details = format!("{} ({})", e.details().unwrap_or_default(), path.display());
            e.with_details(details)
        })?;
    }

    let tables = paths.len().to_string();
    let text = schema.to_string();
    log_event_with_fields(
        Event::SchemaResolved,
        &[("schema", text.as_str()), ("tables", tables.as_str())],
    );
    Ok(schema)
}
