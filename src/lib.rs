//! tableload - a table loader for pull-based record processing
//!
//! Resolves table locations, unions their schemas, plans projection
//! pushdown, builds sort keys for sorted tables and reads records one
//! partition at a time.

pub mod cli;
pub mod config;
pub mod errors;
pub mod loader;
pub mod location;
pub mod observability;
pub mod projection;
pub mod record;
pub mod schema;
pub mod sortkey;
pub mod storage;
