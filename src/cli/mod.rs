//! CLI module for tableload
//!
//! Provides command-line access to:
//! - schema: resolve a location and print its schema
//! - plan: plan a pruned projection and print the task descriptor
//! - scan: read records as JSON lines

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, LoadOptions};
pub use commands::{parse_fields, parse_seek_key, plan, run, run_command, scan, schema};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_line, write_response};
