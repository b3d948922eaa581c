//! Location resolution
//!
//! Turns a comma-separated list of path patterns into validated table
//! directories.

mod fs;
mod resolver;

pub use fs::{expand_braces, is_glob_pattern, FileStatus, FileSystem, LocalFileSystem};
pub use resolver::{split_location, LocationResolver};
