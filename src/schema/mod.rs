//! Table schemas
//!
//! - Ordered column definitions with unique names per level
//! - Textual form shared with the storage engine (`name:type, ...`)
//! - Column-name-keyed union across multiple tables
//! - Schema resolution for a resolved set of table paths

mod parser;
mod resolver;
mod types;
mod union;

pub(crate) use parser::Cursor;
pub use parser::parse_schema;
pub use resolver::resolve_schema;
pub use types::{ColumnSchema, ColumnType, Schema};
pub use union::union_all;
