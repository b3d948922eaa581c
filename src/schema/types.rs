//! Column and schema type definitions
//!
//! Supported types:
//! - int, long, float, double: fixed-width numerics
//! - string: UTF-8 string
//! - bytes: raw byte string
//! - bool: boolean
//! - map(<value type>): string-keyed map
//! - record(<schema>): nested record

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{LoaderError, LoaderResult};

/// Column data type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// UTF-8 string
    String,
    /// Raw bytes
    Bytes,
    /// Boolean
    Bool,
    /// String-keyed map with a single value type
    Map(Box<ColumnType>),
    /// Nested record with its own schema
    Record(Schema),
}

impl ColumnType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnType::Int => "int",
            ColumnType::Long => "long",
            ColumnType::Float => "float",
            ColumnType::Double => "double",
            ColumnType::String => "string",
            ColumnType::Bytes => "bytes",
            ColumnType::Bool => "bool",
            ColumnType::Map(_) => "map",
            ColumnType::Record(_) => "record",
        }
    }

    /// Returns true for map columns
    pub fn is_map(&self) -> bool {
        matches!(self, ColumnType::Map(_))
    }

    /// Returns true for scalar types
    pub fn is_primitive(&self) -> bool {
        !matches!(self, ColumnType::Map(_) | ColumnType::Record(_))
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Map(value) => write!(f, "map({})", value),
            ColumnType::Record(schema) => write!(f, "record({})", schema),
            other => write!(f, "{}", other.type_name()),
        }
    }
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    /// Column name, unique within its schema level
    pub name: String,
    /// Column data type
    pub column_type: ColumnType,
}

impl ColumnSchema {
    /// Create a new column
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

impl fmt::Display for ColumnSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.column_type)
    }
}

/// Ordered column definitions describing a table's shape.
///
/// Serializes as its schema text, e.g. `id:int, tags:map(string)`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Schema {
    columns: Vec<ColumnSchema>,
}

impl Schema {
    /// Create a schema, rejecting duplicate column names
    pub fn new(columns: Vec<ColumnSchema>) -> LoaderResult<Self> {
        let mut schema = Self::empty();
        for column in columns {
            schema.push(column)?;
        }
        Ok(schema)
    }

    /// Create a schema with no columns
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    /// Appends a column, rejecting duplicate names
    pub(crate) fn push(&mut self, column: ColumnSchema) -> LoaderResult<()> {
        if self.index_of(&column.name).is_some() {
            return Err(LoaderError::parse_plain(format!(
                "Duplicate column name '{}'",
                column.name
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Returns the columns in declaration order
    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    /// Returns the column at `index`
    pub fn column(&self, index: usize) -> Option<&ColumnSchema> {
        self.columns.get(index)
    }

    /// Returns the column named `name`
    pub fn column_by_name(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns the position of the column named `name`
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Returns the number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the schema has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the column names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", column)?;
        }
        Ok(())
    }
}

impl FromStr for Schema {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        super::parser::parse_schema(s)
    }
}

impl TryFrom<String> for Schema {
    type Error = LoaderError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Schema> for String {
    fn from(schema: Schema) -> Self {
        schema.to_string()
    }
}
