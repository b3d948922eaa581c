//! Composite seek-key generation
//!
//! A [`KeyGenerator`] is compiled once from a [`SortSpec`] and the schema of
//! the records it will encode. Column positions and encode functions are
//! resolved at compile time; `generate_key` only extracts and encodes.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::encoder::{encode_field, EncodeFn, SortType};
use crate::errors::{LoaderError, LoaderResult};
use crate::record::{Record, Value};
use crate::schema::{ColumnSchema, ColumnType, Schema};

/// Ordered (column, type) pairs, most significant first.
///
/// Serializes as schema text, e.g. `id:int, name:string`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortSpec {
    columns: Schema,
}

impl SortSpec {
    /// Create a sort specification from ordered columns
    pub fn new(columns: Vec<ColumnSchema>) -> LoaderResult<Self> {
        if columns.is_empty() {
            return Err(LoaderError::configuration("Sort specification has no columns"));
        }
        Ok(Self {
            columns: Schema::new(columns)?,
        })
    }

    /// Resolves sort column names against a table schema
    pub fn from_names<S: AsRef<str>>(names: &[S], schema: &Schema) -> LoaderResult<Self> {
        let columns = names
            .iter()
            .map(|name| {
                schema.column_by_name(name.as_ref()).cloned().ok_or_else(|| {
                    LoaderError::configuration(format!(
                        "Sort column '{}' is not in schema '{}'",
                        name.as_ref(),
                        schema
                    ))
                })
            })
            .collect::<LoaderResult<Vec<_>>>()?;
        Self::new(columns)
    }

    /// Returns the sort columns in precedence order
    pub fn columns(&self) -> &[ColumnSchema] {
        self.columns.columns()
    }

    /// Returns the sort column names in precedence order
    pub fn names(&self) -> Vec<&str> {
        self.columns.names().collect()
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.columns)
    }
}

/// Opaque, byte-comparable seek key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeekKey(Vec<u8>);

impl SeekKey {
    /// Wraps already-encoded key bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

#[derive(Debug, Clone)]
struct KeyPart {
    name: String,
    sort_type: SortType,
    position: usize,
    encode: EncodeFn,
}

/// Compiled composite key encoder
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    parts: Vec<KeyPart>,
}

impl KeyGenerator {
    /// Compiles a generator for records laid out by `record_schema`.
    ///
    /// Every sort column must be present in `record_schema` with the declared
    /// type, and must be a primitive type.
    pub fn compile(spec: &SortSpec, record_schema: &Schema) -> LoaderResult<Self> {
        let mut parts = Vec::with_capacity(spec.columns().len());

        for column in spec.columns() {
            let sort_type = SortType::from_column_type(&column.column_type)?;
            let position = record_schema.index_of(&column.name).ok_or_else(|| {
                LoaderError::configuration(format!(
                    "Sort column '{}' is not part of the projection '{}'",
                    column.name, record_schema
                ))
            })?;

            let actual = &record_schema.columns()[position].column_type;
            if actual != &column.column_type {
                return Err(LoaderError::configuration(format!(
                    "Sort column '{}' declared {} but projected as {}",
                    column.name, column.column_type, actual
                )));
            }

            parts.push(KeyPart {
                name: column.name.clone(),
                sort_type,
                position,
                encode: sort_type.encoder(),
            });
        }

        Ok(Self { parts })
    }

    /// Compiles a generator for bare key tuples: value `i` is sort column `i`.
    pub fn for_key_tuple(spec: &SortSpec) -> LoaderResult<Self> {
        let tuple_schema = Schema::new(spec.columns().to_vec())?;
        Self::compile(spec, &tuple_schema)
    }

    /// Returns the sort types in key order
    pub fn sort_types(&self) -> Vec<SortType> {
        self.parts.iter().map(|p| p.sort_type).collect()
    }

    /// Encodes the seek key of `record`
    pub fn generate_key(&self, record: &Record) -> LoaderResult<SeekKey> {
        self.encode_fields(record.fields())
    }

    /// Encodes a bare key tuple
    pub fn key_for_values(&self, values: &[Value]) -> LoaderResult<SeekKey> {
        if values.len() != self.parts.len() {
            return Err(LoaderError::configuration(format!(
                "Key tuple has {} values, sort key has {} columns",
                values.len(),
                self.parts.len()
            )));
        }
        let mut out = Vec::new();
        for (part, value) in self.parts.iter().zip(values) {
            Self::encode_part(part, value, &mut out)?;
        }
        Ok(SeekKey(out))
    }

    fn encode_fields(&self, fields: &[Value]) -> LoaderResult<SeekKey> {
        let mut out = Vec::new();
        for part in &self.parts {
            let value = fields.get(part.position).ok_or_else(|| {
                LoaderError::configuration(format!(
                    "Record has {} fields, sort column '{}' is at position {}",
                    fields.len(),
                    part.name,
                    part.position
                ))
            })?;
            Self::encode_part(part, value, &mut out)?;
        }
        Ok(SeekKey(out))
    }

    fn encode_part(part: &KeyPart, value: &Value, out: &mut Vec<u8>) -> LoaderResult<()> {
        encode_field(part.encode, value, out).map_err(|expected| {
            LoaderError::configuration(format!(
                "Sort column '{}' expects {}, got {}",
                part.name,
                expected,
                value.type_name()
            ))
        })
    }
}

/// Returns true if `column_type` may appear in a sort specification
pub fn is_sortable(column_type: &ColumnType) -> bool {
    SortType::from_column_type(column_type).is_ok()
}
