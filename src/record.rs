//! Field values and records
//!
//! A record is an ordered sequence of values positionally aligned to the
//! active projection schema. Values convert to and from plain JSON using the
//! column type to disambiguate (int vs long, string vs bytes).

use std::collections::BTreeMap;

use serde_json::{Map as JsonMap, Number, Value as Json};

use crate::errors::{LoaderError, LoaderResult};
use crate::schema::{ColumnType, Schema};

/// A single field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value
    Null,
    /// Boolean
    Bool(bool),
    /// 32-bit signed integer
    Int(i32),
    /// 64-bit signed integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// UTF-8 string
    String(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// String-keyed map
    Map(BTreeMap<String, Value>),
    /// Nested record, positionally aligned to its record schema
    Record(Vec<Value>),
}

impl Value {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
        }
    }

    /// Returns true for `Value::Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts the value to plain JSON.
    ///
    /// Bytes become an array of numbers, records an array of fields.
    /// Non-finite floats become null.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(v) => Json::from(*v),
            Value::Long(v) => Json::from(*v),
            Value::Float(v) => Number::from_f64(f64::from(*v)).map_or(Json::Null, Json::Number),
            Value::Double(v) => Number::from_f64(*v).map_or(Json::Null, Json::Number),
            Value::String(s) => Json::String(s.clone()),
            Value::Bytes(b) => Json::Array(b.iter().map(|v| Json::from(*v)).collect()),
            Value::Map(m) => {
                let mut obj = JsonMap::new();
                for (k, v) in m {
                    obj.insert(k.clone(), v.to_json());
                }
                Json::Object(obj)
            }
            Value::Record(fields) => Json::Array(fields.iter().map(Value::to_json).collect()),
        }
    }

    /// Converts plain JSON into a value of the given column type.
    pub fn from_json(json: &Json, column_type: &ColumnType) -> LoaderResult<Value> {
        if json.is_null() {
            return Ok(Value::Null);
        }

        let mismatch = || {
            LoaderError::parse_plain(format!(
                "JSON value {} is not a valid {}",
                json,
                column_type.type_name()
            ))
        };

        let value = match column_type {
            ColumnType::Bool => Value::Bool(json.as_bool().ok_or_else(mismatch)?),
            ColumnType::Int => {
                let v = json.as_i64().ok_or_else(mismatch)?;
                Value::Int(i32::try_from(v).map_err(|_| mismatch())?)
            }
            ColumnType::Long => Value::Long(json.as_i64().ok_or_else(mismatch)?),
            ColumnType::Float => Value::Float(json.as_f64().ok_or_else(mismatch)? as f32),
            ColumnType::Double => Value::Double(json.as_f64().ok_or_else(mismatch)?),
            ColumnType::String => Value::String(json.as_str().ok_or_else(mismatch)?.to_string()),
            ColumnType::Bytes => match json {
                Json::String(s) => Value::Bytes(s.as_bytes().to_vec()),
                Json::Array(items) => {
                    let mut bytes = Vec::with_capacity(items.len());
                    for item in items {
                        let b = item.as_u64().filter(|b| *b <= 255).ok_or_else(mismatch)?;
                        bytes.push(b as u8);
                    }
                    Value::Bytes(bytes)
                }
                _ => return Err(mismatch()),
            },
            ColumnType::Map(value_type) => {
                let obj = json.as_object().ok_or_else(mismatch)?;
                let mut map = BTreeMap::new();
                for (k, v) in obj {
                    map.insert(k.clone(), Value::from_json(v, value_type)?);
                }
                Value::Map(map)
            }
            ColumnType::Record(schema) => Value::Record(record_fields_from_json(json, schema)?),
        };

        Ok(value)
    }
}

fn record_fields_from_json(json: &Json, schema: &Schema) -> LoaderResult<Vec<Value>> {
    let items = json.as_array().ok_or_else(|| {
        LoaderError::parse_plain(format!("JSON value {} is not a record array", json))
    })?;

    if items.len() != schema.len() {
        return Err(LoaderError::parse_plain(format!(
            "record has {} fields, schema '{}' has {}",
            items.len(),
            schema,
            schema.len()
        )));
    }

    items
        .iter()
        .zip(schema.columns())
        .map(|(item, column)| Value::from_json(item, &column.column_type))
        .collect()
}

/// An ordered sequence of field values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<Value>,
}

impl Record {
    /// Create a record from its field values
    pub fn new(fields: Vec<Value>) -> Self {
        Self { fields }
    }

    /// Parse a JSON array into a record aligned to `schema`
    pub fn from_json(json: &Json, schema: &Schema) -> LoaderResult<Self> {
        Ok(Self::new(record_fields_from_json(json, schema)?))
    }

    /// Returns the field at `index`, if present
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.fields.get(index)
    }

    /// Returns the number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the field values
    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    /// Consumes the record, returning its values
    pub fn into_fields(self) -> Vec<Value> {
        self.fields
    }

    /// Converts the record to a JSON array
    pub fn to_json(&self) -> Json {
        Json::Array(self.fields.iter().map(Value::to_json).collect())
    }
}

impl From<Vec<Value>> for Record {
    fn from(fields: Vec<Value>) -> Self {
        Self::new(fields)
    }
}
