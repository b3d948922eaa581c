//! Order-preserving scalar encoders
//!
//! Every encoded field starts with a presence byte (0x00 null, 0x01 value),
//! so nulls sort before any value. Value encodings:
//!
//! | Type          | Encoding                                               |
//! |---------------|--------------------------------------------------------|
//! | bool          | 1 byte, 0 or 1                                         |
//! | int, long     | big-endian two's complement with the sign bit flipped  |
//! | float, double | big-endian IEEE bits; negatives fully inverted,        |
//! |               | positives with the sign bit flipped                    |
//! | string, bytes | 0x00 escaped as 0x00 0xFF, terminated by 0x00 0x00     |
//!
//! Each encoding is self-delimiting, so concatenating fields preserves
//! tuple-lexicographic order under byte comparison.

use std::fmt;

use crate::errors::{LoaderError, LoaderResult};
use crate::record::Value;
use crate::schema::ColumnType;

const NULL_MARKER: u8 = 0x00;
const VALUE_MARKER: u8 = 0x01;

/// Encodes one value, without the presence byte
pub type EncodeFn = fn(&Value, &mut Vec<u8>) -> Result<(), &'static str>;

/// Primitive types usable as sort columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortType {
    Bool,
    Int,
    Long,
    Float,
    Double,
    String,
    Bytes,
}

impl SortType {
    /// Resolves the sort type of a column; map and record columns are rejected.
    pub fn from_column_type(column_type: &ColumnType) -> LoaderResult<Self> {
        let sort_type = match column_type {
            ColumnType::Bool => SortType::Bool,
            ColumnType::Int => SortType::Int,
            ColumnType::Long => SortType::Long,
            ColumnType::Float => SortType::Float,
            ColumnType::Double => SortType::Double,
            ColumnType::String => SortType::String,
            ColumnType::Bytes => SortType::Bytes,
            other => {
                return Err(LoaderError::configuration(format!(
                    "Unsupported sort column type '{}'",
                    other
                )))
            }
        };
        Ok(sort_type)
    }

    /// Returns the encode function for this type
    pub fn encoder(self) -> EncodeFn {
        match self {
            SortType::Bool => encode_bool,
            SortType::Int => encode_int,
            SortType::Long => encode_long,
            SortType::Float => encode_float,
            SortType::Double => encode_double,
            SortType::String => encode_string,
            SortType::Bytes => encode_bytes,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortType::Bool => "bool",
            SortType::Int => "int",
            SortType::Long => "long",
            SortType::Float => "float",
            SortType::Double => "double",
            SortType::String => "string",
            SortType::Bytes => "bytes",
        }
    }
}

impl fmt::Display for SortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Appends the presence byte and, for non-null values, the value encoding
pub fn encode_field(encode: EncodeFn, value: &Value, out: &mut Vec<u8>) -> Result<(), &'static str> {
    if value.is_null() {
        out.push(NULL_MARKER);
        return Ok(());
    }
    out.push(VALUE_MARKER);
    encode(value, out)
}

fn encode_bool(value: &Value, out: &mut Vec<u8>) -> Result<(), &'static str> {
    match value {
        Value::Bool(b) => {
            out.push(u8::from(*b));
            Ok(())
        }
        _ => Err("bool"),
    }
}

fn encode_int(value: &Value, out: &mut Vec<u8>) -> Result<(), &'static str> {
    match value {
        Value::Int(v) => {
            out.extend_from_slice(&((*v as u32) ^ (1 << 31)).to_be_bytes());
            Ok(())
        }
        _ => Err("int"),
    }
}

fn encode_long(value: &Value, out: &mut Vec<u8>) -> Result<(), &'static str> {
    let v = match value {
        Value::Long(v) => *v,
        Value::Int(v) => i64::from(*v),
        _ => return Err("long"),
    };
    out.extend_from_slice(&((v as u64) ^ (1 << 63)).to_be_bytes());
    Ok(())
}

fn encode_float(value: &Value, out: &mut Vec<u8>) -> Result<(), &'static str> {
    match value {
        Value::Float(v) => {
            let bits = v.to_bits();
            let ordered = if bits >> 31 == 1 { !bits } else { bits ^ (1 << 31) };
            out.extend_from_slice(&ordered.to_be_bytes());
            Ok(())
        }
        _ => Err("float"),
    }
}

fn encode_double(value: &Value, out: &mut Vec<u8>) -> Result<(), &'static str> {
    let v = match value {
        Value::Double(v) => *v,
        Value::Float(v) => f64::from(*v),
        _ => return Err("double"),
    };
    let bits = v.to_bits();
    let ordered = if bits >> 63 == 1 { !bits } else { bits ^ (1 << 63) };
    out.extend_from_slice(&ordered.to_be_bytes());
    Ok(())
}

fn encode_string(value: &Value, out: &mut Vec<u8>) -> Result<(), &'static str> {
    match value {
        Value::String(s) => {
            escape_terminated(s.as_bytes(), out);
            Ok(())
        }
        _ => Err("string"),
    }
}

fn encode_bytes(value: &Value, out: &mut Vec<u8>) -> Result<(), &'static str> {
    match value {
        Value::Bytes(b) => {
            escape_terminated(b, out);
            Ok(())
        }
        _ => Err("bytes"),
    }
}

fn escape_terminated(bytes: &[u8], out: &mut Vec<u8>) {
    for &b in bytes {
        out.push(b);
        if b == 0x00 {
            out.push(0xFF);
        }
    }
    out.extend_from_slice(&[0x00, 0x00]);
}
