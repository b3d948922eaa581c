//! Schema text parser
//!
//! Grammar:
//!
//! ```text
//! schema := [ column ( "," column )* ]
//! column := name [ ":" type ]            (untyped columns are bytes)
//! type   := "int" | "long" | "float" | "double" | "string" | "bytes" | "bool"
//!         | "map" [ "(" type ")" ]       (bare map holds bytes)
//!         | "record" "(" schema ")"
//! name   := [A-Za-z_][A-Za-z0-9_]*
//! ```

use std::sync::OnceLock;

use regex::Regex;

use super::types::{ColumnSchema, ColumnType, Schema};
use crate::errors::{LoaderError, LoaderResult};

fn identifier_regex() -> &'static Regex {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*").expect("valid identifier regex"))
}

/// Character cursor shared by the schema and projection parsers.
pub(crate) struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    pub(crate) fn skip_whitespace(&mut self) {
        let rest = &self.input[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    pub(crate) fn at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.pos >= self.input.len()
    }

    pub(crate) fn peek(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.input[self.pos..].chars().next()
    }

    /// Returns the next character without skipping whitespace
    pub(crate) fn peek_raw(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    pub(crate) fn advance(&mut self, c: char) {
        self.pos += c.len_utf8();
    }

    /// Consumes `c` if it is the next non-whitespace character
    pub(crate) fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, c: char) -> LoaderResult<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", c)))
        }
    }

    pub(crate) fn identifier(&mut self) -> LoaderResult<&'a str> {
        self.skip_whitespace();
        let rest = &self.input[self.pos..];
        match identifier_regex().find(rest) {
            Some(m) => {
                self.pos += m.end();
                Ok(&rest[..m.end()])
            }
            None => Err(self.error("expected a name")),
        }
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> LoaderError {
        LoaderError::parse(message, self.input, self.pos)
    }
}

/// Parses schema text into a [`Schema`]
pub fn parse_schema(input: &str) -> LoaderResult<Schema> {
    let mut cursor = Cursor::new(input);
    let schema = parse_columns(&mut cursor)?;
    if !cursor.at_end() {
        return Err(cursor.error("unexpected trailing input"));
    }
    Ok(schema)
}

fn parse_columns(cursor: &mut Cursor<'_>) -> LoaderResult<Schema> {
    let mut schema = Schema::empty();
    if cursor.at_end() || cursor.peek() == Some(')') {
        return Ok(schema);
    }

    loop {
        let name = cursor.identifier()?;
        let column_type = if cursor.eat(':') {
            parse_type(cursor)?
        } else {
            ColumnType::Bytes
        };
        schema
            .push(ColumnSchema::new(name, column_type))
            .map_err(|e| cursor.error(e.message().to_string()))?;

        if !cursor.eat(',') {
            break;
        }
    }

    Ok(schema)
}

fn parse_type(cursor: &mut Cursor<'_>) -> LoaderResult<ColumnType> {
    let name = cursor.identifier()?;
    let column_type = match name.to_ascii_lowercase().as_str() {
        "int" => ColumnType::Int,
        "long" => ColumnType::Long,
        "float" => ColumnType::Float,
        "double" => ColumnType::Double,
        "string" => ColumnType::String,
        "bytes" => ColumnType::Bytes,
        "bool" | "boolean" => ColumnType::Bool,
        "map" => {
            if cursor.eat('(') {
                let value = parse_type(cursor)?;
                cursor.expect(')')?;
                ColumnType::Map(Box::new(value))
            } else {
                ColumnType::Map(Box::new(ColumnType::Bytes))
            }
        }
        "record" => {
            cursor.expect('(')?;
            let nested = parse_columns(cursor)?;
            cursor.expect(')')?;
            ColumnType::Record(nested)
        }
        other => return Err(cursor.error(format!("unknown column type '{}'", other))),
    };
    Ok(column_type)
}
