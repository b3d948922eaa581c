//! Projection strings
//!
//! Wire format, shared with the storage engine's parser:
//!
//! ```text
//! projection := selector ( " , " selector )*
//! selector   := name | name "#{" subfield ( "|" subfield )* "}"
//! ```
//!
//! The `#{...}` form is only legal on map columns. An empty projection
//! string selects the whole schema.

use std::fmt;

use crate::errors::{LoaderError, LoaderResult};
use crate::schema::{Cursor, Schema};

/// Separator between rendered selectors
pub const SELECTOR_SEPARATOR: &str = " , ";

/// Characters with structural meaning in projection text
const RESERVED_CHARS: [char; 5] = ['|', '}', ',', '{', '#'];

/// Returns true if `key` renders as a map subfield that parses back unchanged.
///
/// Projection text has no escaping, so a key must be non-empty, free of
/// reserved characters and free of surrounding whitespace.
pub fn is_renderable_subfield(key: &str) -> bool {
    !key.is_empty() && key.trim() == key && !key.contains(RESERVED_CHARS)
}

/// One projected column, optionally narrowed to map subfields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// Column name
    pub name: String,
    /// Requested map keys in request order; empty selects the whole column
    pub subfields: Vec<String>,
}

impl Selector {
    /// Selects a whole column
    pub fn column(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subfields: Vec::new(),
        }
    }

    /// Selects some keys of a map column
    pub fn map_keys<S: Into<String>>(name: impl Into<String>, keys: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            subfields: keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.subfields.is_empty() {
            write!(f, "#{{{}}}", self.subfields.join("|"))?;
        }
        Ok(())
    }
}

/// Renders selectors in order, joined by `" , "`
pub fn render_selectors(selectors: &[Selector]) -> String {
    selectors
        .iter()
        .map(Selector::to_string)
        .collect::<Vec<_>>()
        .join(SELECTOR_SEPARATOR)
}

/// Parses projection text into selectors without resolving them
pub fn parse_selectors(text: &str) -> LoaderResult<Vec<Selector>> {
    let mut cursor = Cursor::new(text);
    let mut selectors = Vec::new();
    if cursor.at_end() {
        return Ok(selectors);
    }

    loop {
        let name = cursor.identifier()?.to_string();
        let mut subfields = Vec::new();
        if cursor.eat('#') {
            cursor.expect('{')?;
            loop {
                subfields.push(parse_subfield(&mut cursor)?);
                if !cursor.eat('|') {
                    break;
                }
            }
            cursor.expect('}')?;
        }
        selectors.push(Selector { name, subfields });

        if !cursor.eat(',') {
            break;
        }
    }

    if !cursor.at_end() {
        return Err(cursor.error("unexpected trailing input"));
    }
    Ok(selectors)
}

fn parse_subfield(cursor: &mut Cursor<'_>) -> LoaderResult<String> {
    let mut key = String::new();
    while let Some(c) = cursor.peek_raw() {
        if RESERVED_CHARS.contains(&c) {
            break;
        }
        key.push(c);
        cursor.advance(c);
    }
    let key = key.trim();
    if key.is_empty() {
        return Err(cursor.error("expected a map key"));
    }
    Ok(key.to_string())
}

/// A projection resolved against a logical schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    selectors: Vec<Selector>,
    schema: Schema,
}

impl Projection {
    /// The identity projection: every column, in declaration order
    pub fn identity(logical: &Schema) -> Self {
        Self {
            selectors: logical.names().map(Selector::column).collect(),
            schema: logical.clone(),
        }
    }

    /// Resolves projection text against `logical`.
    ///
    /// Syntax errors are `ParseError`; unknown or duplicate columns and
    /// subfields on non-map columns are `PlanningError`.
    pub fn parse(logical: &Schema, text: &str) -> LoaderResult<Self> {
        let selectors = parse_selectors(text)?;
        if selectors.is_empty() {
            return Ok(Self::identity(logical));
        }
        Self::resolve(logical, selectors)
    }

    /// Resolves already-parsed selectors against `logical`
    pub fn resolve(logical: &Schema, selectors: Vec<Selector>) -> LoaderResult<Self> {
        let mut columns = Vec::with_capacity(selectors.len());

        for selector in &selectors {
            let column = logical.column_by_name(&selector.name).ok_or_else(|| {
                LoaderError::planning(format!(
                    "Projected column '{}' is not in schema '{}'",
                    selector.name, logical
                ))
            })?;

            if !selector.subfields.is_empty() && !column.column_type.is_map() {
                return Err(LoaderError::planning(format!(
                    "Subfields requested on non-map column '{}' of type {}",
                    column.name, column.column_type
                )));
            }
            columns.push(column.clone());
        }

        let schema = Schema::new(columns)
            .map_err(|e| LoaderError::planning(format!("Invalid projection: {}", e.message())))?;

        Ok(Self { selectors, schema })
    }

    /// Returns the selectors in projection order
    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    /// Returns the projection schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", render_selectors(&self.selectors))
    }
}
