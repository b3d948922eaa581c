//! Projection planning
//!
//! Precedence of the effective projection (strict order):
//!
//! 1. Pruned projection planned from pushed-down required fields
//! 2. Explicit projection given at construction
//! 3. The whole logical schema
//!
//! The pruned projection is written once on the coordinator. Once the
//! planner is sealed (its artifact has been handed to partitions, or it was
//! rebuilt from one) it can no longer be replanned.

use std::collections::HashSet;

use super::projection::{is_renderable_subfield, render_selectors, Projection, Selector};
use super::required::RequiredField;
use crate::errors::{LoaderError, LoaderResult};
use crate::observability::{log_event_with_fields, Event};
use crate::schema::Schema;

/// The projection in force, by origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveProjection<'a> {
    Pruned(&'a str),
    Explicit(&'a str),
    Full,
}

impl<'a> EffectiveProjection<'a> {
    /// Returns the projection text, `None` for the full schema
    pub fn as_text(&self) -> Option<&'a str> {
        match self {
            EffectiveProjection::Pruned(text) | EffectiveProjection::Explicit(text) => Some(text),
            EffectiveProjection::Full => None,
        }
    }
}

/// Plans and holds the projection of one logical table access
#[derive(Debug, Clone, Default)]
pub struct ProjectionPlanner {
    explicit: Option<String>,
    pruned: Option<String>,
    sealed: bool,
}

impl ProjectionPlanner {
    /// Create a planner; an empty explicit projection counts as none
    pub fn new(explicit: Option<&str>) -> Self {
        Self {
            explicit: non_empty(explicit),
            pruned: None,
            sealed: false,
        }
    }

    /// Rebuilds a sealed planner from distributed planning artifacts
    pub fn from_artifacts(explicit: Option<&str>, pruned: Option<&str>) -> Self {
        Self {
            explicit: non_empty(explicit),
            pruned: non_empty(pruned),
            sealed: true,
        }
    }

    pub fn explicit(&self) -> Option<&str> {
        self.explicit.as_deref()
    }

    pub fn pruned(&self) -> Option<&str> {
        self.pruned.as_deref()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Forbids any further planning
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Returns the projection in force
    pub fn effective_projection(&self) -> EffectiveProjection<'_> {
        match (&self.pruned, &self.explicit) {
            (Some(pruned), _) => EffectiveProjection::Pruned(pruned),
            (None, Some(explicit)) => EffectiveProjection::Explicit(explicit),
            (None, None) => EffectiveProjection::Full,
        }
    }

    /// Resolves the effective projection against `logical`
    pub fn current_projection(&self, logical: &Schema) -> LoaderResult<Projection> {
        match self.effective_projection().as_text() {
            Some(text) => Projection::parse(logical, text),
            None => Ok(Projection::identity(logical)),
        }
    }

    /// Resolves `projection` (or the whole schema) into the schema exposed to the host
    pub fn projection_schema(&self, logical: &Schema, projection: Option<&str>) -> LoaderResult<Schema> {
        let resolved = match projection {
            Some(text) => Projection::parse(logical, text)?,
            None => Projection::identity(logical),
        };

        if resolved.schema().is_empty() {
            return Err(LoaderError::configuration(
                "Cannot determine table projection schema",
            ));
        }
        Ok(resolved.schema().clone())
    }

    /// Renders `required` against the current projection schema and records
    /// the result as the pruned projection.
    ///
    /// Indices refer to the current projection schema; map fields may name
    /// subfields, rendered as `name#{a|b}` in request order. An empty
    /// request renders an empty string and records nothing.
    pub fn plan_projection(&mut self, logical: &Schema, required: &[RequiredField]) -> LoaderResult<String> {
        if self.sealed {
            return Err(LoaderError::state("plan_projection", "Sealed"));
        }

        let current = self.current_projection(logical)?;
        let current_schema = current.schema();
        let mut selectors = Vec::with_capacity(required.len());
        let mut seen = HashSet::with_capacity(required.len());

        for field in required {
            let column = current_schema.column(field.index).ok_or_else(|| {
                LoaderError::planning(format!(
                    "No column at index {} of projection schema '{}'",
                    field.index, current_schema
                ))
            })?;

            if !column.column_type.is_map() && !field.subfields.is_empty() {
                return Err(LoaderError::planning(format!(
                    "Subfields requested on non-map column '{}' of type {} at index {}",
                    column.name, column.column_type, field.index
                )));
            }

            if !seen.insert(field.index) {
                return Err(LoaderError::planning(format!(
                    "Column '{}' at index {} requested more than once",
                    column.name, field.index
                )));
            }

            if let Some(key) = field.subfields.iter().find(|k| !is_renderable_subfield(k)) {
                return Err(LoaderError::planning(format!(
                    "Subfield {:?} of map column '{}' cannot be expressed in a projection",
                    key, column.name
                )));
            }

            selectors.push(Selector::map_keys(column.name.clone(), field.subfields.iter().cloned()));
        }

        let rendered = render_selectors(&selectors);
        if !rendered.is_empty() {
            self.pruned = Some(rendered.clone());
            log_event_with_fields(Event::ProjectionPlanned, &[("projection", rendered.as_str())]);
        }
        Ok(rendered)
    }
}

fn non_empty(text: Option<&str>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty()).map(str::to_string)
}
