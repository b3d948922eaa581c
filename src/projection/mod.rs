//! Column projection
//!
//! - Projection strings: parsing, resolution against a schema, rendering
//! - Required fields pushed down by the host optimizer
//! - The planner choosing between pruned, explicit and full projections

#[allow(clippy::module_inception)]
mod projection;
mod planner;
mod required;

pub use planner::{EffectiveProjection, ProjectionPlanner};
pub use projection::{
    is_renderable_subfield, parse_selectors, render_selectors, Projection, Selector, SELECTOR_SEPARATOR,
};
pub use required::{RequiredField, RequiredFieldResponse};
