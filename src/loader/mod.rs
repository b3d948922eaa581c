//! Table loader
//!
//! Implements the host framework's load contract on top of the planning
//! components and a [`TableStorage`](crate::storage::TableStorage) engine.
//!
//! # Distribution
//!
//! Planning artifacts (paths, logical schema, projection string, sort
//! columns) are written once by the coordinator into a [`TaskDescriptor`]
//! and passed by value to every partition. Partitions never replan.

mod contract;
mod descriptor;
mod iterator;
mod table_loader;

pub use contract::{LoadFeature, LoadFunc, ResourceStatistics};
pub use descriptor::TaskDescriptor;
pub use iterator::{IteratorState, RecordIterator};
pub use table_loader::TableLoader;
