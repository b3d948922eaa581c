//! Sort key generation for sorted tables
//!
//! A sort specification is compiled into a composite encoder whose byte
//! order matches tuple-lexicographic order over the declared column types.
//! Seek keys produced by it position readers inside sorted storage.

mod encoder;
mod generator;

pub use encoder::{encode_field, EncodeFn, SortType};
pub use generator::{is_sortable, KeyGenerator, SeekKey, SortSpec};
