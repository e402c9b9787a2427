//! Core types for selectin batched relationship loading.
//!
//! This crate provides the foundational data model the loader operates on:
//!
//! - `Value` — dynamically-typed SQL scalar with a total order
//! - `Record` — mutable row mapping with relationship slots
//! - `KeyTuple` — composite grouping/matching key
//! - `Relation` — static relationship descriptor (topology + cardinality)
//! - `Error` / `Result` — error types shared across the workspace

pub mod error;
pub mod key;
pub mod record;
pub mod relation;
pub mod value;

pub use error::{
    Error, ExecutionError, IncompleteRecordError, QueryError, QueryErrorKind, RecordSide, Result,
};
pub use key::KeyTuple;
pub use record::{Record, Related};
pub use relation::{Cardinality, Relation, RelationSource, Topology, find_relation};
pub use value::Value;
