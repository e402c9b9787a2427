//! Batched relationship loading for dynamic SQL row sets.
//!
//! Given parent records that already carry their own key columns, selectin
//! fetches all related child records with a bounded number of queries —
//! independent of the parent count — and attaches each child (or
//! collection of children) back onto its correct parent. This is the
//! classic N+1 avoidance strategy, generalized over both relationship
//! topologies: the parent holding the foreign key (many-to-one) and the
//! child holding it (one-to-many / many-to-many), with composite keys,
//! NULL-key parents, and chunked execution handled throughout.
//!
//! # Example
//!
//! ```ignore
//! use selectin::{Record, Relation, Select, SelectInLoader};
//!
//! // comment.article_id references article.id
//! let relation = Relation::one_to_many("comments", "comments", &["id"], &["article_id"]);
//!
//! let loader = SelectInLoader::new(relation);
//! let prepared = loader.prepare(&articles)?;
//! let template = prepared.build_query(Select::table("comments").columns(&["id", "body"]))?;
//!
//! let mut rows = prepared.fetch_and_populate(&executor, &template, &mut articles)?;
//! while let Some(comment) = rows.next(&cx).await? {
//!     // every yielded row's parents are already populated; recurse here
//!     // for nested relationships
//! }
//! ```
//!
//! One load call executes its batches strictly sequentially over one
//! executor; the parent records are mutated in place and never retained
//! afterwards.

pub mod loader;

pub use loader::{DEFAULT_CHUNK_SIZE, FetchedRecords, LoaderConfig, Prepared, SelectInLoader};

// Re-export the data model and query layer so most users need only this
// crate.
pub use selectin_core::{
    Cardinality, Error, ExecutionError, IncompleteRecordError, KeyTuple, QueryError,
    QueryErrorKind, Record, RecordSide, Related, Relation, RelationSource, Result, Topology,
    Value, find_relation,
};
pub use selectin_query::{
    ColumnRef, Cx, Dialect, Executor, Expr, KEY_SET_PLACEHOLDER, Limit, Offset, OrderBy, Outcome,
    Select, Statement, TableRef, testing,
};
