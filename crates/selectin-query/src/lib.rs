//! Query construction layer for selectin.
//!
//! `selectin-query` turns caller-built base queries into the reusable
//! templates the loader executes once per batch:
//!
//! - **`Select`**: dynamic SELECT builder with table aliasing, column
//!   adaptation, and the single key-set predicate.
//! - **`Expr`**: a small expression DSL for base-query filters.
//! - **`Dialect`**: placeholder and quoting differences per database.
//! - **`Executor`**: the execution boundary; real drivers render via
//!   `Select::render`, tests filter rows in memory.
//!
//! The facade crate `selectin` re-exports everything here.

pub mod clause;
pub mod executor;
pub mod expr;
pub mod select;
pub mod testing;

pub use clause::{Limit, Offset, OrderBy, OrderDirection};
pub use executor::Executor;
pub use expr::{BinaryOp, Dialect, Expr};
pub use select::{ColumnRef, KEY_SET_PLACEHOLDER, Select, Statement, TableRef};

// Re-export the structured-concurrency primitives query execution is built
// on, so executor implementations need only this crate.
pub use asupersync::{Cx, Outcome};
