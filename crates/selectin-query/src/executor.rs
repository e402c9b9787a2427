//! The query execution boundary.

use crate::expr::Dialect;
use crate::select::Select;
use asupersync::{Cx, Outcome};
use selectin_core::{Error, KeyTuple, Record};

/// A connection-like resource able to run a keyed SELECT template.
///
/// The loader hands implementations the template plus the key list bound
/// to its [`KEY_SET_PLACEHOLDER`](crate::select::KEY_SET_PLACEHOLDER); a
/// driver-backed executor renders via [`Select::render`] for its
/// [`Dialect`] and runs the resulting statement, while test executors can
/// filter rows in memory without touching SQL at all.
///
/// No ordering guarantee is required across returned rows. Failures
/// surface as `Outcome::Err` and abort the remaining batches of the load
/// call; cancellation flows through `Outcome::Cancelled` untouched.
pub trait Executor: Send + Sync {
    /// Execute the template with `keys` bound to its key-set placeholder
    /// and return all matching rows.
    fn fetch_in_set(
        &self,
        cx: &Cx,
        query: &Select,
        keys: &[KeyTuple],
    ) -> impl Future<Output = Outcome<Vec<Record>, Error>> + Send;

    /// The SQL dialect statements should be rendered for.
    fn dialect(&self) -> Dialect {
        Dialect::default()
    }
}
