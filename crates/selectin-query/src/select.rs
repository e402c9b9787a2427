//! Reusable SELECT templates with a batch key-set predicate.
//!
//! A [`Select`] describes a query against one target table (optionally
//! aliased). The loader turns a caller-built base query into a *template*
//! by ensuring the match columns are selected and attaching exactly one
//! key-set predicate: "the match columns equal one element of the bound
//! key list". Rendering a template with a binding never mutates it, so one
//! template serves every batch of a load call.

use crate::clause::{Limit, Offset, OrderBy};
use crate::expr::{Dialect, Expr};
use selectin_core::{Error, KeyTuple, QueryErrorKind, Result, Value};

/// The name of the single bound placeholder in a template.
///
/// Purely documentary in rendered SQL (placeholders are positional), but
/// callers and executors speak of "binding the key set" by this name.
pub const KEY_SET_PLACEHOLDER: &str = "key_set";

/// A table reference with an optional alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    name: String,
    alias: Option<String>,
}

impl TableRef {
    /// Reference a table by name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    /// Reference a table under an alias.
    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: Some(alias.into()),
        }
    }

    /// The name columns must be qualified with: the alias if present,
    /// otherwise the table name.
    #[must_use]
    pub fn effective(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    fn to_sql(&self, dialect: Dialect) -> String {
        match &self.alias {
            Some(alias) => format!(
                "{} AS {}",
                dialect.quote_identifier(&self.name),
                dialect.quote_identifier(alias)
            ),
            None => dialect.quote_identifier(&self.name),
        }
    }
}

/// A column resolved into a concrete query's column space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// Qualifying table name or alias.
    pub table: Option<String>,
    /// Column name.
    pub name: String,
}

impl ColumnRef {
    /// An unqualified column.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: None,
            name: name.into(),
        }
    }

    /// A table-qualified column.
    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            name: name.into(),
        }
    }

    fn to_sql(&self, dialect: Dialect) -> String {
        match &self.table {
            Some(table) => format!(
                "{}.{}",
                dialect.quote_identifier(table),
                dialect.quote_identifier(&self.name)
            ),
            None => dialect.quote_identifier(&self.name),
        }
    }
}

/// The single in-set predicate of a template.
#[derive(Debug, Clone)]
struct KeySet {
    columns: Vec<ColumnRef>,
}

/// A rendered, executable statement.
#[derive(Debug, Clone)]
pub struct Statement {
    /// SQL text with dialect-specific placeholders.
    pub sql: String,
    /// Bound parameter values, in placeholder order.
    pub params: Vec<Value>,
}

/// A SELECT query template.
#[derive(Debug, Clone)]
pub struct Select {
    table: TableRef,
    columns: Vec<ColumnRef>,
    filter: Option<Expr>,
    key_set: Option<KeySet>,
    order_by: Vec<OrderBy>,
    limit: Option<Limit>,
    offset: Option<Offset>,
}

impl Select {
    /// Start a query against a table.
    pub fn table(name: impl Into<String>) -> Self {
        Self::from_table(TableRef::new(name))
    }

    /// Start a query against an aliased table.
    pub fn table_as(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::from_table(TableRef::aliased(name, alias))
    }

    fn from_table(table: TableRef) -> Self {
        Self {
            table,
            columns: Vec::new(),
            filter: None,
            key_set: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Select a column (resolved into this query's column space).
    #[must_use]
    pub fn column(mut self, name: &str) -> Self {
        let column = self.adapt(name);
        self.columns.push(column);
        self
    }

    /// Select several columns.
    #[must_use]
    pub fn columns(mut self, names: &[&str]) -> Self {
        for name in names {
            let column = self.adapt(name);
            self.columns.push(column);
        }
        self
    }

    /// Add a filter predicate; multiple filters AND together.
    #[must_use]
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = Some(match self.filter {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    /// Add an ORDER BY clause.
    #[must_use]
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    /// Set LIMIT.
    #[must_use]
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(Limit(n));
        self
    }

    /// Set OFFSET.
    #[must_use]
    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(Offset(n));
        self
    }

    /// Resolve a bare column name into this query's column space,
    /// qualifying it with the table alias when one is in effect.
    #[must_use]
    pub fn adapt(&self, name: &str) -> ColumnRef {
        ColumnRef::qualified(self.table.effective(), name)
    }

    /// Add the named columns to the projection unless already selected.
    ///
    /// An empty projection renders as `SELECT *`, which already includes
    /// every column, so it is left untouched.
    pub fn ensure_columns(&mut self, names: &[&str]) {
        if self.columns.is_empty() {
            return;
        }
        for name in names {
            let column = self.adapt(name);
            if !self.columns.contains(&column) {
                self.columns.push(column);
            }
        }
    }

    /// Attach the key-set predicate over the named columns.
    ///
    /// A template carries exactly one such predicate; attaching a second
    /// is a contract violation.
    pub fn with_key_set(mut self, names: &[&str]) -> Result<Self> {
        if self.key_set.is_some() {
            return Err(Error::query(
                QueryErrorKind::DuplicateKeySet,
                format!("template already has a '{KEY_SET_PLACEHOLDER}' predicate"),
            ));
        }
        let columns = names.iter().map(|name| self.adapt(name)).collect();
        self.key_set = Some(KeySet { columns });
        Ok(self)
    }

    /// True if a key-set predicate is attached.
    #[must_use]
    pub fn has_key_set(&self) -> bool {
        self.key_set.is_some()
    }

    /// The key-set predicate's columns, if attached.
    #[must_use]
    pub fn key_set_columns(&self) -> Option<&[ColumnRef]> {
        self.key_set.as_ref().map(|ks| ks.columns.as_slice())
    }

    /// The selected columns (empty means `SELECT *`).
    #[must_use]
    pub fn selected(&self) -> &[ColumnRef] {
        &self.columns
    }

    /// The table this query selects from.
    #[must_use]
    pub fn table_ref(&self) -> &TableRef {
        &self.table
    }

    /// Render the template with a key binding.
    ///
    /// Side-effect-free: the same template renders any number of times
    /// with different bindings. The binding must be non-empty and each
    /// tuple's arity must match the predicate's column count.
    pub fn render(&self, dialect: Dialect, keys: &[KeyTuple]) -> Result<Statement> {
        let Some(key_set) = &self.key_set else {
            return Err(Error::query(
                QueryErrorKind::MissingKeySet,
                format!("template has no '{KEY_SET_PLACEHOLDER}' predicate to bind"),
            ));
        };
        if keys.is_empty() {
            return Err(Error::query(
                QueryErrorKind::EmptyBinding,
                format!("'{KEY_SET_PLACEHOLDER}' binding is empty"),
            ));
        }
        let arity = key_set.columns.len();
        if let Some(bad) = keys.iter().find(|key| key.len() != arity) {
            return Err(Error::query(
                QueryErrorKind::KeyArity,
                format!(
                    "bound key has {} component(s), predicate matches {} column(s)",
                    bad.len(),
                    arity
                ),
            ));
        }

        let mut params = Vec::new();
        let mut sql = String::from("SELECT ");
        if self.columns.is_empty() {
            sql.push('*');
        } else {
            let cols: Vec<String> = self.columns.iter().map(|c| c.to_sql(dialect)).collect();
            sql.push_str(&cols.join(", "));
        }
        sql.push_str(" FROM ");
        sql.push_str(&self.table.to_sql(dialect));

        sql.push_str(" WHERE ");
        if let Some(filter) = &self.filter {
            let filter_sql = filter.build(dialect, &mut params);
            sql.push('(');
            sql.push_str(&filter_sql);
            sql.push_str(") AND ");
        }
        sql.push_str(&key_set.render(dialect, keys, &mut params));

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            let orders: Vec<String> = self.order_by.iter().map(|o| o.to_sql(dialect)).collect();
            sql.push_str(&orders.join(", "));
        }
        if let Some(Limit(n)) = self.limit {
            sql.push_str(&format!(" LIMIT {n}"));
        }
        if let Some(Offset(n)) = self.offset {
            sql.push_str(&format!(" OFFSET {n}"));
        }

        tracing::trace!(sql = %sql, bound_keys = keys.len(), "rendered batch statement");
        Ok(Statement { sql, params })
    }
}

impl KeySet {
    /// Render the in-set predicate, flattening key tuples into `params`.
    ///
    /// Single-column sets render `col IN ($1, $2)`; composite sets render
    /// the row-value form `(a, b) IN (($1, $2), ($3, $4))`.
    fn render(&self, dialect: Dialect, keys: &[KeyTuple], params: &mut Vec<Value>) -> String {
        let columns: Vec<String> = self.columns.iter().map(|c| c.to_sql(dialect)).collect();
        let lhs = if columns.len() == 1 {
            columns[0].clone()
        } else {
            format!("({})", columns.join(", "))
        };

        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            let mut holes = Vec::with_capacity(key.len());
            for value in key.values() {
                params.push(value.clone());
                holes.push(dialect.placeholder(params.len()));
            }
            if key.len() == 1 {
                entries.push(holes.remove(0));
            } else {
                entries.push(format!("({})", holes.join(", ")));
            }
        }
        format!("{lhs} IN ({})", entries.join(", "))
    }
}
