//! Error types for relationship loading.

use std::fmt;

/// Convenience alias used across all selectin crates.
pub type Result<T> = std::result::Result<T, Error>;

/// The primary error type for loading operations.
#[derive(Debug)]
pub enum Error {
    /// A record is missing a key column required by the relationship's
    /// topology. Raised during partitioning, or when re-keying a fetched
    /// row; fatal to the current load call.
    IncompleteRecord(IncompleteRecordError),

    /// Query template construction or rendering contract violations.
    Query(QueryError),

    /// Execution failure reported by the executor. Propagated as-is;
    /// batches already populated stay populated, nothing is retried.
    Execution(ExecutionError),

    /// Custom error with message.
    Custom(String),
}

/// Which side of the fetch a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSide {
    /// A caller-supplied parent record.
    Parent,
    /// A row returned by query execution.
    Fetched,
}

/// A record lacked a column the relationship's key lists require.
#[derive(Debug)]
pub struct IncompleteRecordError {
    /// The relationship being loaded.
    pub relation: String,
    /// The column that was absent from the record.
    pub column: String,
    /// Which side of the fetch the record came from.
    pub side: RecordSide,
}

/// Query template contract violations.
#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// A key-set predicate was attached to a template that already has one.
    DuplicateKeySet,
    /// A template was rendered without a key-set predicate.
    MissingKeySet,
    /// A template was rendered with an empty key binding.
    EmptyBinding,
    /// A bound key tuple does not match the predicate's column count.
    KeyArity,
    /// The record set handed to the driver does not match the prepared one.
    StateMismatch,
}

/// Opaque failure from the execution layer.
#[derive(Debug)]
pub struct ExecutionError {
    pub message: String,
    /// The statement being executed, if the executor knows it.
    pub sql: Option<String>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Build an [`Error::IncompleteRecord`].
    #[must_use]
    pub fn incomplete_record(
        relation: impl Into<String>,
        column: impl Into<String>,
        side: RecordSide,
    ) -> Self {
        Error::IncompleteRecord(IncompleteRecordError {
            relation: relation.into(),
            column: column.into(),
            side,
        })
    }

    /// Build an [`Error::Query`].
    #[must_use]
    pub fn query(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Error::Query(QueryError {
            kind,
            message: message.into(),
        })
    }

    /// Build an [`Error::Execution`] from a bare message.
    #[must_use]
    pub fn execution(message: impl Into<String>) -> Self {
        Error::Execution(ExecutionError {
            message: message.into(),
            sql: None,
            source: None,
        })
    }
}

impl ExecutionError {
    /// Attach the statement text that failed.
    #[must_use]
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    /// Attach the underlying driver error.
    #[must_use]
    pub fn with_source(mut self, source: Box<dyn std::error::Error + Send + Sync>) -> Self {
        self.source = Some(source);
        self
    }
}

impl fmt::Display for RecordSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordSide::Parent => write!(f, "parent record"),
            RecordSide::Fetched => write!(f, "fetched row"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IncompleteRecord(e) => write!(
                f,
                "Incomplete record: {} is missing column '{}' required by relationship '{}'",
                e.side, e.column, e.relation
            ),
            Error::Query(e) => write!(f, "Query error: {}", e.message),
            Error::Execution(e) => {
                if let Some(sql) = &e.sql {
                    write!(f, "Execution error: {} (statement: {})", e.message, sql)
                } else {
                    write!(f, "Execution error: {}", e.message)
                }
            }
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Execution(e) => e
                .source
                .as_deref()
                .map(|s| s as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}
