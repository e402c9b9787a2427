//! Composite key tuples.

use crate::value::Value;
use std::fmt;

/// An ordered tuple of scalar values extracted from a record via a fixed
/// column list.
///
/// Key tuples drive grouping and batch matching: two tuples are equal iff
/// all positions are equal by value. A single-column key is a one-element
/// tuple; composite keys are just longer tuples. `Value`'s total order
/// makes key tuples usable as `BTreeMap` keys, which is what gives batches
/// their deterministic, sorted key order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyTuple(Vec<Value>);

impl KeyTuple {
    /// Create a key tuple from its component values.
    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// The component values, in column-list order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the tuple has no components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if any component is NULL.
    ///
    /// A key with a NULL component can never match a row, so partitioning
    /// routes such parents straight to an empty result instead of binding
    /// them into a query.
    #[must_use]
    pub fn has_null(&self) -> bool {
        self.0.iter().any(Value::is_null)
    }
}

impl From<Vec<Value>> for KeyTuple {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl fmt::Display for KeyTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value:?}")?;
        }
        write!(f, ")")
    }
}
