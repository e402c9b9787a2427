//! Mutable row records with relationship slots.

use crate::key::KeyTuple;
use crate::value::Value;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

/// A mutable mapping from field name to scalar value, plus named
/// relationship slots.
///
/// Records are the dynamic rows this system operates on: parents are
/// supplied by the caller with their key columns already present, children
/// are produced by query execution. Loading a relationship writes a
/// [`Related`] value into the parent's slot named by the relationship.
///
/// Scalar fields and relationship slots live in separate namespaces, so a
/// relationship named like an existing column never clobbers the column.
/// Serialization flattens both into a single JSON object, the shape the
/// rows take on their way out to API callers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Value>,
    related: BTreeMap<String, Related>,
}

/// The loaded result occupying a relationship slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    /// Singular slot: one related record, or NULL.
    One(Option<Record>),
    /// Plural slot: zero or more related records.
    Many(Vec<Record>),
}

impl Related {
    /// Number of records in the slot.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Related::One(None) => 0,
            Related::One(Some(_)) => 1,
            Related::Many(records) => records.len(),
        }
    }

    /// True if the slot holds no record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// View a singular slot.
    #[must_use]
    pub fn as_one(&self) -> Option<&Record> {
        match self {
            Related::One(record) => record.as_ref(),
            Related::Many(_) => None,
        }
    }

    /// View a plural slot.
    #[must_use]
    pub fn as_many(&self) -> Option<&[Record]> {
        match self {
            Related::Many(records) => Some(records),
            Related::One(_) => None,
        }
    }
}

impl Record {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field assignment, mostly for fixtures and tests.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Get a field value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Set a field value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Check if a field exists (a NULL field still exists).
    #[must_use]
    pub fn contains_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Number of scalar fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the record has no scalar fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over (field name, value) pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Get a relationship slot by name.
    #[must_use]
    pub fn related(&self, name: &str) -> Option<&Related> {
        self.related.get(name)
    }

    /// Check if a relationship slot has been populated.
    #[must_use]
    pub fn has_related(&self, name: &str) -> bool {
        self.related.contains_key(name)
    }

    /// Write a relationship slot, replacing any previous result.
    pub fn set_related(&mut self, name: impl Into<String>, related: Related) {
        self.related.insert(name.into(), related);
    }

    /// Names of populated relationship slots, in name order.
    pub fn related_names(&self) -> impl Iterator<Item = &str> {
        self.related.keys().map(String::as_str)
    }

    /// Extract the key tuple for a column list.
    ///
    /// Returns `None` if any named column is absent from the record; a
    /// present-but-NULL column contributes `Value::Null` to the tuple.
    #[must_use]
    pub fn key_tuple(&self, columns: &[&str]) -> Option<KeyTuple> {
        let mut values = Vec::with_capacity(columns.len());
        for column in columns {
            values.push(self.fields.get(*column)?.clone());
        }
        Some(KeyTuple::new(values))
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + self.related.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        for (name, related) in &self.related {
            match related {
                Related::One(record) => map.serialize_entry(name, record)?,
                Related::Many(records) => map.serialize_entry(name, records)?,
            }
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, name: &str) -> Record {
        Record::new().with("id", id).with("name", name)
    }

    #[test]
    fn test_field_access() {
        let mut record = user(1, "Alice");
        assert_eq!(record.get("id"), Some(&Value::Int(1)));
        assert_eq!(record.get("missing"), None);
        assert!(record.contains_field("name"));

        record.set("age", 30_i64);
        assert_eq!(record.get("age"), Some(&Value::Int(30)));
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn test_null_field_exists() {
        let record = Record::new().with("parent_id", None::<i64>);
        assert!(record.contains_field("parent_id"));
        assert_eq!(record.get("parent_id"), Some(&Value::Null));
    }

    #[test]
    fn test_key_tuple_extraction() {
        let record = user(1, "Alice").with("tenant", "acme");
        assert_eq!(
            record.key_tuple(&["tenant", "id"]),
            Some(KeyTuple::new(vec![
                Value::Text("acme".to_string()),
                Value::Int(1)
            ]))
        );
        assert_eq!(record.key_tuple(&["tenant", "nope"]), None);
    }

    #[test]
    fn test_key_tuple_keeps_nulls() {
        let record = Record::new().with("a", 1_i64).with("b", None::<i64>);
        let key = record.key_tuple(&["a", "b"]).unwrap();
        assert!(key.has_null());
    }

    #[test]
    fn test_relationship_slots_are_separate_namespace() {
        let mut record = user(1, "Alice");
        record.set_related("name", Related::One(None));
        // The scalar column survives alongside the identically-named slot.
        assert_eq!(record.get("name"), Some(&Value::Text("Alice".to_string())));
        assert!(record.has_related("name"));
    }

    #[test]
    fn test_related_accessors() {
        let one = Related::One(Some(user(2, "Bob")));
        assert_eq!(one.len(), 1);
        assert_eq!(one.as_one().unwrap().get("id"), Some(&Value::Int(2)));
        assert!(one.as_many().is_none());

        let many = Related::Many(vec![user(2, "Bob"), user(3, "Eve")]);
        assert_eq!(many.len(), 2);
        assert!(many.as_one().is_none());

        assert!(Related::One(None).is_empty());
        assert!(Related::Many(vec![]).is_empty());
    }

    #[test]
    fn test_serialize_flattens_fields_and_slots() {
        let mut article = Record::new().with("id", 10_i64).with("title", "t");
        article.set_related("author", Related::One(Some(user(1, "Alice"))));
        article.set_related("tags", Related::Many(vec![Record::new().with("id", 7_i64)]));

        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": {"Int": 10},
                "title": {"Text": "t"},
                "author": {"id": {"Int": 1}, "name": {"Text": "Alice"}},
                "tags": [{"id": {"Int": 7}}],
            })
        );
    }

    #[test]
    fn test_serialize_empty_singular_slot_is_null() {
        let mut record = user(1, "Alice");
        record.set_related("author", Related::One(None));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["author"], serde_json::Value::Null);
    }
}
