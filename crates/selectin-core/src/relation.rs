//! Relationship descriptors.
//!
//! Relationships are static metadata describing one edge between a source
//! entity and a target entity. The loader never inspects schemas at
//! runtime: everything it needs — which side owns the foreign key, which
//! columns participate, whether the slot holds one record or a collection —
//! is carried by a [`Relation`] supplied by the caller.

/// Whether a relationship slot holds one related record or a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// The slot holds a single record or NULL.
    One,
    /// The slot holds a collection, possibly empty.
    Many,
}

/// Which side of the edge stores the foreign key columns.
///
/// Exactly two topologies exist, and each carries its own column lists, so
/// there is no third, half-configured shape to guard against at runtime.
/// Both lists inside a variant are equal in length and positionally
/// correspond (composite keys are supported by listing several columns).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// The source row stores the foreign key, pointing at the target's
    /// primary key (the many-to-one shape).
    ///
    /// Example: `article.author_id` referencing `user.id`. Loading
    /// `article.author` extracts `foreign_key` tuples from the parents and
    /// matches them against `target_pk` on fetched rows.
    ChildLookup {
        /// Foreign key columns on the source row.
        foreign_key: &'static [&'static str],
        /// Primary key columns on the target row.
        target_pk: &'static [&'static str],
    },

    /// The target row stores the foreign key, pointing back at the source's
    /// primary key (the one-to-many / many-to-many shape).
    ///
    /// Example: `comment.article_id` referencing `article.id`. Loading
    /// `article.comments` extracts `source_pk` tuples from the parents and
    /// matches them against `foreign_key` on fetched rows. For a
    /// many-to-many edge the foreign key columns live on the joined
    /// projection the base query selects from.
    ParentLookup {
        /// Primary key columns on the source row.
        source_pk: &'static [&'static str],
        /// Foreign key columns on the target row.
        foreign_key: &'static [&'static str],
    },
}

/// Static metadata describing one relationship edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    /// Name of the relationship; also the slot name written on parents.
    pub name: &'static str,

    /// The target entity's table name (informational: the base query is
    /// built externally and already scoped to the target).
    pub target_table: &'static str,

    /// Whether the slot holds one record or a collection.
    pub cardinality: Cardinality,

    /// Which side owns the foreign key, and the columns involved.
    pub topology: Topology,
}

impl Relation {
    /// Create a relationship descriptor.
    ///
    /// # Panics
    ///
    /// Panics if the topology's two column lists differ in length — the
    /// lists must positionally correspond.
    #[must_use]
    pub fn new(
        name: &'static str,
        target_table: &'static str,
        cardinality: Cardinality,
        topology: Topology,
    ) -> Self {
        let (left, right) = match topology {
            Topology::ChildLookup {
                foreign_key,
                target_pk,
            } => (foreign_key, target_pk),
            Topology::ParentLookup {
                source_pk,
                foreign_key,
            } => (source_pk, foreign_key),
        };
        assert_eq!(
            left.len(),
            right.len(),
            "relation {name:?}: key column lists must be positionally aligned"
        );
        assert!(
            !left.is_empty(),
            "relation {name:?}: key column lists must not be empty"
        );
        Self {
            name,
            target_table,
            cardinality,
            topology,
        }
    }

    /// A many-to-one edge: the source rows carry `foreign_key` referencing
    /// `target_pk`; the slot is singular.
    #[must_use]
    pub fn many_to_one(
        name: &'static str,
        target_table: &'static str,
        foreign_key: &'static [&'static str],
        target_pk: &'static [&'static str],
    ) -> Self {
        Self::new(
            name,
            target_table,
            Cardinality::One,
            Topology::ChildLookup {
                foreign_key,
                target_pk,
            },
        )
    }

    /// A one-to-one edge with the foreign key on the target row; the slot
    /// is singular.
    #[must_use]
    pub fn one_to_one(
        name: &'static str,
        target_table: &'static str,
        source_pk: &'static [&'static str],
        foreign_key: &'static [&'static str],
    ) -> Self {
        Self::new(
            name,
            target_table,
            Cardinality::One,
            Topology::ParentLookup {
                source_pk,
                foreign_key,
            },
        )
    }

    /// A one-to-many edge: the target rows carry `foreign_key` referencing
    /// `source_pk`; the slot is a collection.
    #[must_use]
    pub fn one_to_many(
        name: &'static str,
        target_table: &'static str,
        source_pk: &'static [&'static str],
        foreign_key: &'static [&'static str],
    ) -> Self {
        Self::new(
            name,
            target_table,
            Cardinality::Many,
            Topology::ParentLookup {
                source_pk,
                foreign_key,
            },
        )
    }

    /// A many-to-many edge seen from the source side. The base query is
    /// expected to join through the link table so the fetched projection
    /// carries `foreign_key` columns pointing back at `source_pk`.
    #[must_use]
    pub fn many_to_many(
        name: &'static str,
        target_table: &'static str,
        source_pk: &'static [&'static str],
        foreign_key: &'static [&'static str],
    ) -> Self {
        Self::new(
            name,
            target_table,
            Cardinality::Many,
            Topology::ParentLookup {
                source_pk,
                foreign_key,
            },
        )
    }

    /// The columns extracted from *parent* records during partitioning.
    #[must_use]
    pub fn key_columns(&self) -> &'static [&'static str] {
        match self.topology {
            Topology::ChildLookup { foreign_key, .. } => foreign_key,
            Topology::ParentLookup { source_pk, .. } => source_pk,
        }
    }

    /// The columns matched by the batch predicate, and used to re-key
    /// *fetched* rows back onto parents.
    #[must_use]
    pub fn match_columns(&self) -> &'static [&'static str] {
        match self.topology {
            Topology::ChildLookup { target_pk, .. } => target_pk,
            Topology::ParentLookup { foreign_key, .. } => foreign_key,
        }
    }

    /// True if the slot holds a collection.
    #[must_use]
    pub fn is_many(&self) -> bool {
        self.cardinality == Cardinality::Many
    }
}

/// Find a relationship by name in a descriptor slice.
#[must_use]
pub fn find_relation<'a>(relations: &'a [Relation], name: &str) -> Option<&'a Relation> {
    relations.iter().find(|r| r.name == name)
}

/// Supplies relationship descriptors by name.
///
/// Implemented for descriptor slices; schema registries can implement it to
/// resolve descriptors however they store them.
pub trait RelationSource {
    /// Look up the descriptor for a named relationship.
    fn relation(&self, name: &str) -> Option<&Relation>;
}

impl RelationSource for [Relation] {
    fn relation(&self, name: &str) -> Option<&Relation> {
        find_relation(self, name)
    }
}

impl RelationSource for Vec<Relation> {
    fn relation(&self, name: &str) -> Option<&Relation> {
        find_relation(self, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_many_to_one_columns() {
        let rel = Relation::many_to_one("author", "users", &["author_id"], &["id"]);
        assert_eq!(rel.cardinality, Cardinality::One);
        assert_eq!(rel.key_columns(), &["author_id"]);
        assert_eq!(rel.match_columns(), &["id"]);
        assert!(!rel.is_many());
    }

    #[test]
    fn test_one_to_many_columns() {
        let rel = Relation::one_to_many("comments", "comments", &["id"], &["article_id"]);
        assert_eq!(rel.cardinality, Cardinality::Many);
        assert_eq!(rel.key_columns(), &["id"]);
        assert_eq!(rel.match_columns(), &["article_id"]);
        assert!(rel.is_many());
    }

    #[test]
    fn test_composite_columns_align() {
        let rel = Relation::many_to_one(
            "line_item",
            "line_items",
            &["order_id", "line_no"],
            &["order_id", "no"],
        );
        assert_eq!(rel.key_columns().len(), 2);
        assert_eq!(rel.match_columns().len(), 2);
    }

    #[test]
    #[should_panic(expected = "positionally aligned")]
    fn test_misaligned_columns_panic() {
        let _ = Relation::many_to_one("author", "users", &["a", "b"], &["id"]);
    }

    #[test]
    #[should_panic(expected = "must not be empty")]
    fn test_empty_columns_panic() {
        let _ = Relation::one_to_many("comments", "comments", &[], &[]);
    }

    #[test]
    fn test_find_relation() {
        let relations = [
            Relation::many_to_one("author", "users", &["author_id"], &["id"]),
            Relation::one_to_many("comments", "comments", &["id"], &["article_id"]),
        ];
        assert_eq!(find_relation(&relations, "comments").unwrap().name, "comments");
        assert!(find_relation(&relations, "nope").is_none());
    }

    #[test]
    fn test_relation_source_for_slices() {
        let relations = vec![Relation::many_to_one("author", "users", &["author_id"], &["id"])];
        assert!(relations.relation("author").is_some());
        assert!(relations.as_slice().relation("nope").is_none());
    }
}
