//! Property-style checks on the loader's population contract.

mod common;

use common::{MockExecutor, article, block_on, comment, int_key, user};
use selectin::{
    Cx, LoaderConfig, Outcome, Record, Related, Relation, Select, SelectInLoader, Value,
};

fn load(
    relation: Relation,
    chunk_size: usize,
    parents: &mut [Record],
    executor: &MockExecutor,
    base: Select,
) {
    let loader = SelectInLoader::with_config(relation, LoaderConfig { chunk_size });
    let prepared = loader.prepare(parents).expect("prepare");
    let template = prepared.build_query(base).expect("shape template");

    let cx = Cx::for_testing();
    block_on(async {
        let rows = prepared
            .fetch_and_populate(executor, &template, parents)
            .expect("start batch load");
        match rows.drive(&cx).await {
            Outcome::Ok(_) => {}
            other => panic!("unexpected outcome: {other:?}"),
        }
    });
}

fn author_relation() -> Relation {
    Relation::many_to_one("author", "users", &["author_id"], &["id"])
}

fn comments_relation() -> Relation {
    Relation::one_to_many("comments", "comments", &["id"], &["article_id"])
}

/// Every parent ends up with its relationship slot set, no matter whether
/// it matched, missed, or carried a NULL key.
#[test]
fn test_every_parent_is_populated() {
    let mut parents = vec![
        article(1, Some(10)),  // matches
        article(2, Some(99)),  // no such user
        article(3, None),      // NULL key
        article(4, Some(10)),  // shares a key
    ];
    let executor = MockExecutor::new(vec![user(10, "a")]);
    load(
        author_relation(),
        2,
        &mut parents,
        &executor,
        Select::table("users").columns(&["id", "name"]),
    );

    for parent in &parents {
        assert!(parent.related("author").is_some(), "unpopulated parent");
    }
}

/// A NULL-key parent never reaches any executed query's binding.
#[test]
fn test_null_keys_are_never_bound() {
    let mut parents = vec![article(1, Some(10)), article(2, None), article(3, Some(20))];
    let executor = MockExecutor::new(vec![user(10, "a"), user(20, "b")]);
    load(
        author_relation(),
        1,
        &mut parents,
        &executor,
        Select::table("users").columns(&["id", "name"]),
    );

    for keys in executor.calls() {
        assert!(keys.iter().all(|key| !key.has_null()));
    }
    assert_eq!(parents[1].related("author"), Some(&Related::One(None)));
}

/// The final populated state is identical for any chunk size; only the
/// number of executed queries differs.
#[test]
fn test_chunk_size_does_not_change_results() {
    let rows: Vec<Record> = vec![
        comment(100, 1, "a"),
        comment(101, 1, "b"),
        comment(102, 3, "c"),
        comment(103, 4, "d"),
    ];
    let parent_set =
        || -> Vec<Record> { (1..=5).map(|id| Record::new().with("id", id)).collect() };

    let mut reference = parent_set();
    let reference_executor = MockExecutor::new(rows.clone());
    load(
        comments_relation(),
        1,
        &mut reference,
        &reference_executor,
        Select::table("comments").columns(&["id", "article_id", "body"]),
    );
    assert_eq!(reference_executor.call_count(), 5);

    for (chunk_size, expected_queries) in [(2, 3), (3, 2), (100, 1)] {
        let mut parents = parent_set();
        let executor = MockExecutor::new(rows.clone());
        load(
            comments_relation(),
            chunk_size,
            &mut parents,
            &executor,
            Select::table("comments").columns(&["id", "article_id", "body"]),
        );
        assert_eq!(parents, reference, "chunk size {chunk_size} diverged");
        assert_eq!(executor.call_count(), expected_queries);
    }
}

/// Parents sharing a key receive value-identical results.
#[test]
fn test_shared_keys_get_identical_results() {
    let mut parents = vec![article(1, Some(10)), article(2, Some(10)), article(3, Some(10))];
    let executor = MockExecutor::new(vec![user(10, "shared")]);
    load(
        author_relation(),
        10,
        &mut parents,
        &executor,
        Select::table("users").columns(&["id", "name"]),
    );

    let first = parents[0].related("author").unwrap().clone();
    for parent in &parents[1..] {
        assert_eq!(parent.related("author"), Some(&first));
    }
    // One group, one bound key.
    assert_eq!(executor.calls(), vec![vec![int_key(&[10])]]);
}

/// Singular slots never hold a collection; plural slots always hold one.
#[test]
fn test_cardinality_shapes_the_slot() {
    let mut parents = vec![article(1, Some(10)), article(2, Some(99))];
    let executor = MockExecutor::new(vec![user(10, "a")]);
    load(
        author_relation(),
        10,
        &mut parents,
        &executor,
        Select::table("users").columns(&["id", "name"]),
    );
    for parent in &parents {
        assert!(matches!(parent.related("author"), Some(Related::One(_))));
    }

    let mut parents = vec![Record::new().with("id", 1_i64), Record::new().with("id", 2_i64)];
    let executor = MockExecutor::new(vec![comment(100, 1, "a")]);
    load(
        comments_relation(),
        10,
        &mut parents,
        &executor,
        Select::table("comments").columns(&["id", "article_id", "body"]),
    );
    for parent in &parents {
        assert!(matches!(parent.related("comments"), Some(Related::Many(_))));
    }
}

/// Composite keys group, bind, and re-key positionally.
#[test]
fn test_composite_keys_match_positionally() {
    let relation = Relation::many_to_one(
        "line_item",
        "line_items",
        &["order_id", "line_no"],
        &["order_id", "no"],
    );
    let mut parents = vec![
        Record::new().with("id", 1_i64).with("order_id", 7_i64).with("line_no", 1_i64),
        Record::new().with("id", 2_i64).with("order_id", 7_i64).with("line_no", 2_i64),
        // Same component values in the other order: a different key.
        Record::new().with("id", 3_i64).with("order_id", 2_i64).with("line_no", 7_i64),
    ];
    let executor = MockExecutor::new(vec![
        Record::new().with("order_id", 7_i64).with("no", 1_i64).with("sku", "A"),
        Record::new().with("order_id", 7_i64).with("no", 2_i64).with("sku", "B"),
    ]);
    load(
        relation,
        10,
        &mut parents,
        &executor,
        Select::table("line_items").columns(&["order_id", "no", "sku"]),
    );

    assert_eq!(
        parents[0].related("line_item").unwrap().as_one().unwrap().get("sku"),
        Some(&Value::Text("A".to_string()))
    );
    assert_eq!(
        parents[1].related("line_item").unwrap().as_one().unwrap().get("sku"),
        Some(&Value::Text("B".to_string()))
    );
    assert_eq!(parents[2].related("line_item"), Some(&Related::One(None)));

    let calls = executor.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].len(), 3);
    assert!(calls[0].contains(&int_key(&[7, 1])));
    assert!(calls[0].contains(&int_key(&[2, 7])));
}

/// A singular parent-lookup edge with several matching rows keeps the
/// first match instead of failing (lenient policy).
#[test]
fn test_singular_multi_match_keeps_first_row() {
    let relation = Relation::one_to_one("profile", "profiles", &["id"], &["user_id"]);
    let mut parents = vec![user(1, "u")];
    let executor = MockExecutor::new(vec![
        Record::new().with("id", 50_i64).with("user_id", 1_i64),
        Record::new().with("id", 51_i64).with("user_id", 1_i64),
    ]);
    load(
        relation,
        10,
        &mut parents,
        &executor,
        Select::table("profiles").columns(&["id", "user_id"]),
    );

    let related = parents[0].related("profile").unwrap();
    assert_eq!(related.as_one().unwrap().get("id"), Some(&Value::Int(50)));
}

/// Duplicate parents (same primary key twice) each get the collection.
#[test]
fn test_duplicate_parents_each_get_their_children() {
    let mut parents = vec![Record::new().with("id", 1_i64), Record::new().with("id", 1_i64)];
    let executor = MockExecutor::new(vec![comment(100, 1, "a")]);
    load(
        comments_relation(),
        10,
        &mut parents,
        &executor,
        Select::table("comments").columns(&["id", "article_id", "body"]),
    );

    assert_eq!(parents[0].related("comments"), parents[1].related("comments"));
    // The duplicated key binds once.
    assert_eq!(executor.calls(), vec![vec![int_key(&[1])]]);
}
