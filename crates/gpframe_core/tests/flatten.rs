use std::sync::Arc;

use gpframe_core::dataframe::join::JoinSpec;
use gpframe_core::testutil::RecordingGateway;
use gpframe_core::{DataFrame, Database};

fn db() -> Database {
    Database::new(Arc::new(RecordingGateway::new()))
}

fn position(query: &str, name: &str) -> usize {
    query
        .find(&format!("{name} AS ("))
        .unwrap_or_else(|| panic!("missing cte {name} in {query}"))
}

#[test]
fn dependencies_precede_dependents() {
    let db = db();
    let rows = db
        .create_dataframe_from_rows(vec![vec![1], vec![2], vec![3]], &["id"])
        .unwrap();
    let filtered = rows.filter(|t| t.col("id").gt(1)).unwrap();
    let projected = filtered.select(&["id"]).unwrap();
    let limited = projected.slice(..2).unwrap();

    let query = limited.build_full_query();
    assert!(query.starts_with("WITH "), "{query}");
    assert!(query.ends_with(limited.query()), "{query}");

    let p_rows = position(&query, rows.name());
    let p_filtered = position(&query, filtered.name());
    let p_projected = position(&query, projected.name());
    assert!(p_rows < p_filtered);
    assert!(p_filtered < p_projected);
    assert!(!query.contains(&format!("{} AS (", limited.name())));
}

#[test]
fn catalog_tables_are_not_inlined() {
    let db = db();
    let t = db.create_dataframe_from_table("t");
    let u = db.create_dataframe_from_table("u");

    let joined = t
        .join(&u, JoinSpec::new().on(|s, o| s.col("id").eq(o.col("id"))))
        .unwrap();
    let filtered = joined.filter(|j| j.col("id").eq(1)).unwrap();

    let query = filtered.build_full_query();
    assert!(!query.contains("TABLE \"t\""), "{query}");
    assert!(!query.contains("TABLE \"u\""), "{query}");
    assert_eq!(1, query.matches(" AS (").count(), "{query}");
}

#[test]
fn diamond_shares_ancestor() {
    let db = db();
    let base = db
        .create_dataframe_from_rows(vec![vec![1], vec![2]], &["id"])
        .unwrap();
    let left = base.filter(|t| t.col("id").eq(1)).unwrap();
    let right = base.filter(|t| t.col("id").eq(2)).unwrap();
    let both = left.union(&right, true);

    let lineage: Vec<String> = both.lineage().iter().map(|df| df.name().to_string()).collect();
    assert_eq!(4, lineage.len());
    assert_eq!(base.name(), lineage[0]);
    assert_eq!(both.name(), lineage[3]);

    let query = both.build_full_query();
    assert_eq!(1, query.matches(&format!("{} AS (", base.name())).count());
}

#[test]
fn saved_table_is_a_leaf() {
    let gateway = Arc::new(RecordingGateway::new());
    let db = Database::new(gateway.clone());
    let rows = db
        .create_dataframe_from_rows(vec![vec![1], vec![2]], &["id"])
        .unwrap();

    let saved = rows.save_as("t2", &["id"], false).unwrap();
    let derived = saved.filter(|t| t.col("id").eq(1)).unwrap();

    assert_eq!("SELECT * FROM t2 WHERE (t2.id = 1)", derived.build_full_query());
    assert_eq!(1, gateway.statements().len());
}

#[test]
fn shared_nodes_are_not_copied() {
    let t = DataFrame::new("SELECT 1 AS id", Vec::new(), None, None);
    let a = t.filter(|t| t.col("id").eq(1)).unwrap();
    let b = t.filter(|t| t.col("id").eq(1)).unwrap();

    assert_eq!(a.parents()[0].name(), b.parents()[0].name());
    assert_eq!(t.name(), a.parents()[0].name());
}
