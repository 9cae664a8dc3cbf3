//! Scenarios against a scripted gateway. The gateway returns the rows a
//! database would for each statement, so these check statement generation
//! and decoding end to end.

use std::sync::Arc;

use gpframe_core::dataframe::join::{JoinColumn, JoinSpec};
use gpframe_core::expr::function_expr::aggregate;
use gpframe_core::expr::{null, star};
use gpframe_core::order::OrderKey;
use gpframe_core::testutil::RecordingGateway;
use gpframe_core::{Database, Selector};
use serde_json::json;

fn setup() -> (Arc<RecordingGateway>, Database) {
    logutil::init_test();
    let gateway = Arc::new(RecordingGateway::new());
    let db = Database::new(gateway.clone());
    (gateway, db)
}

#[test]
fn filter_rows() {
    let (gateway, db) = setup();
    let rows = db
        .create_dataframe_from_rows(vec![vec![1], vec![2], vec![3], vec![2]], &["id"])
        .unwrap();
    let filtered = rows
        .get(Selector::predicate(|t| t.col("id").eq(2)))
        .unwrap()
        .into_dataframe()
        .unwrap();

    gateway.push_json_rows([r#"{"id": 2}"#, r#"{"id": 2}"#]);
    let fetched = filtered.fetch().unwrap();
    assert_eq!(2, fetched.len());
    assert!(fetched.iter().all(|r| r.get("id") == Some(&json!(2))));

    let stmt = gateway.last_statement().unwrap();
    assert!(stmt.starts_with("WITH "), "{stmt}");
    assert!(stmt.contains(&format!(
        "{} AS (SELECT * FROM (VALUES (1), (2), (3), (2))",
        rows.name()
    )));
    assert!(stmt.contains(&format!("WHERE ({}.id = 2)", rows.name())));
}

#[test]
fn join_same_column_name() {
    let (gateway, db) = setup();
    let t1 = db
        .create_dataframe_from_rows(vec![vec![1], vec![2], vec![3]], &["id"])
        .unwrap();
    let t2 = db
        .create_dataframe_from_rows(vec![vec![1], vec![2], vec![3]], &["id"])
        .unwrap();

    let joined = t1
        .inner_join(
            &t2,
            JoinSpec::new()
                .on(|s, o| s.col("id").eq(o.col("id")))
                .self_columns(["id"])
                .other_columns([JoinColumn::new("id").rename("other_id")]),
        )
        .unwrap();

    gateway.push_json_rows([
        r#"{"id": 1, "other_id": 1}"#,
        r#"{"id": 2, "other_id": 2}"#,
        r#"{"id": 3, "other_id": 3}"#,
    ]);
    assert_eq!(3, joined.fetch().unwrap().len());
}

#[test]
fn join_without_rename_is_detected() {
    let (gateway, db) = setup();
    let t1 = db.create_dataframe_from_table("t1");
    let t2 = db.create_dataframe_from_table("t2");
    let joined = t1
        .inner_join(&t2, JoinSpec::new().on(|s, o| s.col("id").eq(o.col("id"))))
        .unwrap();

    gateway.push_json_rows([r#"{"id": 1, "id": 1}"#]);
    let err = joined.fetch().unwrap_err();
    assert!(err.to_string().contains("Duplicate column name found: id"), "{err}");
}

#[test]
fn grouping_set_union() {
    let (gateway, db) = setup();
    let t = db
        .create_dataframe_from_rows(
            vec![vec![1, 10], vec![1, 20], vec![2, 10]],
            &["a", "b"],
        )
        .unwrap();
    let count = aggregate("count");

    let by_a = t.group_by(&["a"]);
    let by_b = t.group_by(&["b"]);
    let df = by_a
        .union(&by_b)
        .unwrap()
        .apply(|_| count.call([star()]), false, Some("count"))
        .unwrap();

    assert!(df.query().ends_with(&format!(
        "GROUP BY GROUPING SETS (({0}.a), ({0}.b))",
        t.name()
    )));

    // Two groups for a, two for b.
    gateway.push_json_rows([
        r#"{"a": 1, "b": null, "count": 2}"#,
        r#"{"a": 2, "b": null, "count": 1}"#,
        r#"{"a": null, "b": 10, "count": 2}"#,
        r#"{"a": null, "b": 20, "count": 1}"#,
    ]);
    let rows = df.fetch().unwrap();
    assert_eq!(4, rows.len());
    assert_eq!(vec!["a", "b", "count"], rows[0].column_names().collect::<Vec<_>>());
}

#[test]
fn ordered_head() {
    let (gateway, db) = setup();
    let t = db.create_dataframe_from_table("t");
    let top = t
        .order_by(OrderKey::new("id").ascending(false).nulls_first(false))
        .unwrap()
        .head(2);

    gateway.push_json_rows([r#"{"id": 3}"#, r#"{"id": 2}"#]);
    let rows = top.fetch().unwrap();
    assert_eq!(Some(&json!(3)), rows[0].get("id"));

    let stmt = gateway.last_statement().unwrap();
    assert!(
        stmt.contains("SELECT * FROM t ORDER BY t.id DESC NULLS LAST LIMIT 2"),
        "{stmt}"
    );
}

#[test]
fn null_comparison_filter() {
    let (_, db) = setup();
    let t = db.create_dataframe_from_table("t");
    let df = t.filter(|t| t.col("id").eq(null())).unwrap();
    assert_eq!("SELECT * FROM t WHERE (t.id is NULL)", df.query());
}

#[test]
fn print_sql_setting() {
    let (gateway, db) = setup();
    db.set_setting("print_sql", "on").unwrap();
    let t = db.create_dataframe_from_table("t");
    t.fetch().unwrap();
    assert_eq!(1, gateway.statements().len());
}
