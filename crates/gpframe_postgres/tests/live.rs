//! Tests against a running database.
//!
//! Skipped unless `GPFRAME_TEST_CONN` holds a connection string, e.g.
//! `GPFRAME_TEST_CONN=postgres://gpadmin@localhost:5432/gpadmin`.

use gpframe_core::dataframe::join::{JoinColumn, JoinSpec};
use gpframe_core::expr::function_expr::aggregate;
use gpframe_core::expr::star;
use gpframe_core::order::OrderKey;
use gpframe_core::{Database, Gateway};
use gpframe_postgres::ConnectionConfig;
use serde_json::json;

fn connect() -> Option<Database> {
    let conn = std::env::var("GPFRAME_TEST_CONN").ok()?;
    logutil::init_test();
    let conf = ConnectionConfig::parse(&conn).unwrap();
    Some(gpframe_postgres::connect(&conf).unwrap())
}

#[test]
fn filter_rows() {
    let Some(db) = connect() else { return };
    let rows = db
        .create_dataframe_from_rows(vec![vec![1], vec![2], vec![3], vec![2]], &["id"])
        .unwrap();
    let filtered = rows.filter(|t| t.col("id").eq(2)).unwrap();

    let fetched = filtered.fetch().unwrap();
    assert_eq!(2, fetched.len());
    assert!(fetched.iter().all(|r| r.get("id") == Some(&json!(2))));
}

#[test]
fn join_on_same_column_name() {
    let Some(db) = connect() else { return };
    let t1 = db
        .create_dataframe_from_rows(vec![vec![1], vec![2], vec![3]], &["id"])
        .unwrap();
    let t2 = db
        .create_dataframe_from_rows(vec![vec![1], vec![2], vec![3]], &["id"])
        .unwrap();

    let joined = t1
        .join(
            &t2,
            JoinSpec::new()
                .on(|s, o| s.col("id").eq(o.col("id")))
                .self_columns(["id"])
                .other_columns([JoinColumn::new("id").rename("other_id")]),
        )
        .unwrap();
    assert_eq!(3, joined.fetch().unwrap().len());

    let unrenamed = t1
        .join(&t2, JoinSpec::new().on(|s, o| s.col("id").eq(o.col("id"))))
        .unwrap();
    let err = unrenamed.fetch().unwrap_err();
    assert!(err.to_string().contains("Duplicate column name found: id"), "{err}");
}

#[test]
fn self_join() {
    let Some(db) = connect() else { return };
    let t = db
        .create_dataframe_from_rows(vec![vec![1], vec![2]], &["id"])
        .unwrap();
    let joined = t
        .join(
            &t,
            JoinSpec::new()
                .on(|s, o| s.col("id").eq(o.col("id")))
                .other_columns([JoinColumn::new("id").rename("other_id")]),
        )
        .unwrap();
    assert_eq!(2, joined.fetch().unwrap().len());
}

#[test]
fn grouping_set_union() {
    let Some(db) = connect() else { return };
    let t = db
        .create_dataframe_from_rows(
            vec![vec![1, 10], vec![1, 20], vec![2, 10]],
            &["a", "b"],
        )
        .unwrap();
    let count = aggregate("count");

    let by_a = t
        .group_by(&["a"])
        .apply(|_| count.call([star()]), false, Some("count"))
        .unwrap()
        .fetch()
        .unwrap();
    let by_b = t
        .group_by(&["b"])
        .apply(|_| count.call([star()]), false, Some("count"))
        .unwrap()
        .fetch()
        .unwrap();
    let both = t
        .group_by(&["a"])
        .union(&t.group_by(&["b"]))
        .unwrap()
        .apply(|_| count.call([star()]), false, Some("count"))
        .unwrap()
        .fetch()
        .unwrap();

    assert_eq!(by_a.len() + by_b.len(), both.len());
}

#[test]
fn save_as_round_trip() {
    let Some(db) = connect() else { return };
    let rows = db
        .create_dataframe_from_rows(vec![vec![3], vec![1], vec![2]], &["id"])
        .unwrap();
    let saved = rows.save_as("gpframe_round_trip", &["id"], true).unwrap();

    let ordered = |df: &gpframe_core::DataFrame| {
        df.order_by(OrderKey::new("id").ascending(true))
            .unwrap()
            .head(10)
            .fetch()
            .unwrap()
            .to_vec()
    };
    assert_eq!(ordered(&rows), ordered(&saved));

    let reloaded = db.create_dataframe_from_table("gpframe_round_trip");
    assert_eq!(ordered(&rows), ordered(&reloaded));

    let names = reloaded.column_names().unwrap().fetch().unwrap();
    assert_eq!(Some(&json!("id")), names[0].get("column_name"));
}

#[test]
fn parameters_bind_as_text() {
    let Some(db) = connect() else { return };
    let rows = db
        .execute("SELECT ($1::int + 1)::text", &["41".to_string()], true)
        .unwrap()
        .unwrap();
    assert_eq!(vec![vec![Some("42".to_string())]], rows);
}

#[test]
fn failed_transaction_rolls_back() {
    let Some(db) = connect() else { return };
    db.execute_statement("CREATE TEMP TABLE gpframe_tx_test (id int)")
        .unwrap();

    db.transaction(|db| {
        db.execute_statement("INSERT INTO gpframe_tx_test VALUES (1)")?;
        db.execute_statement("SELECT * FROM gpframe_missing_table")
    })
    .unwrap_err();

    let count = db
        .query_rows("SELECT count(*)::text FROM gpframe_tx_test")
        .unwrap();
    assert_eq!(Some("0".to_string()), count[0][0]);
}
