//! Lazily evaluated relation nodes.
//!
//! A [`DataFrame`] wraps a single SQL fragment and the relations it is defined
//! in terms of. Operators never execute anything, they build new nodes on top
//! of existing ones. The full statement is only produced when rows are
//! requested (see `lineage`).

pub mod fetch;
pub mod join;
pub mod lineage;
pub mod selector;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use gpframe_error::{DbError, Result};
use parking_lot::Mutex;

use crate::database::Database;
use crate::expr::Expr;
use crate::expr::function_expr::FunctionExpr;
use crate::group::DataFrameGroupingSets;
use crate::naming::{self, quote_ident};
use crate::order::{DataFrameOrdering, OrderKey};
use crate::row::Row;
use selector::{RowSlice, Selection, Selector};

/// Marker for relations that reference a table already in the catalog.
const CATALOG_PREFIX: &str = "TABLE";

/// A handle to a relation, either a table in the database or a query derived
/// from other relations.
///
/// Cloning is cheap, clones share the same node (and row cache).
#[derive(Clone)]
pub struct DataFrame {
    inner: Arc<DataFrameInner>,
}

struct DataFrameInner {
    query: String,
    name: String,
    parents: Vec<DataFrame>,
    db: Option<Database>,
    contents: Mutex<Option<Arc<[Row]>>>,
}

impl fmt::Debug for DataFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parents: Vec<_> = self.inner.parents.iter().map(|p| p.name()).collect();
        f.debug_struct("DataFrame")
            .field("name", &self.inner.name)
            .field("query", &self.inner.query)
            .field("parents", &parents)
            .finish_non_exhaustive()
    }
}

impl DataFrame {
    /// Create a new relation node.
    ///
    /// If no database is given, the database of the first parent that has one
    /// is used. If no name is given, a unique one is generated.
    pub fn new(
        query: impl Into<String>,
        parents: Vec<DataFrame>,
        name: Option<String>,
        db: Option<Database>,
    ) -> Self {
        let db = db.or_else(|| parents.iter().find_map(|p| p.database().cloned()));
        let name = name.unwrap_or_else(|| naming::unique_name(&naming::prefix_for(db.as_ref())));

        DataFrame {
            inner: Arc::new(DataFrameInner {
                query: query.into(),
                name,
                parents,
                db,
                contents: Mutex::new(None),
            }),
        }
    }

    /// Reference a table (or view) in the catalog by name.
    pub fn from_table(name: &str, db: Option<Database>) -> Self {
        Self::new(
            format!("{CATALOG_PREFIX} {}", quote_ident(name)),
            Vec::new(),
            Some(name.to_string()),
            db,
        )
    }

    #[cfg(test)]
    pub(crate) fn from_table_name(name: &str) -> Self {
        Self::from_table(name, None)
    }

    /// A node that only carries a name, used to alias the other side of a
    /// self join. Never executed.
    pub(crate) fn alias(name: String) -> Self {
        Self::new(String::new(), Vec::new(), Some(name), None)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The fragment of this node alone, without its dependencies.
    pub fn query(&self) -> &str {
        &self.inner.query
    }

    pub fn parents(&self) -> &[DataFrame] {
        &self.inner.parents
    }

    pub fn database(&self) -> Option<&Database> {
        self.inner.db.as_ref()
    }

    /// Whether this node references an object already persisted in the
    /// catalog.
    pub fn in_catalog(&self) -> bool {
        self.inner.query.starts_with(CATALOG_PREFIX)
    }

    /// Reference a column of this relation. `"*"` references all columns.
    pub fn col(&self, name: impl Into<String>) -> Expr {
        Expr::column(self, name)
    }

    /// Resolve a selector against this relation.
    pub fn get(&self, selector: Selector) -> Result<Selection> {
        match selector {
            Selector::Column(name) => Ok(Selection::Column(self.col(name))),
            Selector::Columns(names) => {
                let names: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
                self.select(&names).map(Selection::DataFrame)
            }
            Selector::Predicate(predicate) => self.filter(predicate).map(Selection::DataFrame),
            Selector::Rows(slice) => self.slice(slice).map(Selection::DataFrame),
        }
    }

    /// Project a subset of columns.
    pub fn select(&self, columns: &[&str]) -> Result<DataFrame> {
        if columns.is_empty() {
            return Err(
                DbError::new("Cannot select zero columns").with_field("relation", self.name())
            );
        }
        let targets: Vec<String> = columns.iter().map(|c| self.col(*c).serialize()).collect();

        Ok(DataFrame::new(
            format!("SELECT {} FROM {}", targets.join(", "), self.name()),
            vec![self.clone()],
            None,
            None,
        ))
    }

    /// Filter rows by a predicate on this relation.
    ///
    /// The predicate must reference this relation. If it also references a
    /// second relation, that relation becomes a dependency of the result.
    pub fn filter<F>(&self, predicate: F) -> Result<DataFrame>
    where
        F: FnOnce(&DataFrame) -> Expr,
    {
        let expr = predicate(self);
        match expr.dataframe() {
            Some(df) if df.name() == self.name() => (),
            other => {
                return Err(DbError::new("Predicate must be based on the current relation")
                    .with_field("relation", self.name())
                    .with_field("predicate_relation", other.map(|df| df.name()).unwrap_or("none")));
            }
        }

        let mut parents = vec![self.clone()];
        if let Some(other) = expr.other_dataframe() {
            if other.name() != self.name() {
                parents.push(other.clone());
            }
        }

        Ok(DataFrame::new(
            format!("SELECT * FROM {} WHERE {}", self.name(), expr.serialize()),
            parents,
            None,
            None,
        ))
    }

    /// Alias for [`DataFrame::filter`].
    pub fn where_<F>(&self, predicate: F) -> Result<DataFrame>
    where
        F: FnOnce(&DataFrame) -> Expr,
    {
        self.filter(predicate)
    }

    /// Select a consecutive range of rows with `LIMIT`/`OFFSET`.
    pub fn slice(&self, rows: impl Into<RowSlice>) -> Result<DataFrame> {
        let clause = rows.into().limit_offset_clause()?;
        let query = if clause.is_empty() {
            format!("SELECT * FROM {}", self.name())
        } else {
            format!("SELECT * FROM {} {clause}", self.name())
        };
        Ok(DataFrame::new(query, vec![self.clone()], None, None))
    }

    /// Add computed columns.
    ///
    /// Each expression must reference only this relation, or no relation at
    /// all. Existing columns cannot be reassigned, and names must be unique.
    pub fn assign<K>(&self, columns: impl IntoIterator<Item = (K, Expr)>) -> Result<DataFrame>
    where
        K: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut targets = Vec::new();
        let mut other_parents: Vec<DataFrame> = Vec::new();

        for (name, expr) in columns {
            let name: String = name.into();
            if !seen.insert(name.clone()) {
                return Err(
                    DbError::new("Duplicate column name in assignment").with_field("column", name)
                );
            }
            if let Some(df) = expr.dataframe() {
                if df.name() != self.name() {
                    return Err(DbError::new(
                        "Newly included columns must be based on the current relation",
                    )
                    .with_field("column", name)
                    .with_field("relation", df.name()));
                }
            }
            if let Some(other) = expr.other_dataframe() {
                if other.name() != self.name()
                    && !other_parents.iter().any(|p| p.name() == other.name())
                {
                    other_parents.push(other.clone());
                }
            }
            targets.push(format!("{} AS {name}", expr.serialize()));
        }

        if targets.is_empty() {
            return Ok(self.clone());
        }

        let mut parents = vec![self.clone()];
        parents.extend(other_parents);

        Ok(DataFrame::new(
            format!("SELECT *, {} FROM {}", targets.join(", "), self.name()),
            parents,
            None,
            None,
        ))
    }

    /// Keep only the first row of each set of rows with equal values of the
    /// given columns.
    pub fn distinct_on(&self, columns: &[&str]) -> Result<DataFrame> {
        if columns.is_empty() {
            return Err(DbError::new("DISTINCT ON requires at least one column"));
        }
        let cols: Vec<String> = columns.iter().map(|c| self.col(*c).serialize()).collect();

        Ok(DataFrame::new(
            format!("SELECT DISTINCT ON ({}) * FROM {}", cols.join(", "), self.name()),
            vec![self.clone()],
            None,
            None,
        ))
    }

    /// Concatenate the rows of two relations.
    ///
    /// Duplicate rows are removed unless `all` is set.
    pub fn union(&self, other: &DataFrame, all: bool) -> DataFrame {
        let op = if all { "UNION ALL" } else { "UNION" };
        DataFrame::new(
            format!("SELECT * FROM {} {op} SELECT * FROM {}", self.name(), other.name()),
            vec![self.clone(), other.clone()],
            None,
            None,
        )
    }

    /// Apply a function to this relation.
    ///
    /// The relation is bound to the call explicitly, so calls without any
    /// column arguments (e.g. `count(*)`) are evaluated against it as well.
    pub fn apply<F>(&self, func: F, expand: bool, as_name: Option<&str>) -> Result<DataFrame>
    where
        F: FnOnce(&DataFrame) -> FunctionExpr,
    {
        func(self).bind(self).apply(expand, as_name)
    }

    /// Start ordering this relation.
    pub fn order_by(&self, key: impl Into<OrderKey>) -> Result<DataFrameOrdering> {
        DataFrameOrdering::new(self.clone(), key.into())
    }

    /// Group this relation by the given columns.
    pub fn group_by(&self, columns: &[&str]) -> DataFrameGroupingSets {
        DataFrameGroupingSets::new(
            self.clone(),
            vec![columns.iter().map(|c| c.to_string()).collect()],
        )
    }

    fn contents(&self) -> Option<Arc<[Row]>> {
        self.inner.contents.lock().clone()
    }

    fn set_contents(&self, rows: Arc<[Row]>) {
        *self.inner.contents.lock() = Some(rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{and, function_expr::function, lit};

    #[test]
    fn select_columns() {
        let t = DataFrame::from_table_name("t");
        let df = t.select(&["a", "b"]).unwrap();
        assert_eq!("SELECT t.a, t.b FROM t", df.query());
        assert_eq!("t", df.parents()[0].name());
        t.select(&[]).unwrap_err();
    }

    #[test]
    fn filter_requires_own_relation() {
        let t = DataFrame::from_table_name("t");
        let u = DataFrame::from_table_name("u");

        let df = t.filter(|t| t.col("id").eq(2)).unwrap();
        assert_eq!("SELECT * FROM t WHERE (t.id = 2)", df.query());
        assert_eq!(1, df.parents().len());

        t.filter(|_| u.col("id").eq(2)).unwrap_err();
        t.filter(|_| lit(true)).unwrap_err();
    }

    #[test]
    fn filter_adds_other_relation() {
        let t = DataFrame::from_table_name("t");
        let u = DataFrame::from_table_name("u");

        let df = t.where_(|t| t.col("id").eq(u.col("id"))).unwrap();
        assert_eq!("SELECT * FROM t WHERE (t.id = u.id)", df.query());
        let parents: Vec<_> = df.parents().iter().map(|p| p.name()).collect();
        assert_eq!(vec!["t", "u"], parents);
    }

    #[test]
    fn slice_rows() {
        let t = DataFrame::from_table_name("t");
        assert_eq!("SELECT * FROM t LIMIT 2 OFFSET 1", t.slice(1..3).unwrap().query());
        assert_eq!("SELECT * FROM t LIMIT 5", t.slice(..5).unwrap().query());
        assert_eq!("SELECT * FROM t OFFSET 4", t.slice(4..).unwrap().query());
        assert_eq!("SELECT * FROM t", t.slice(..).unwrap().query());
    }

    #[test]
    fn slice_with_step_not_supported() {
        let t = DataFrame::from_table_name("t");
        let err = t.slice(RowSlice::from(0..10).with_step(2)).unwrap_err();
        assert!(err.to_string().contains("not supported"), "{err}");

        t.slice(RowSlice::from(0..10).with_step(1)).unwrap();
    }

    #[test]
    fn get_dispatch() {
        let t = DataFrame::from_table_name("t");

        match t.get(Selector::column("id")).unwrap() {
            Selection::Column(expr) => assert_eq!("t.id", expr.serialize()),
            other => panic!("unexpected: {other:?}"),
        }
        match t.get(Selector::columns(["a"])).unwrap() {
            Selection::DataFrame(df) => assert_eq!("SELECT t.a FROM t", df.query()),
            other => panic!("unexpected: {other:?}"),
        }
        match t.get(Selector::predicate(|t| t.col("a").gt(1))).unwrap() {
            Selection::DataFrame(df) => assert_eq!("SELECT * FROM t WHERE (t.a > 1)", df.query()),
            other => panic!("unexpected: {other:?}"),
        }
        match t.get(Selector::rows(..3)).unwrap() {
            Selection::DataFrame(df) => assert_eq!("SELECT * FROM t LIMIT 3", df.query()),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn assign_columns() {
        let t = DataFrame::from_table_name("t");
        let abs = function("abs");

        let df = t
            .assign([("abs", Expr::from(abs.call([t.col("id")]))), ("one", lit(1))])
            .unwrap();
        assert_eq!("SELECT *, abs(t.id) AS abs, 1 AS one FROM t", df.query());

        let same = t.assign(Vec::<(&str, Expr)>::new()).unwrap();
        assert_eq!(t.name(), same.name());
    }

    #[test]
    fn assign_rejects_other_relation() {
        let t = DataFrame::from_table_name("t");
        let u = DataFrame::from_table_name("u");
        t.assign([("x", u.col("id"))]).unwrap_err();
        t.assign([("x", lit(1)), ("x", lit(2))]).unwrap_err();
    }

    #[test]
    fn distinct_on_columns() {
        let t = DataFrame::from_table_name("t");
        let df = t.distinct_on(&["a", "b"]).unwrap();
        assert_eq!("SELECT DISTINCT ON (t.a, t.b) * FROM t", df.query());
    }

    #[test]
    fn union_query() {
        let t = DataFrame::from_table_name("t");
        let u = DataFrame::from_table_name("u");
        assert_eq!("SELECT * FROM t UNION ALL SELECT * FROM u", t.union(&u, true).query());
        assert_eq!("SELECT * FROM t UNION SELECT * FROM u", t.union(&u, false).query());
    }

    #[test]
    fn apply_binds_relation() {
        let t = DataFrame::from_table_name("t");
        let count = crate::expr::function_expr::aggregate("count");
        let df = t
            .apply(|_| count.call([crate::expr::star()]), false, Some("n"))
            .unwrap();
        assert_eq!("SELECT count(*) AS n FROM t", df.query());
    }

    #[test]
    fn generated_names_unique() {
        let t = DataFrame::from_table_name("t");
        let a = t.filter(|t| and(t.col("a").eq(1), t.col("b").eq(2))).unwrap();
        let b = t.filter(|t| and(t.col("a").eq(1), t.col("b").eq(2))).unwrap();
        assert_ne!(a.name(), b.name());
        assert!(a.name().starts_with("cte_"));
        assert!(!a.in_catalog());
        assert!(t.in_catalog());
    }
}
