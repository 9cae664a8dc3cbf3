//! Database handle shared by every relation node created from it.

use std::fmt;
use std::sync::Arc;

use gpframe_error::{DbError, Result};
use parking_lot::{RwLock, RwLockReadGuard};
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::dataframe::DataFrame;
use crate::expr::Expr;
use crate::expr::function_expr::FunctionExpr;
use crate::gateway::{Gateway, TextRow, with_transaction};
use crate::literal::Literal;
use crate::naming::{self, quote_ident};

/// A handle to a database.
///
/// Cheap to clone. All clones share the same gateway and session
/// configuration.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

struct DatabaseInner {
    gateway: Arc<dyn Gateway>,
    config: RwLock<SessionConfig>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("gateway", &self.inner.gateway)
            .field("config", &*self.inner.config.read())
            .finish()
    }
}

impl Database {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self::with_config(gateway, SessionConfig::default())
    }

    pub fn with_config(gateway: Arc<dyn Gateway>, config: SessionConfig) -> Self {
        Database {
            inner: Arc::new(DatabaseInner {
                gateway,
                config: RwLock::new(config),
            }),
        }
    }

    pub fn config(&self) -> RwLockReadGuard<'_, SessionConfig> {
        self.inner.config.read()
    }

    pub fn set_setting(&self, name: &str, value: &str) -> Result<()> {
        self.inner.config.write().set_from_str(name, value)
    }

    pub fn get_setting(&self, name: &str) -> Result<String> {
        self.inner.config.read().get_as_string(name)
    }

    /// Run a statement that returns no rows.
    pub fn execute_statement(&self, sql: &str) -> Result<()> {
        self.execute(sql, &[], false).map(|_| ())
    }

    /// Run a query, returning all result rows.
    pub fn query_rows(&self, sql: &str) -> Result<Vec<TextRow>> {
        Ok(self.execute(sql, &[], true)?.unwrap_or_default())
    }

    /// Run `f` inside a transaction on this database.
    ///
    /// See [`with_transaction`].
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T>,
    {
        with_transaction(self, f)
    }

    /// Create a relation from literal rows.
    ///
    /// Every row must have exactly one value per column name.
    pub fn create_dataframe_from_rows<R, L>(
        &self,
        rows: impl IntoIterator<Item = R>,
        column_names: &[&str],
    ) -> Result<DataFrame>
    where
        R: IntoIterator<Item = L>,
        L: Into<Literal>,
    {
        if column_names.is_empty() {
            return Err(DbError::new("Column names of the relation are unknown"));
        }

        let mut rendered = Vec::new();
        for (idx, row) in rows.into_iter().enumerate() {
            let values: Vec<String> = row
                .into_iter()
                .map(|v| Into::<Literal>::into(v).serialize())
                .collect();
            if values.len() != column_names.len() {
                return Err(DbError::new("Row does not match the number of columns")
                    .with_field("row", idx)
                    .with_field("expected", column_names.len())
                    .with_field("got", values.len()));
            }
            rendered.push(format!("({})", values.join(", ")));
        }

        if rendered.is_empty() {
            return Err(DbError::new("Cannot create a relation from zero rows"));
        }

        let columns: Vec<String> = column_names.iter().map(|c| quote_ident(c)).collect();
        let alias = naming::unique_name(&self.config().cte_prefix);
        let query = format!(
            "SELECT * FROM (VALUES {}) AS {alias} ({})",
            rendered.join(", "),
            columns.join(", "),
        );

        Ok(DataFrame::new(query, Vec::new(), None, Some(self.clone())))
    }

    /// Create a relation from named columns of literal values.
    pub fn create_dataframe_from_columns<K, L>(
        &self,
        columns: impl IntoIterator<Item = (K, Vec<L>)>,
    ) -> Result<DataFrame>
    where
        K: Into<String>,
        L: Into<Literal>,
    {
        let targets: Vec<String> = columns
            .into_iter()
            .map(|(name, values)| {
                let name: String = name.into();
                let array = Literal::from(values);
                format!("unnest({array}) AS {}", quote_ident(&name))
            })
            .collect();

        if targets.is_empty() {
            return Err(DbError::new("Cannot create a relation from zero columns"));
        }

        Ok(DataFrame::new(
            format!("SELECT {}", targets.join(", ")),
            Vec::new(),
            None,
            Some(self.clone()),
        ))
    }

    /// Reference an existing table or view by name.
    pub fn create_dataframe_from_table(&self, name: &str) -> DataFrame {
        DataFrame::from_table(name, Some(self.clone()))
    }

    /// Wrap a raw query.
    pub fn from_query(&self, sql: impl Into<String>) -> DataFrame {
        DataFrame::new(sql, Vec::new(), None, Some(self.clone()))
    }

    /// Select constant expressions, e.g. `SELECT 1 AS one`.
    ///
    /// Expressions must not reference any relation.
    pub fn assign<K>(&self, columns: impl IntoIterator<Item = (K, Expr)>) -> Result<DataFrame>
    where
        K: Into<String>,
    {
        let mut targets = Vec::new();
        for (name, expr) in columns {
            let name: String = name.into();
            if let Some(df) = expr.dataframe() {
                return Err(
                    DbError::new("Constant columns cannot reference a relation")
                        .with_field("column", name)
                        .with_field("relation", df.name()),
                );
            }
            targets.push(format!("{} AS {name}", expr.serialize()));
        }

        if targets.is_empty() {
            return Err(DbError::new("Cannot select zero columns"));
        }

        Ok(DataFrame::new(
            format!("SELECT {}", targets.join(", ")),
            Vec::new(),
            None,
            Some(self.clone()),
        ))
    }

    /// Apply a function call that is not bound to any relation.
    pub fn apply(
        &self,
        func: &FunctionExpr,
        expand: bool,
        as_name: Option<&str>,
    ) -> Result<DataFrame> {
        func.apply_inner(expand, as_name, Some(self))
    }
}

impl Gateway for Database {
    fn execute(
        &self,
        sql: &str,
        params: &[String],
        expects_rows: bool,
    ) -> Result<Option<Vec<TextRow>>> {
        if self.config().print_sql {
            info!(%sql, "executing");
        } else {
            debug!(%sql, "executing");
        }
        self.inner.gateway.execute(sql, params, expects_rows)
    }
}
