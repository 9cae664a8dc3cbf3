//! Executing relations.

use std::sync::Arc;

use gpframe_error::{DbError, OptionExt, Result, not_implemented};
use tracing::debug;

use super::DataFrame;
use crate::database::Database;
use crate::literal::Literal;
use crate::naming;
use crate::row::Row;

/// How rows are retrieved from the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Retrieve every row in one round trip.
    #[default]
    All,
    /// Retrieve rows incrementally through a cursor.
    Cursor,
}

impl DataFrame {
    fn require_database(&self) -> Result<&Database> {
        self.database().ok_or_else(|| {
            DbError::new("Relation is not attached to a database")
                .with_field("relation", self.name())
        })
    }

    /// Rows of this relation.
    ///
    /// The first call executes the query. Later calls return the cached rows
    /// until [`DataFrame::refresh`] is called.
    pub fn fetch(&self) -> Result<Arc<[Row]>> {
        if let Some(rows) = self.contents() {
            return Ok(rows);
        }
        self.fetch_with_mode(FetchMode::All)
    }

    /// Execute the query again, replacing any cached rows.
    pub fn refresh(&self) -> Result<Arc<[Row]>> {
        self.fetch_with_mode(FetchMode::All)
    }

    pub fn fetch_with_mode(&self, mode: FetchMode) -> Result<Arc<[Row]>> {
        if mode == FetchMode::Cursor {
            not_implemented!("fetching rows through a cursor");
        }
        let db = self.require_database()?;

        // Each row comes back as one JSON object so that output columns with
        // the same name are detected instead of shadowed.
        let output_name = naming::unique_name(&naming::prefix_for(Some(db)));
        let json_df = DataFrame::new(
            format!(
                "SELECT to_json({output_name})::TEXT FROM {} AS {output_name}",
                self.name()
            ),
            vec![self.clone()],
            None,
            Some(db.clone()),
        );

        let rows = db.query_rows(&json_df.build_full_query())?;
        let rows = rows
            .into_iter()
            .map(|row| {
                let text = row.into_iter().next().flatten().required("row JSON column")?;
                Row::from_json(&text)
            })
            .collect::<Result<Arc<[Row]>>>()?;

        debug!(relation = %self.name(), rows = rows.len(), "fetched rows");
        self.set_contents(rows.clone());

        Ok(rows)
    }

    /// Persist this relation as a table and return a relation referencing it.
    ///
    /// Column names are required since the output schema is not inferred.
    pub fn save_as(
        &self,
        table_name: &str,
        column_names: &[&str],
        temp: bool,
    ) -> Result<DataFrame> {
        let db = self.require_database()?;
        if column_names.is_empty() {
            return Err(DbError::new("Column names of the new table are unknown")
                .with_field("table", table_name));
        }

        let temp = if temp { "TEMP " } else { "" };
        db.execute_statement(&format!(
            "CREATE {temp}TABLE {table_name} ({}) AS {}",
            column_names.join(", "),
            self.build_full_query(),
        ))?;

        Ok(DataFrame::from_table(table_name, Some(db.clone())))
    }

    /// Plan for this relation, one entry per line of output.
    pub fn explain(&self, format: &str) -> Result<Vec<String>> {
        let db = self.require_database()?;
        let rows = db.query_rows(&format!(
            "EXPLAIN (FORMAT {format}) {}",
            self.build_full_query()
        ))?;

        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next().flatten())
            .collect())
    }

    /// A relation listing the column names of this table, in definition
    /// order.
    ///
    /// Only valid for relations in the catalog.
    pub fn column_names(&self) -> Result<DataFrame> {
        if !self.in_catalog() {
            return Err(DbError::new("Column names are only known for relations in the catalog")
                .with_field("relation", self.name()));
        }
        let db = self.require_database()?;

        Ok(DataFrame::new(
            format!(
                "SELECT column_name FROM information_schema.columns \
                 WHERE table_name = {} ORDER BY ordinal_position",
                Literal::from(self.name()),
            ),
            Vec::new(),
            None,
            Some(db.clone()),
        ))
    }
}
