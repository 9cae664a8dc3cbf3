//! Grouping of relations for aggregation.

use gpframe_error::{DbError, Result};

use crate::dataframe::DataFrame;
use crate::expr::function_expr::FunctionExpr;

/// One or more grouping sets over a relation, produced by
/// [`DataFrame::group_by`].
///
/// Aggregating over the union of two grouping sets is the same as aggregating
/// over each set independently and concatenating the results.
#[derive(Debug, Clone)]
pub struct DataFrameGroupingSets {
    dataframe: DataFrame,
    grouping_sets: Vec<Vec<String>>,
}

impl DataFrameGroupingSets {
    pub(crate) fn new(dataframe: DataFrame, grouping_sets: Vec<Vec<String>>) -> Self {
        DataFrameGroupingSets {
            dataframe,
            grouping_sets,
        }
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.dataframe
    }

    pub fn grouping_sets(&self) -> &[Vec<String>] {
        &self.grouping_sets
    }

    /// Concatenate the grouping sets of two builders over the same relation.
    pub fn union(&self, other: &DataFrameGroupingSets) -> Result<DataFrameGroupingSets> {
        if self.dataframe.name() != other.dataframe.name() {
            return Err(DbError::new("Cannot union grouping sets of different relations")
                .with_field("left", self.dataframe.name())
                .with_field("right", other.dataframe.name()));
        }

        let mut grouping_sets = self.grouping_sets.clone();
        grouping_sets.extend(other.grouping_sets.iter().cloned());
        Ok(DataFrameGroupingSets::new(self.dataframe.clone(), grouping_sets))
    }

    /// Every column appearing in any grouping set, in first-seen order.
    pub fn targets(&self) -> Vec<String> {
        let mut targets: Vec<String> = Vec::new();
        for col in self.grouping_sets.iter().flatten() {
            if !targets.contains(col) {
                targets.push(col.clone());
            }
        }
        targets
    }

    pub fn group_by_clause(&self) -> String {
        let sets: Vec<String> = self
            .grouping_sets
            .iter()
            .map(|set| {
                let cols: Vec<String> = set
                    .iter()
                    .map(|c| self.dataframe.col(c.as_str()).serialize())
                    .collect();
                format!("({})", cols.join(", "))
            })
            .collect();
        format!("GROUP BY GROUPING SETS ({})", sets.join(", "))
    }

    /// Apply an aggregate once per group.
    pub fn apply<F>(&self, func: F, expand: bool, as_name: Option<&str>) -> Result<DataFrame>
    where
        F: FnOnce(&DataFrame) -> FunctionExpr,
    {
        func(&self.dataframe)
            .bind_group_by(self)
            .apply(expand, as_name)
    }

    /// Compute several named aggregates per group.
    pub fn assign<K>(
        &self,
        columns: impl IntoIterator<Item = (K, FunctionExpr)>,
    ) -> Result<DataFrame>
    where
        K: Into<String>,
    {
        let mut targets: Vec<String> = self
            .targets()
            .iter()
            .map(|c| self.dataframe.col(c.as_str()).serialize())
            .collect();
        let num_group_cols = targets.len();

        for (name, func) in columns {
            let name: String = name.into();
            let expr = func.into_expr();
            if let Some(df) = expr.dataframe() {
                if df.name() != self.dataframe.name() {
                    return Err(DbError::new(
                        "Aggregates must be based on the grouped relation",
                    )
                    .with_field("column", name)
                    .with_field("relation", df.name()));
                }
            }
            targets.push(format!("{} AS {name}", expr.serialize()));
        }

        if targets.len() == num_group_cols {
            return Err(DbError::new("No aggregates given"));
        }

        Ok(DataFrame::new(
            format!(
                "SELECT {} FROM {} {}",
                targets.join(", "),
                self.dataframe.name(),
                self.group_by_clause()
            ),
            vec![self.dataframe.clone()],
            None,
            None,
        ))
    }
}
