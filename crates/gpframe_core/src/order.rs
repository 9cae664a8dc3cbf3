//! Ordering of relations.

use gpframe_error::{DbError, Result};

use crate::dataframe::DataFrame;
use crate::dataframe::selector::RowSlice;

/// One ordering criterion.
///
/// `ascending` and `operator` are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub column: String,
    pub ascending: Option<bool>,
    pub nulls_first: Option<bool>,
    pub operator: Option<String>,
}

impl OrderKey {
    pub fn new(column: impl Into<String>) -> Self {
        OrderKey {
            column: column.into(),
            ascending: None,
            nulls_first: None,
            operator: None,
        }
    }

    pub fn ascending(mut self, ascending: bool) -> Self {
        self.ascending = Some(ascending);
        self
    }

    pub fn nulls_first(mut self, nulls_first: bool) -> Self {
        self.nulls_first = Some(nulls_first);
        self
    }

    /// Order with a custom operator, e.g. `~<~`.
    pub fn using(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    fn validate(&self) -> Result<()> {
        if self.ascending.is_some() && self.operator.is_some() {
            return Err(DbError::new(
                "Could not use 'ascending' and 'operator' together to order by one column",
            )
            .with_field("column", &self.column));
        }
        Ok(())
    }

    fn serialize(&self, dataframe: &DataFrame) -> String {
        let mut s = dataframe.col(self.column.as_str()).serialize();
        match self.ascending {
            Some(true) => s.push_str(" ASC"),
            Some(false) => s.push_str(" DESC"),
            None => (),
        }
        if let Some(op) = &self.operator {
            s.push_str(" USING ");
            s.push_str(op);
        }
        match self.nulls_first {
            Some(true) => s.push_str(" NULLS FIRST"),
            Some(false) => s.push_str(" NULLS LAST"),
            None => (),
        }
        s
    }
}

impl From<&str> for OrderKey {
    fn from(value: &str) -> Self {
        OrderKey::new(value)
    }
}

impl From<String> for OrderKey {
    fn from(value: String) -> Self {
        OrderKey::new(value)
    }
}

/// A relation with an ordering, produced by [`DataFrame::order_by`].
///
/// Refining the ordering returns a new value, leaving this one untouched.
#[derive(Debug, Clone)]
pub struct DataFrameOrdering {
    dataframe: DataFrame,
    keys: Vec<OrderKey>,
}

impl DataFrameOrdering {
    pub(crate) fn new(dataframe: DataFrame, key: OrderKey) -> Result<Self> {
        key.validate()?;
        Ok(DataFrameOrdering {
            dataframe,
            keys: vec![key],
        })
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.dataframe
    }

    pub fn keys(&self) -> &[OrderKey] {
        &self.keys
    }

    /// Add a key to break ties of the existing keys.
    pub fn order_by(&self, key: impl Into<OrderKey>) -> Result<DataFrameOrdering> {
        let key = key.into();
        key.validate()?;

        let mut keys = self.keys.clone();
        keys.push(key);
        Ok(DataFrameOrdering {
            dataframe: self.dataframe.clone(),
            keys,
        })
    }

    pub fn order_by_clause(&self) -> String {
        let keys: Vec<String> = self
            .keys
            .iter()
            .map(|k| k.serialize(&self.dataframe))
            .collect();
        format!("ORDER BY {}", keys.join(", "))
    }

    /// The first `n` rows in order.
    pub fn head(&self, n: u64) -> DataFrame {
        DataFrame::new(
            format!(
                "SELECT * FROM {} {} LIMIT {n}",
                self.dataframe.name(),
                self.order_by_clause()
            ),
            vec![self.dataframe.clone()],
            None,
            None,
        )
    }

    /// A consecutive range of rows in order.
    pub fn slice(&self, rows: impl Into<RowSlice>) -> Result<DataFrame> {
        let clause = rows.into().limit_offset_clause()?;
        let mut query = format!(
            "SELECT * FROM {} {}",
            self.dataframe.name(),
            self.order_by_clause()
        );
        if !clause.is_empty() {
            query.push(' ');
            query.push_str(&clause);
        }
        Ok(DataFrame::new(query, vec![self.dataframe.clone()], None, None))
    }
}
