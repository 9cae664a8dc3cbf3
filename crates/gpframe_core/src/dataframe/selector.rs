use std::fmt;
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use gpframe_error::{DbError, Result};

use super::DataFrame;
use crate::expr::Expr;

/// What to take out of a relation with [`DataFrame::get`].
pub enum Selector {
    /// A single column, as an expression.
    Column(String),
    /// A projection onto a list of columns.
    Columns(Vec<String>),
    /// Rows matching a predicate.
    Predicate(Box<dyn FnOnce(&DataFrame) -> Expr>),
    /// A consecutive range of rows.
    Rows(RowSlice),
}

impl Selector {
    pub fn column(name: impl Into<String>) -> Self {
        Selector::Column(name.into())
    }

    pub fn columns<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selector::Columns(names.into_iter().map(Into::into).collect())
    }

    pub fn predicate<F>(predicate: F) -> Self
    where
        F: FnOnce(&DataFrame) -> Expr + 'static,
    {
        Selector::Predicate(Box::new(predicate))
    }

    pub fn rows(rows: impl Into<RowSlice>) -> Self {
        Selector::Rows(rows.into())
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(name) => f.debug_tuple("Column").field(name).finish(),
            Self::Columns(names) => f.debug_tuple("Columns").field(names).finish(),
            Self::Predicate(_) => f.debug_tuple("Predicate").finish_non_exhaustive(),
            Self::Rows(rows) => f.debug_tuple("Rows").field(rows).finish(),
        }
    }
}

/// Result of [`DataFrame::get`].
#[derive(Debug, Clone)]
pub enum Selection {
    Column(Expr),
    DataFrame(DataFrame),
}

impl Selection {
    pub fn into_dataframe(self) -> Option<DataFrame> {
        match self {
            Self::DataFrame(df) => Some(df),
            Self::Column(_) => None,
        }
    }
}

/// A half-open range of row positions, with an optional step.
///
/// Only a step of 1 (or no step) can be expressed in SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowSlice {
    pub start: Option<u64>,
    pub stop: Option<u64>,
    pub step: Option<i64>,
}

impl RowSlice {
    pub fn with_step(mut self, step: i64) -> Self {
        self.step = Some(step);
        self
    }

    /// Render as `LIMIT n OFFSET m`, omitting either part when unbounded.
    ///
    /// Only a unit step is supported, and `stop` may not precede `start`.
    pub fn limit_offset_clause(&self) -> Result<String> {
        if let Some(step) = self.step.filter(|&step| step != 1) {
            return Err(
                DbError::new("Slicing with a step is not supported").with_field("step", step)
            );
        }

        let limit = match (self.start, self.stop) {
            (Some(start), Some(stop)) if stop < start => {
                return Err(DbError::new("Slice stop must not be before its start")
                    .with_field("start", start)
                    .with_field("stop", stop));
            }
            (Some(start), Some(stop)) => Some(stop - start),
            (None, Some(stop)) => Some(stop),
            (_, None) => None,
        };

        let mut parts = Vec::with_capacity(2);
        if let Some(limit) = limit {
            parts.push(format!("LIMIT {limit}"));
        }
        if let Some(offset) = self.start {
            parts.push(format!("OFFSET {offset}"));
        }
        Ok(parts.join(" "))
    }
}

impl From<Range<u64>> for RowSlice {
    fn from(value: Range<u64>) -> Self {
        RowSlice {
            start: Some(value.start),
            stop: Some(value.end),
            step: None,
        }
    }
}

impl From<RangeFrom<u64>> for RowSlice {
    fn from(value: RangeFrom<u64>) -> Self {
        RowSlice {
            start: Some(value.start),
            stop: None,
            step: None,
        }
    }
}

impl From<RangeTo<u64>> for RowSlice {
    fn from(value: RangeTo<u64>) -> Self {
        RowSlice {
            start: None,
            stop: Some(value.end),
            step: None,
        }
    }
}

impl From<RangeFull> for RowSlice {
    fn from(_: RangeFull) -> Self {
        RowSlice::default()
    }
}
