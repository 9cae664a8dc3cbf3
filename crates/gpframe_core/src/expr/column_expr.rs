use std::fmt;

/// Reference to a column of a named relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnExpr {
    /// Name of the relation the column belongs to.
    pub table: String,
    /// Column name. `*` references every column.
    pub column: String,
}

impl ColumnExpr {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        ColumnExpr {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}
