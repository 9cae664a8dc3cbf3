use std::fmt;

use super::Expr;

/// A database type referenced by name, with an optional type modifier.
///
/// E.g. `varchar(5)` is the type `varchar` with modifier `5`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataType {
    pub name: String,
    pub modifier: Option<i32>,
}

impl DataType {
    pub fn new(name: impl Into<String>) -> Self {
        DataType {
            name: name.into(),
            modifier: None,
        }
    }

    pub fn with_modifier(mut self, modifier: i32) -> Self {
        self.modifier = Some(modifier);
        self
    }

    /// Cast an expression to this type.
    pub fn cast(&self, expr: impl Into<Expr>) -> Expr {
        Expr::cast(expr, self.clone())
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.modifier {
            Some(modifier) => write!(f, "{}({modifier})", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CastExpr {
    pub expr: Box<Expr>,
    pub to: DataType,
}

impl fmt::Display for CastExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CAST({} AS {})", self.expr.serialize(), self.to)
    }
}
