//! Expression trees embedded into generated SQL.
//!
//! Expressions are immutable. Every builder returns a new expression, and
//! renaming produces a copy, so the same expression may be shared across any
//! number of derived relations.

pub mod binary_expr;
pub mod cast_expr;
pub mod column_expr;
pub mod function_expr;
pub mod unary_expr;

use std::fmt;

use binary_expr::{BinaryExpr, BinaryOperator};
use cast_expr::{CastExpr, DataType};
use column_expr::ColumnExpr;
use function_expr::{CallExpr, FunctionExpr};
use unary_expr::{UnaryExpr, UnaryOperator};

use crate::dataframe::DataFrame;
use crate::literal::Literal;

#[derive(Debug, Clone)]
pub enum ExprKind {
    Column(ColumnExpr),
    Literal(Literal),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Call(CallExpr),
    Cast(CastExpr),
    /// `*`, e.g. the argument to `count(*)`.
    Star,
}

impl fmt::Display for ExprKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(expr) => write!(f, "{expr}"),
            Self::Literal(lit) => write!(f, "{lit}"),
            Self::Binary(expr) => write!(f, "{expr}"),
            Self::Unary(expr) => write!(f, "{expr}"),
            Self::Call(expr) => write!(f, "{expr}"),
            Self::Cast(expr) => write!(f, "{expr}"),
            Self::Star => write!(f, "*"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Expr {
    kind: ExprKind,
    /// Output name when used as a target.
    as_name: Option<String>,
    /// Relation this expression is evaluated against.
    dataframe: Option<DataFrame>,
    /// A second relation referenced by the expression, e.g. the right side of
    /// a comparison between columns of two relations.
    other_dataframe: Option<DataFrame>,
}

impl Expr {
    pub(crate) fn column(dataframe: &DataFrame, column: impl Into<String>) -> Self {
        Expr {
            kind: ExprKind::Column(ColumnExpr::new(dataframe.name(), column)),
            as_name: None,
            dataframe: Some(dataframe.clone()),
            other_dataframe: None,
        }
    }

    pub fn literal(lit: impl Into<Literal>) -> Self {
        Expr {
            kind: ExprKind::Literal(lit.into()),
            as_name: None,
            dataframe: None,
            other_dataframe: None,
        }
    }

    pub fn binary(op: BinaryOperator, left: impl Into<Expr>, right: impl Into<Expr>) -> Self {
        let mut left = left.into();
        let mut right = right.into();

        let op = if left.is_null_literal() || right.is_null_literal() {
            let aware = op.null_aware();
            // `IS [NOT] NULL` only accepts NULL on the right.
            if aware != op && left.is_null_literal() {
                std::mem::swap(&mut left, &mut right);
            }
            aware
        } else {
            op
        };

        let (dataframe, other_dataframe) = merge_relations([&left, &right]);
        Expr {
            kind: ExprKind::Binary(BinaryExpr {
                op,
                left: Box::new(left),
                right: Box::new(right),
            }),
            as_name: None,
            dataframe,
            other_dataframe,
        }
    }

    pub fn unary(op: UnaryOperator, expr: impl Into<Expr>) -> Self {
        let expr = expr.into();
        let dataframe = expr.dataframe.clone();
        let other_dataframe = expr.other_dataframe.clone();
        Expr {
            kind: ExprKind::Unary(UnaryExpr {
                op,
                expr: Box::new(expr),
            }),
            as_name: None,
            dataframe,
            other_dataframe,
        }
    }

    pub fn cast(expr: impl Into<Expr>, to: DataType) -> Self {
        let expr = expr.into();
        let dataframe = expr.dataframe.clone();
        let other_dataframe = expr.other_dataframe.clone();
        Expr {
            kind: ExprKind::Cast(CastExpr {
                expr: Box::new(expr),
                to,
            }),
            as_name: None,
            dataframe,
            other_dataframe,
        }
    }

    pub(crate) fn call(call: CallExpr) -> Self {
        let (dataframe, other_dataframe) = merge_relations(call.args.iter());
        Expr {
            kind: ExprKind::Call(call),
            as_name: None,
            dataframe,
            other_dataframe,
        }
    }

    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    /// Returns a copy of this expression with a new output name.
    ///
    /// The original expression is left untouched.
    pub fn rename(&self, new_name: impl Into<String>) -> Expr {
        let mut expr = self.clone();
        expr.as_name = Some(new_name.into());
        expr
    }

    /// Name of the expression.
    ///
    /// This is the alias if one was given, otherwise the column name for
    /// column references.
    pub fn name(&self) -> Option<&str> {
        match (&self.as_name, &self.kind) {
            (Some(name), _) => Some(name.as_str()),
            (None, ExprKind::Column(col)) => Some(col.column.as_str()),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        self.as_name.as_deref()
    }

    pub fn dataframe(&self) -> Option<&DataFrame> {
        self.dataframe.as_ref()
    }

    pub fn other_dataframe(&self) -> Option<&DataFrame> {
        self.other_dataframe.as_ref()
    }

    pub fn is_null_literal(&self) -> bool {
        matches!(&self.kind, ExprKind::Literal(lit) if lit.is_null())
    }

    /// SQL text of this expression, without any alias.
    pub fn serialize(&self) -> String {
        self.kind.to_string()
    }

    /// SQL text usable in a select list, including the alias if set.
    pub fn serialize_target(&self) -> String {
        match &self.as_name {
            Some(name) => format!("{} AS {name}", self.serialize()),
            None => self.serialize(),
        }
    }

    pub fn eq(&self, other: impl Into<Expr>) -> Expr {
        eq(self.clone(), other)
    }

    pub fn ne(&self, other: impl Into<Expr>) -> Expr {
        ne(self.clone(), other)
    }

    pub fn lt(&self, other: impl Into<Expr>) -> Expr {
        lt(self.clone(), other)
    }

    pub fn le(&self, other: impl Into<Expr>) -> Expr {
        le(self.clone(), other)
    }

    pub fn gt(&self, other: impl Into<Expr>) -> Expr {
        gt(self.clone(), other)
    }

    pub fn ge(&self, other: impl Into<Expr>) -> Expr {
        ge(self.clone(), other)
    }

    pub fn and(&self, other: impl Into<Expr>) -> Expr {
        and(self.clone(), other)
    }

    pub fn or(&self, other: impl Into<Expr>) -> Expr {
        or(self.clone(), other)
    }

    pub fn like(&self, pattern: impl Into<String>) -> Expr {
        like(self.clone(), pattern)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.serialize_target())
    }
}

/// Find the relations referenced by a set of operands.
///
/// The first relation found becomes the primary one, the first relation with a
/// different name becomes the secondary one.
fn merge_relations<'a>(
    exprs: impl IntoIterator<Item = &'a Expr>,
) -> (Option<DataFrame>, Option<DataFrame>) {
    let mut primary: Option<DataFrame> = None;
    let mut other: Option<DataFrame> = None;

    for expr in exprs {
        for df in [&expr.dataframe, &expr.other_dataframe].into_iter().flatten() {
            if primary.is_none() {
                primary = Some(df.clone());
            } else if other.is_none() && primary.as_ref().is_some_and(|p| p.name() != df.name()) {
                other = Some(df.clone());
            }
        }
    }

    (primary, other)
}

macro_rules! impl_expr_from_literal {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Expr {
                fn from(value: $t) -> Self {
                    Expr::literal(value)
                }
            }
        )*
    };
}

impl_expr_from_literal!(Literal, bool, i32, i64, f64, &str, String);

impl From<&Expr> for Expr {
    fn from(value: &Expr) -> Self {
        value.clone()
    }
}

impl From<FunctionExpr> for Expr {
    fn from(value: FunctionExpr) -> Self {
        value.into_expr()
    }
}

/// Create a literal expression.
pub fn lit(value: impl Into<Literal>) -> Expr {
    Expr::literal(value)
}

/// `*`
pub fn star() -> Expr {
    Expr {
        kind: ExprKind::Star,
        as_name: None,
        dataframe: None,
        other_dataframe: None,
    }
}

/// The NULL literal.
pub fn null() -> Expr {
    Expr::literal(Literal::Null)
}

/// `left = right`, or `left is right` when either side is NULL.
pub fn eq(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    Expr::binary(BinaryOperator::Eq, left, right)
}

/// `left != right`, or `left is not right` when either side is NULL.
pub fn ne(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    Expr::binary(BinaryOperator::NotEq, left, right)
}

pub fn lt(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    Expr::binary(BinaryOperator::Lt, left, right)
}

pub fn le(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    Expr::binary(BinaryOperator::LtEq, left, right)
}

pub fn gt(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    Expr::binary(BinaryOperator::Gt, left, right)
}

pub fn ge(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    Expr::binary(BinaryOperator::GtEq, left, right)
}

pub fn and(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    Expr::binary(BinaryOperator::And, left, right)
}

pub fn or(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    Expr::binary(BinaryOperator::Or, left, right)
}

pub fn add(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    Expr::binary(BinaryOperator::Add, left, right)
}

pub fn sub(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    Expr::binary(BinaryOperator::Sub, left, right)
}

pub fn mul(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    Expr::binary(BinaryOperator::Mul, left, right)
}

pub fn div(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    Expr::binary(BinaryOperator::Div, left, right)
}

pub fn rem(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    Expr::binary(BinaryOperator::Mod, left, right)
}

/// `expr LIKE pattern`
pub fn like(expr: impl Into<Expr>, pattern: impl Into<String>) -> Expr {
    Expr::binary(BinaryOperator::Like, expr, pattern.into())
}

pub fn not(expr: impl Into<Expr>) -> Expr {
    Expr::unary(UnaryOperator::Not, expr)
}

pub fn neg(expr: impl Into<Expr>) -> Expr {
    Expr::unary(UnaryOperator::Neg, expr)
}

pub fn pos(expr: impl Into<Expr>) -> Expr {
    Expr::unary(UnaryOperator::Pos, expr)
}

pub fn abs(expr: impl Into<Expr>) -> Expr {
    Expr::unary(UnaryOperator::Abs, expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataframe::DataFrame;

    fn table(name: &str) -> DataFrame {
        DataFrame::from_table_name(name)
    }

    #[test]
    fn eq_null_uses_is() {
        let t = table("t");
        let expr = eq(t.col("id"), null());
        assert_eq!("(t.id is NULL)", expr.serialize());

        let expr = t.col("id").ne(Literal::Null);
        assert_eq!("(t.id is not NULL)", expr.serialize());
    }

    #[test]
    fn null_on_left_moves_right() {
        let t = table("t");
        assert_eq!("(t.id is NULL)", eq(null(), t.col("id")).serialize());
        assert_eq!("(t.id is not NULL)", ne(null(), t.col("id")).serialize());
        assert_eq!("(NULL + t.id)", add(null(), t.col("id")).serialize());
    }

    #[test]
    fn literals_on_right() {
        let t = table("temp1");
        assert_eq!("(temp1.id = 2)", t.col("id").eq(2).serialize());
        assert_eq!("(temp1.id = 'aaa')", t.col("id").eq("aaa").serialize());
        assert_eq!("(temp1.id = TRUE)", t.col("id").eq(true).serialize());
    }

    #[test]
    fn nested_parenthesized() {
        let t = table("t");
        let expr = and(t.col("id").ge(3), t.col("id").lt(8));
        assert_eq!("((t.id >= 3) AND (t.id < 8))", expr.serialize());

        let expr = not(t.col("flag"));
        assert_eq!("NOT(t.flag)", expr.serialize());

        let expr = abs(rem(t.col("val"), 2));
        assert_eq!("ABS((t.val % 2))", expr.serialize());
    }

    #[test]
    fn rename_does_not_mutate() {
        let t = table("t");
        let e = t.col("id");
        let renamed = e.rename("x");

        assert_eq!(Some("id"), e.name());
        assert_eq!(Some("x"), renamed.name());
        assert_eq!(None, e.as_name());
        assert_eq!("t.id", e.to_string());
        assert_eq!("t.id AS x", renamed.to_string());
        assert_eq!(e.serialize(), renamed.serialize());
    }

    #[test]
    fn tracks_two_relations() {
        let t1 = table("t1");
        let t2 = table("t2");

        let expr = t1.col("id").eq(t2.col("id"));
        assert_eq!("(t1.id = t2.id)", expr.serialize());
        assert_eq!("t1", expr.dataframe().unwrap().name());
        assert_eq!("t2", expr.other_dataframe().unwrap().name());

        let same = t1.col("a").eq(t1.col("b"));
        assert_eq!("t1", same.dataframe().unwrap().name());
        assert!(same.other_dataframe().is_none());

        let constant = eq(lit(1), lit(1));
        assert!(constant.dataframe().is_none());
    }

    #[test]
    fn like_pattern() {
        let t = table("t");
        assert_eq!("(t.id LIKE 'a%')", t.col("id").like("a%").serialize());
    }

    #[test]
    fn cast_with_modifier() {
        let varchar_5 = DataType::new("varchar").with_modifier(5);
        let expr = varchar_5.cast("Hello world!");
        assert_eq!("CAST('Hello world!' AS varchar(5))", expr.serialize());
    }
}
