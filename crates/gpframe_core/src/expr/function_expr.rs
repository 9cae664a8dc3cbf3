use std::fmt;

use gpframe_error::{DbError, Result};

use super::Expr;
use crate::database::Database;
use crate::dataframe::DataFrame;
use crate::group::DataFrameGroupingSets;
use crate::naming;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    Scalar,
    Aggregate,
}

/// A function defined in the database, referenced by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionDef {
    pub name: String,
    pub kind: FunctionKind,
}

/// Reference a scalar (or set returning) function by name.
pub fn function(name: impl Into<String>) -> FunctionDef {
    FunctionDef {
        name: name.into(),
        kind: FunctionKind::Scalar,
    }
}

/// Reference an aggregate function by name.
pub fn aggregate(name: impl Into<String>) -> FunctionDef {
    FunctionDef {
        name: name.into(),
        kind: FunctionKind::Aggregate,
    }
}

impl FunctionDef {
    /// Build a call to this function.
    pub fn call<I, E>(&self, args: I) -> FunctionExpr
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        self.build_call(args, false)
    }

    /// Build a `name(DISTINCT ...)` call. Only valid for aggregates.
    pub fn call_distinct<I, E>(&self, args: I) -> Result<FunctionExpr>
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        if self.kind != FunctionKind::Aggregate {
            return Err(DbError::new("DISTINCT is only valid for aggregate functions")
                .with_field("function", &self.name));
        }
        Ok(self.build_call(args, true))
    }

    fn build_call<I, E>(&self, args: I, distinct: bool) -> FunctionExpr
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        FunctionExpr {
            call: CallExpr {
                name: self.name.clone(),
                args: args.into_iter().map(Into::into).collect(),
                distinct,
            },
            kind: self.kind,
            dataframe: None,
            group_by: None,
        }
    }
}

/// A function call expression, `name(arg, ...)`.
#[derive(Debug, Clone)]
pub struct CallExpr {
    pub name: String,
    pub args: Vec<Expr>,
    pub distinct: bool,
}

impl fmt::Display for CallExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        for (idx, arg) in self.args.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg.serialize())?;
        }
        write!(f, ")")
    }
}

/// A function call that can be applied to a relation, producing a new
/// relation.
///
/// Calls with no arguments referencing a relation (e.g. `count(*)` or
/// `generate_series(0, 9)`) carry no information about where they should be
/// evaluated, so the relation is bound explicitly with `bind`.
#[derive(Debug, Clone)]
pub struct FunctionExpr {
    call: CallExpr,
    kind: FunctionKind,
    dataframe: Option<DataFrame>,
    group_by: Option<DataFrameGroupingSets>,
}

impl FunctionExpr {
    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    pub fn serialize(&self) -> String {
        self.call.to_string()
    }

    /// Bind this call to a relation.
    pub fn bind(mut self, dataframe: &DataFrame) -> Self {
        self.dataframe = Some(dataframe.clone());
        self
    }

    /// Bind this call to grouping sets, evaluating it once per group.
    pub fn bind_group_by(mut self, group_by: &DataFrameGroupingSets) -> Self {
        self.dataframe = Some(group_by.dataframe().clone());
        self.group_by = Some(group_by.clone());
        self
    }

    pub fn into_expr(self) -> Expr {
        Expr::call(self.call)
    }

    /// Evaluate the call against the bound relation.
    ///
    /// With `expand`, a composite result is expanded into one column per
    /// field.
    pub fn apply(&self, expand: bool, as_name: Option<&str>) -> Result<DataFrame> {
        self.apply_inner(expand, as_name, None)
    }

    pub(crate) fn apply_inner(
        &self,
        expand: bool,
        as_name: Option<&str>,
        db: Option<&Database>,
    ) -> Result<DataFrame> {
        let as_expr = Expr::call(self.call.clone());
        let dataframe = self
            .dataframe
            .clone()
            .or_else(|| as_expr.dataframe().cloned());

        if let (Some(group_by), Some(dataframe)) = (&self.group_by, &dataframe) {
            if group_by.dataframe().name() != dataframe.name() {
                return Err(DbError::new(
                    "Grouping sets must be over the relation the function is applied to",
                )
                .with_field("function", &self.call.name)
                .with_field("relation", dataframe.name()));
            }
        }

        let db = db
            .cloned()
            .or_else(|| dataframe.as_ref().and_then(|df| df.database().cloned()));
        let prefix = naming::prefix_for(db.as_ref());

        let mut parents: Vec<DataFrame> = dataframe.iter().cloned().collect();
        for arg_df in self
            .call
            .args
            .iter()
            .flat_map(|arg| [arg.dataframe(), arg.other_dataframe()])
            .flatten()
        {
            if !parents.iter().any(|p| p.name() == arg_df.name()) {
                parents.push(arg_df.clone());
            }
        }

        let group_columns = self
            .group_by
            .as_ref()
            .map(|g| g.targets())
            .unwrap_or_default();
        let alias = match as_name {
            Some(name) => Some(name.to_string()),
            None if expand => Some(naming::unique_name("func")),
            None => None,
        };

        let mut targets: Vec<String> = match &dataframe {
            Some(df) => group_columns
                .iter()
                .map(|col| df.col(col).serialize())
                .collect(),
            None => Vec::new(),
        };
        targets.push(match &alias {
            Some(alias) => format!("{} AS {alias}", self.serialize()),
            None => self.serialize(),
        });

        let from_clause = match &dataframe {
            Some(df) => format!(" FROM {}", df.name()),
            None => String::new(),
        };
        let group_clause = match &self.group_by {
            Some(group_by) => format!(" {}", group_by.group_by_clause()),
            None => String::new(),
        };

        let inner = format!("SELECT {}{from_clause}{group_clause}", targets.join(", "));

        let query = match (expand, alias) {
            (true, Some(alias)) => {
                let mut outer: Vec<String> = group_columns;
                outer.push(format!("({alias}).*"));
                format!(
                    "SELECT {} FROM ({inner}) AS {}",
                    outer.join(", "),
                    naming::unique_name(&prefix),
                )
            }
            _ => inner,
        };

        Ok(DataFrame::new(query, parents, None, db))
    }
}
