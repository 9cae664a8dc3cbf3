use std::fmt;
use std::str::FromStr;

use gpframe_error::{DbError, Result};

use super::DataFrame;
use crate::expr::Expr;
use crate::naming;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl FromStr for JoinType {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "" | "INNER" => Self::Inner,
            "LEFT" => Self::Left,
            "RIGHT" => Self::Right,
            "FULL" => Self::Full,
            "CROSS" => Self::Cross,
            _ => return Err(DbError::new("Unsupported join type").with_field("join_type", s)),
        })
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner => write!(f, "INNER"),
            Self::Left => write!(f, "LEFT"),
            Self::Right => write!(f, "RIGHT"),
            Self::Full => write!(f, "FULL"),
            Self::Cross => write!(f, "CROSS"),
        }
    }
}

/// A column taken from one side of a join, optionally renamed.
///
/// The name `"*"` selects every column of that side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinColumn {
    pub name: String,
    pub alias: Option<String>,
}

impl JoinColumn {
    pub fn new(name: impl Into<String>) -> Self {
        JoinColumn {
            name: name.into(),
            alias: None,
        }
    }

    pub fn rename(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

impl From<&str> for JoinColumn {
    fn from(value: &str) -> Self {
        JoinColumn::new(value)
    }
}

impl From<String> for JoinColumn {
    fn from(value: String) -> Self {
        JoinColumn::new(value)
    }
}

type JoinCondition = Box<dyn FnOnce(&DataFrame, &DataFrame) -> Expr>;

/// How two relations are joined.
///
/// At most one of `on` and `using` may be set. A cross join takes neither,
/// every other join type requires one of them.
pub struct JoinSpec {
    how: JoinType,
    on: Option<JoinCondition>,
    using: Option<Vec<String>>,
    self_columns: Vec<JoinColumn>,
    other_columns: Vec<JoinColumn>,
}

impl Default for JoinSpec {
    fn default() -> Self {
        JoinSpec {
            how: JoinType::Inner,
            on: None,
            using: None,
            self_columns: vec![JoinColumn::new("*")],
            other_columns: vec![JoinColumn::new("*")],
        }
    }
}

impl fmt::Debug for JoinSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinSpec")
            .field("how", &self.how)
            .field("on", &self.on.is_some())
            .field("using", &self.using)
            .field("self_columns", &self.self_columns)
            .field("other_columns", &self.other_columns)
            .finish()
    }
}

impl JoinSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn how(mut self, how: JoinType) -> Self {
        self.how = how;
        self
    }

    /// Join on a condition. The condition receives the left relation and the
    /// right relation, in that order.
    pub fn on<F>(mut self, cond: F) -> Self
    where
        F: FnOnce(&DataFrame, &DataFrame) -> Expr + 'static,
    {
        self.on = Some(Box::new(cond));
        self
    }

    /// Join on columns with the same name on both sides.
    pub fn using<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.using = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn self_columns<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<JoinColumn>,
    {
        self.self_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn other_columns<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<JoinColumn>,
    {
        self.other_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    fn validate(&self) -> Result<()> {
        match (&self.how, &self.on, &self.using) {
            (_, Some(_), Some(_)) => {
                Err(DbError::new("Cannot specify a join condition and USING together"))
            }
            (JoinType::Cross, None, None) => Ok(()),
            (JoinType::Cross, _, _) => Err(DbError::new(
                "Cross join cannot have a join condition or USING columns",
            )),
            (how, None, None) => {
                Err(DbError::new("Join requires a condition or USING columns")
                    .with_field("join_type", how))
            }
            (_, _, Some(using)) if using.is_empty() => {
                Err(DbError::new("USING requires at least one column"))
            }
            _ => Ok(()),
        }
    }
}

fn bind_columns(df: &DataFrame, columns: &[JoinColumn]) -> Vec<String> {
    columns
        .iter()
        .map(|col| {
            let expr = df.col(col.name.as_str());
            match &col.alias {
                Some(alias) => format!("{} AS {alias}", expr.serialize()),
                None => expr.serialize(),
            }
        })
        .collect()
}

impl DataFrame {
    /// Join this relation with another.
    ///
    /// Joining a relation with itself aliases the right side under a generated
    /// name. Columns and conditions on the right side then refer to that
    /// alias.
    pub fn join(&self, other: &DataFrame, spec: JoinSpec) -> Result<DataFrame> {
        spec.validate()?;

        let self_join = self.name() == other.name();
        let other_ref = if self_join {
            DataFrame::alias(naming::unique_name(&naming::prefix_for(self.database())))
        } else {
            other.clone()
        };

        let mut targets = bind_columns(self, &spec.self_columns);
        targets.extend(bind_columns(&other_ref, &spec.other_columns));
        if targets.is_empty() {
            return Err(DbError::new("Join must select at least one column"));
        }

        let other_clause = if self_join {
            format!("{} AS {}", other.name(), other_ref.name())
        } else {
            other.name().to_string()
        };

        let mut query = format!(
            "SELECT {} FROM {} {} JOIN {other_clause}",
            targets.join(", "),
            self.name(),
            spec.how,
        );
        if let Some(cond) = spec.on {
            query.push_str(&format!(" ON {}", cond(self, &other_ref).serialize()));
        }
        if let Some(using) = &spec.using {
            query.push_str(&format!(" USING ({})", using.join(", ")));
        }

        Ok(DataFrame::new(
            query,
            vec![self.clone(), other.clone()],
            None,
            None,
        ))
    }

    pub fn inner_join(&self, other: &DataFrame, spec: JoinSpec) -> Result<DataFrame> {
        self.join(other, spec.how(JoinType::Inner))
    }

    pub fn left_join(&self, other: &DataFrame, spec: JoinSpec) -> Result<DataFrame> {
        self.join(other, spec.how(JoinType::Left))
    }

    pub fn right_join(&self, other: &DataFrame, spec: JoinSpec) -> Result<DataFrame> {
        self.join(other, spec.how(JoinType::Right))
    }

    pub fn full_join(&self, other: &DataFrame, spec: JoinSpec) -> Result<DataFrame> {
        self.join(other, spec.how(JoinType::Full))
    }

    /// Cartesian product. Any condition or USING columns on `spec` are
    /// discarded.
    pub fn cross_join(&self, other: &DataFrame, mut spec: JoinSpec) -> Result<DataFrame> {
        spec.on = None;
        spec.using = None;
        self.join(other, spec.how(JoinType::Cross))
    }
}
