//! Deploying a function body to the database and applying it per group.
//!
//! The input relation is aggregated per group into arrays, the function is
//! called once per group on those arrays, and its composite result is
//! expanded into columns. The temporary type and function definitions only
//! live for the duration of one transaction.

use gpframe_error::{DbError, Result};
use tracing::debug;

use crate::dataframe::DataFrame;
use crate::literal::Literal;
use crate::naming::{self, quote_ident};
use crate::row::Row;

/// Distribution clause for a generated table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Distribution {
    Randomly,
    By(Vec<String>),
}

impl Distribution {
    fn clause(&self) -> String {
        match self {
            Self::Randomly => "DISTRIBUTED RANDOMLY".to_string(),
            Self::By(cols) => format!("DISTRIBUTED BY ({})", cols.join(", ")),
        }
    }
}

/// Shape of the function result, and optionally where to store it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutputSpec {
    /// Fields of the composite result type, as `(name, sql type)`.
    pub signature: Vec<(String, String)>,
    /// Store results in this table instead of returning them.
    pub table: Option<String>,
    pub case_sensitive: bool,
    pub distribution: Option<Distribution>,
}

impl OutputSpec {
    pub fn new<I, N, T>(signature: I) -> Self
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<String>,
    {
        OutputSpec {
            signature: signature
                .into_iter()
                .map(|(n, t)| (n.into(), t.into()))
                .collect(),
            ..Default::default()
        }
    }

    pub fn into_table(mut self, name: impl Into<String>) -> Self {
        self.table = Some(name.into());
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn distribution(mut self, distribution: Distribution) -> Self {
        self.distribution = Some(distribution);
        self
    }

    fn table_name(&self) -> Option<String> {
        let name = self.table.as_deref().filter(|n| !n.is_empty())?;
        Some(if self.case_sensitive {
            quote_ident(name)
        } else {
            name.to_string()
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ExtraArg {
    name: String,
    sql_type: String,
    value: Literal,
}

/// Result of running a deployment.
#[derive(Debug, Clone)]
pub enum DeploymentOutput {
    /// Rows returned by the function, one per group.
    Rows(Vec<Row>),
    /// The table the rows were written to.
    Table(DataFrame),
}

/// Statements making up one deployment, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPlan {
    pub drop_table: Option<String>,
    pub create_type: String,
    pub create_function: String,
    pub select: String,
    pub drop_type: String,
}

/// A function body applied to each group of a relation.
#[derive(Debug, Clone)]
pub struct FunctionDeployment {
    dataframe: DataFrame,
    body: String,
    group_by: Option<String>,
    input_columns: Vec<(String, String)>,
    extra_args: Vec<ExtraArg>,
    language: String,
    container: Option<String>,
    output: OutputSpec,
    clear_existing: bool,
}

impl FunctionDeployment {
    pub fn new(dataframe: &DataFrame, body: impl Into<String>) -> Self {
        FunctionDeployment {
            dataframe: dataframe.clone(),
            body: body.into(),
            group_by: None,
            input_columns: Vec::new(),
            extra_args: Vec::new(),
            language: "plpythonu".to_string(),
            container: None,
            output: OutputSpec::default(),
            clear_existing: true,
        }
    }

    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by = Some(column.into());
        self
    }

    /// Add an input column. The function receives it as an array of
    /// `sql_type`.
    pub fn input_column(mut self, name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        self.input_columns.push((name.into(), sql_type.into()));
        self
    }

    /// Add a constant argument passed to every call.
    pub fn extra_arg(
        mut self,
        name: impl Into<String>,
        sql_type: impl Into<String>,
        value: impl Into<Literal>,
    ) -> Self {
        self.extra_args.push(ExtraArg {
            name: name.into(),
            sql_type: sql_type.into(),
            value: value.into(),
        });
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Run the function inside the given PL/Container runtime.
    pub fn container(mut self, runtime_id: impl Into<String>) -> Self {
        self.language = "plcontainer".to_string();
        self.container = Some(runtime_id.into());
        self
    }

    pub fn output(mut self, output: OutputSpec) -> Self {
        self.output = output;
        self
    }

    /// Drop an existing output table before creating it. Defaults to true.
    pub fn clear_existing(mut self, clear_existing: bool) -> Self {
        self.clear_existing = clear_existing;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.body.trim().is_empty() {
            return Err(DbError::new("No function body provided"));
        }
        if self.group_by.as_deref().is_none_or(str::is_empty) {
            return Err(DbError::new("Group by index must be provided"));
        }
        if self.output.signature.is_empty() {
            return Err(DbError::new("Output signature must be provided"));
        }
        if self.input_columns.is_empty() {
            return Err(DbError::new("At least one input column must be provided"));
        }
        Ok(())
    }

    /// Generate the statements without running them.
    pub fn plan(&self) -> Result<DeploymentPlan> {
        self.validate()?;
        let group_by = self.group_by.as_deref().unwrap_or_default();

        let type_name = naming::unique_name("type");
        let function_name = naming::unique_name("func");

        let fields: Vec<String> = self
            .output
            .signature
            .iter()
            .map(|(name, ty)| format!("{name} {ty}"))
            .collect();
        let create_type = format!("CREATE TYPE {type_name} AS ({})", fields.join(", "));

        let mut params: Vec<String> = self
            .input_columns
            .iter()
            .map(|(name, ty)| format!("{name} {ty}[]"))
            .collect();
        params.extend(
            self.extra_args
                .iter()
                .map(|arg| format!("{} {}", arg.name, arg.sql_type)),
        );

        let header = match &self.container {
            Some(id) => format!("# container: {id}\n"),
            None => String::new(),
        };
        let create_function = format!(
            "CREATE OR REPLACE FUNCTION {function_name}({}) RETURNS {type_name} \
             AS $$\n{header}{}\n$$ LANGUAGE {}",
            params.join(", "),
            self.body,
            self.language,
        );

        let aggs: Vec<String> = self
            .input_columns
            .iter()
            .map(|(name, _)| format!("array_agg({name}) AS {name}"))
            .collect();
        let mut args: Vec<String> = self
            .input_columns
            .iter()
            .map(|(name, _)| name.clone())
            .collect();
        args.extend(self.extra_args.iter().map(|arg| arg.value.serialize()));

        let source = self.dataframe.name();
        let query = format!(
            "WITH {source} AS ({}), \
             gpdbtmpa AS (SELECT ({function_name}({})) AS gpdbtmpb \
             FROM (SELECT {} FROM {source} GROUP BY {group_by}) tmptbl) \
             SELECT (gpdbtmpb::{type_name}).* FROM gpdbtmpa",
            self.dataframe.build_full_query(),
            args.join(", "),
            aggs.join(", "),
        );

        let (drop_table, select) = match self.output.table_name() {
            Some(table) => {
                let drop = self
                    .clear_existing
                    .then(|| format!("DROP TABLE IF EXISTS {table}"));
                let mut create = format!("CREATE TABLE {table} AS {query}");
                if let Some(dist) = &self.output.distribution {
                    create.push(' ');
                    create.push_str(&dist.clause());
                }
                (drop, create)
            }
            None => (
                None,
                format!("SELECT to_json(gpdbtmpc)::TEXT FROM ({query}) AS gpdbtmpc"),
            ),
        };

        Ok(DeploymentPlan {
            drop_table,
            create_type,
            create_function,
            select,
            drop_type: format!("DROP TYPE {type_name} CASCADE"),
        })
    }

    /// Run the deployment in a single transaction.
    ///
    /// Any failure rolls back every statement, including the type and function
    /// definitions.
    pub fn run(&self) -> Result<DeploymentOutput> {
        let plan = self.plan()?;
        let db = self.dataframe.database().ok_or_else(|| {
            DbError::new("Relation is not attached to a database")
                .with_field("relation", self.dataframe.name())
        })?;

        debug!(relation = %self.dataframe.name(), "deploying function");

        db.transaction(|db| {
            if let Some(drop) = &plan.drop_table {
                db.execute_statement(drop)?;
            }
            db.execute_statement(&plan.create_type)?;
            db.execute_statement(&plan.create_function)?;

            let output = match self.output.table.as_deref().filter(|n| !n.is_empty()) {
                Some(table) => {
                    db.execute_statement(&plan.select)?;
                    // Unquoted identifiers are folded to lower case.
                    let name = if self.output.case_sensitive {
                        table.to_string()
                    } else {
                        table.to_lowercase()
                    };
                    DeploymentOutput::Table(db.create_dataframe_from_table(&name))
                }
                None => {
                    let rows = db
                        .query_rows(&plan.select)?
                        .into_iter()
                        .map(|row| match row.into_iter().next().flatten() {
                            Some(text) => Row::from_json(&text),
                            None => Err(DbError::new("Row is missing its JSON column")),
                        })
                        .collect::<Result<Vec<_>>>()?;
                    DeploymentOutput::Rows(rows)
                }
            };

            db.execute_statement(&plan.drop_type)?;
            Ok(output)
        })
    }
}
