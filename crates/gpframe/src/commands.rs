use std::io::Write;

use clap::Subcommand;
use gpframe_core::order::OrderKey;
use gpframe_core::{DataFrame, Database};
use gpframe_error::Result;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print rows of a table as JSON, one row per line.
    Show {
        table: String,
        /// Maximum number of rows to print.
        #[clap(short = 'n', long, default_value_t = 10)]
        limit: u64,
        /// Order rows by this column before limiting.
        #[clap(long)]
        order_by: Option<String>,
    },
    /// Print the column names of a table.
    Columns { table: String },
    /// Print the plan for scanning a table.
    Explain {
        table: String,
        #[clap(long, default_value = "TEXT")]
        format: String,
    },
}

impl Command {
    pub fn run(&self, db: &Database, out: &mut impl Write) -> Result<()> {
        match self {
            Self::Show {
                table,
                limit,
                order_by,
            } => {
                let df = db.create_dataframe_from_table(table);
                let limited = match order_by {
                    Some(col) => df.order_by(OrderKey::new(col.as_str()))?.head(*limit),
                    None => df.slice(..*limit)?,
                };
                write_rows(&limited, out)
            }
            Self::Columns { table } => {
                let names = db.create_dataframe_from_table(table).column_names()?;
                for row in names.fetch()?.iter() {
                    if let Some(name) = row.get("column_name").and_then(|v| v.as_str()) {
                        writeln!(out, "{name}")?;
                    }
                }
                Ok(())
            }
            Self::Explain { table, format } => {
                for line in db.create_dataframe_from_table(table).explain(format)? {
                    writeln!(out, "{line}")?;
                }
                Ok(())
            }
        }
    }
}

fn write_rows(df: &DataFrame, out: &mut impl Write) -> Result<()> {
    for row in df.fetch()?.iter() {
        writeln!(out, "{row}")?;
    }
    out.flush()?;
    Ok(())
}
