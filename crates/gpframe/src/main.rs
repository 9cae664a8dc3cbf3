mod commands;

use std::io;

use clap::Parser;
use gpframe_error::Result;
use gpframe_postgres::ConnectionConfig;

use crate::commands::Command;

#[derive(Parser)]
#[clap(name = "gpframe")]
struct Arguments {
    /// Connection string, either a `postgres://` url or `key=value` pairs.
    ///
    /// If omitted, connection parameters are read from the standard `PG*`
    /// environment variables.
    #[clap(short = 'c', long, env = "GPFRAME_CONN")]
    connection: Option<String>,
    /// Increase log verbosity. May be repeated.
    #[clap(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Emit logs as JSON.
    #[clap(long)]
    log_json: bool,
    /// Log every generated statement.
    #[clap(long)]
    print_sql: bool,
    #[clap(subcommand)]
    command: Command,
}

/// Inspect tables in a Greenplum or PostgreSQL database.
fn main() {
    let args = Arguments::parse();
    let format = if args.log_json {
        logutil::LogFormat::Json
    } else {
        logutil::LogFormat::HumanReadable
    };
    logutil::configure_global_logger(
        logutil::level_from_verbosity(args.verbose),
        format,
        io::stderr,
    );

    if let Err(err) = inner(args) {
        eprintln!("ERROR: {err}");
        std::process::exit(1);
    }
}

fn inner(args: Arguments) -> Result<()> {
    let conf = match &args.connection {
        Some(conn) => ConnectionConfig::parse(conn)?,
        None => ConnectionConfig::from_env()?,
    };
    tracing::info!(%conf, "connecting");

    let db = gpframe_postgres::connect(&conf)?;
    if args.print_sql {
        db.set_setting("print_sql", "true")?;
    }

    let mut stdout = io::stdout().lock();
    args.command.run(&db, &mut stdout)
}
