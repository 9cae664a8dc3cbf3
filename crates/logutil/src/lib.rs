//! Utilities for logging.

use std::io;

use tracing::level_filters::LevelFilter;
use tracing::subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    HumanReadable,
    Json,
}

/// Map a `-v` count to a level.
pub fn level_from_verbosity(verbose: u8) -> tracing::Level {
    match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }
}

/// Configure the global logger.
///
/// `RUST_LOG` takes precedence over the provided default level when set.
///
/// Errors configuring the logger are ignored, which allows this to be called
/// more than once.
pub fn configure_global_logger<W>(default_level: tracing::Level, format: LogFormat, writer: W)
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let mut env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(default_level).into())
        .from_env_lossy();
    // Connection chatter from the driver is only interesting when asked for.
    if let Ok(directive) = "tokio_postgres=warn".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let _ = match format {
        LogFormat::HumanReadable => subscriber::set_global_default(builder.finish()),
        LogFormat::Json => subscriber::set_global_default(builder.json().finish()),
    };
}

/// Initialize a logger for tests, writing to stderr at DEBUG.
pub fn init_test() {
    configure_global_logger(tracing::Level::DEBUG, LogFormat::HumanReadable, io::stderr);
}
