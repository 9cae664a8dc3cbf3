//! Blocking gateway to Greenplum/PostgreSQL over `tokio-postgres`.

pub mod config;

use std::sync::Arc;

use gpframe_core::Database;
use gpframe_core::gateway::{Gateway, TextRow};
use gpframe_error::{Result, ResultExt};
use tokio::runtime::Runtime;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};
use tracing::debug;

pub use config::ConnectionConfig;

/// A single connection, driven by a private current-thread runtime.
///
/// Every call blocks the calling thread until the server responds.
#[derive(Debug)]
pub struct PostgresGateway {
    runtime: Runtime,
    client: Client,
}

impl PostgresGateway {
    pub fn connect(conf: &ConnectionConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to build tokio runtime")?;

        let (client, connection) = runtime
            .block_on(conf.driver_config().connect(NoTls))
            .context_fn(|| format!("Failed to connect to {conf}"))?;

        // Only polled while the runtime is blocked on a client call.
        runtime.spawn(async move {
            if let Err(e) = connection.await {
                debug!(%e, "postgres connection errored");
            }
        });

        debug!(%conf, "connected");

        Ok(PostgresGateway { runtime, client })
    }

    fn simple_query(&self, sql: &str) -> Result<Vec<TextRow>> {
        let messages = self
            .runtime
            .block_on(self.client.simple_query(sql))
            .context("Failed to execute query")?;

        Ok(messages
            .into_iter()
            .filter_map(|msg| match msg {
                SimpleQueryMessage::Row(row) => {
                    Some((0..row.len()).map(|idx| row.get(idx).map(|v| v.to_string())).collect())
                }
                _ => None,
            })
            .collect())
    }

    /// Run with parameters bound as `text`.
    ///
    /// Placeholders compared against non-text columns need an explicit cast
    /// in the statement, e.g. `$1::int`. Output columns must be text.
    fn typed_query(&self, sql: &str, params: &[String]) -> Result<Vec<TextRow>> {
        let params: Vec<(&(dyn ToSql + Sync), Type)> = params
            .iter()
            .map(|p| (p as &(dyn ToSql + Sync), Type::TEXT))
            .collect();

        let rows = self
            .runtime
            .block_on(self.client.query_typed(sql, &params))
            .context("Failed to execute query")?;

        rows.into_iter()
            .map(|row| {
                (0..row.len())
                    .map(|idx| {
                        row.try_get::<_, Option<String>>(idx)
                            .context("Output columns of parameterized queries must be text")
                    })
                    .collect::<Result<TextRow>>()
            })
            .collect()
    }
}

impl Gateway for PostgresGateway {
    fn execute(
        &self,
        sql: &str,
        params: &[String],
        expects_rows: bool,
    ) -> Result<Option<Vec<TextRow>>> {
        let rows = if params.is_empty() {
            if !expects_rows {
                self.runtime
                    .block_on(self.client.batch_execute(sql))
                    .context("Failed to execute statement")?;
                return Ok(None);
            }
            self.simple_query(sql)?
        } else {
            self.typed_query(sql, params)?
        };

        Ok(expects_rows.then_some(rows))
    }
}

/// Connect and wrap the connection in a [`Database`].
pub fn connect(conf: &ConnectionConfig) -> Result<Database> {
    let gateway = PostgresGateway::connect(conf)?;
    Ok(Database::new(Arc::new(gateway)))
}
