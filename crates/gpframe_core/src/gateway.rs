//! Interface to the database executing generated statements.

use std::fmt::Debug;

use gpframe_error::Result;
use tracing::warn;

/// A single result row in text format, one entry per output column.
pub type TextRow = Vec<Option<String>>;

/// Executes SQL text against a database.
///
/// Calls block until the database responds. Implementations are not expected
/// to pool connections; callers sharing a gateway across threads are
/// responsible for serializing transactional work.
pub trait Gateway: Debug + Sync + Send {
    /// Execute a statement.
    ///
    /// Returns `Some(rows)` when `expects_rows` is true, `None` otherwise.
    /// Parameters are bound positionally as text.
    fn execute(&self, sql: &str, params: &[String], expects_rows: bool)
    -> Result<Option<Vec<TextRow>>>;

    fn begin(&self) -> Result<()> {
        self.execute("BEGIN", &[], false).map(|_| ())
    }

    fn commit(&self) -> Result<()> {
        self.execute("COMMIT", &[], false).map(|_| ())
    }

    fn rollback(&self) -> Result<()> {
        self.execute("ROLLBACK", &[], false).map(|_| ())
    }
}

/// Run `f` inside a transaction.
///
/// Commits if `f` succeeds. If `f` (or the commit) fails, the transaction is
/// rolled back and the original error is returned.
pub fn with_transaction<G, T, F>(gateway: &G, f: F) -> Result<T>
where
    G: Gateway + ?Sized,
    F: FnOnce(&G) -> Result<T>,
{
    gateway.begin()?;

    let result = f(gateway).and_then(|v| {
        gateway.commit()?;
        Ok(v)
    });

    match result {
        Ok(v) => Ok(v),
        Err(e) => {
            if let Err(rollback_err) = gateway.rollback() {
                warn!(%rollback_err, original = %e, "failed to roll back transaction");
            }
            Err(e)
        }
    }
}
