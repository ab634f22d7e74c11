//! The database connection seam.

use modelsync_core::{Dialect, LiveColumn, Record};

use crate::error::Result;

/// A database a model can be reconciled against and queried through.
///
/// Implementations own their pooling; every method takes `&self` so one
/// connection can be shared behind an `Arc` by many models.
#[allow(async_fn_in_trait)]
pub trait Connection: Send + Sync {
    /// The dialect used to render statements for this database.
    type Dialect: Dialect;

    /// Returns the dialect.
    fn dialect(&self) -> &Self::Dialect;

    /// Opens the connection. Calling it on an open connection does nothing.
    async fn connect(&self) -> Result<()>;

    /// Closes the connection. Calling it on a closed connection does nothing.
    async fn disconnect(&self) -> Result<()>;

    /// Describes the live columns of a table, in ordinal order.
    ///
    /// Returns an empty list when the table doesn't exist.
    async fn describe_table(&self, table: &str) -> Result<Vec<LiveColumn>>;

    /// Executes a statement and returns the number of affected rows.
    async fn execute(&self, statement: &str) -> Result<u64>;

    /// Runs a statement and returns its rows.
    async fn query(&self, statement: &str) -> Result<Vec<Record>>;

    /// Returns whether `INSERT ... RETURNING` is available.
    async fn supports_returning(&self) -> Result<bool>;
}
