//! Schema reconciliation against a live connection.

use modelsync_core::{diff_table, Dialect, Plan, TableSchema};
use tracing::{debug, info};

use crate::connection::Connection;
use crate::error::Result;

/// Describes the live table and diffs it against `schema` without applying
/// anything.
///
/// # Errors
///
/// Returns an error if the table can't be described or the live state can't
/// be reconciled.
pub async fn plan<C: Connection>(connection: &C, schema: &TableSchema) -> Result<Plan> {
    let live = connection.describe_table(schema.name()).await?;
    Ok(diff_table(schema, &live)?)
}

/// Brings the live table in line with `schema` and returns the plan that was
/// applied. An empty plan issues no statement.
///
/// # Errors
///
/// See [`plan`]; execution errors are passed through.
pub async fn reconcile<C: Connection>(connection: &C, schema: &TableSchema) -> Result<Plan> {
    let plan = plan(connection, schema).await?;
    match connection.dialect().plan_sql(&plan) {
        Some(sql) => {
            info!(
                table = %schema.name(),
                create = matches!(plan, Plan::CreateTable(_)),
                "Applying schema changes"
            );
            connection.execute(&sql).await?;
        }
        None => debug!(table = %schema.name(), "Table is up to date"),
    }
    Ok(plan)
}
