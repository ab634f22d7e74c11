//! SQL generation.
//!
//! The [`Dialect`] trait owns identifier and literal escaping plus the
//! dialect-specific DDL pieces; statement assembly that only needs those is
//! provided on top.

mod mariadb;

pub use mariadb::MariaDbDialect;

use crate::diff::{CreateTable, Operation, Plan};
use crate::mapping::{ForeignKeyTarget, PhysicalColumn};
use crate::value::Value;

/// Trait for dialect-specific SQL generation.
pub trait Dialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Quotes an identifier (table or column name).
    fn escape_identifier(&self, name: &str) -> String;

    /// Renders a value as an inline SQL literal. Lists render as a
    /// comma-separated sequence without parentheses.
    fn escape_literal(&self, value: &Value) -> String;

    /// Generates a column definition for CREATE TABLE, ADD COLUMN and
    /// CHANGE COLUMN.
    fn column_definition(&self, name: &str, column: &PhysicalColumn) -> String;

    /// Generates one clause of an ALTER TABLE statement.
    fn alter_clause(&self, operation: &Operation) -> String;

    /// Generates an insert that updates `update_fields` when the row already
    /// exists, or does nothing on conflict when `update_fields` is empty.
    fn upsert_sql(
        &self,
        table: &str,
        record: &[(String, Value)],
        update_fields: &[String],
        returning: bool,
    ) -> String;

    /// Quotes and joins identifiers.
    fn identifier_list(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|n| self.escape_identifier(n))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Generates a foreign key constraint named after its column.
    fn foreign_key_constraint(&self, column: &str, target: &ForeignKeyTarget) -> String {
        let column = self.escape_identifier(column);
        let mut sql = format!(
            "CONSTRAINT {column} FOREIGN KEY ({column}) REFERENCES {} ({})",
            self.escape_identifier(&target.table),
            self.escape_identifier(&target.field)
        );
        if let Some(action) = target.on_delete {
            sql.push_str(" ON DELETE ");
            sql.push_str(action.as_sql());
        }
        if let Some(action) = target.on_update {
            sql.push_str(" ON UPDATE ");
            sql.push_str(action.as_sql());
        }
        sql
    }

    /// Generates SQL for CREATE TABLE.
    fn create_table_sql(&self, create: &CreateTable) -> String {
        let mut parts: Vec<String> = create
            .columns
            .iter()
            .map(|(name, column)| self.column_definition(name, column))
            .collect();
        if !create.primary_key.is_empty() {
            parts.push(format!(
                "PRIMARY KEY ({})",
                self.identifier_list(&create.primary_key)
            ));
        }
        for name in &create.unique {
            parts.push(format!(
                "UNIQUE INDEX {} ({})",
                self.escape_identifier(name),
                self.escape_identifier(name)
            ));
        }
        for (column, target) in &create.foreign_keys {
            parts.push(self.foreign_key_constraint(column, target));
        }
        format!(
            "CREATE TABLE {} ({})",
            self.escape_identifier(&create.name),
            parts.join(", ")
        )
    }

    /// Generates a single ALTER TABLE statement applying every operation in
    /// order.
    fn alter_table_sql(&self, table: &str, operations: &[Operation]) -> String {
        let clauses: Vec<String> = operations.iter().map(|op| self.alter_clause(op)).collect();
        format!(
            "ALTER TABLE {} {}",
            self.escape_identifier(table),
            clauses.join(", ")
        )
    }

    /// Generates the statement for a plan, or `None` for an empty plan.
    fn plan_sql(&self, plan: &Plan) -> Option<String> {
        match plan {
            Plan::CreateTable(create) => Some(self.create_table_sql(create)),
            Plan::Alter { operations, .. } if operations.is_empty() => None,
            Plan::Alter { table, operations } => Some(self.alter_table_sql(table, operations)),
        }
    }

    /// Generates a SELECT. `fields` of `None` selects every column.
    fn select_sql(
        &self,
        table: &str,
        fields: Option<&[String]>,
        filter: Option<&str>,
        limit: Option<u64>,
    ) -> String {
        let columns = fields.map_or_else(|| "*".to_string(), |f| self.identifier_list(f));
        let mut sql = format!("SELECT {columns} FROM {}", self.escape_identifier(table));
        if let Some(filter) = filter {
            sql.push_str(" WHERE ");
            sql.push_str(filter);
        }
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        sql
    }

    /// Generates an INSERT, optionally returning the stored row.
    fn insert_sql(&self, table: &str, record: &[(String, Value)], returning: bool) -> String {
        let (columns, values) = self.columns_and_values(record);
        let mut sql = format!(
            "INSERT INTO {} ({columns}) VALUES ({values})",
            self.escape_identifier(table)
        );
        if returning {
            sql.push_str(" RETURNING *");
        }
        sql
    }

    /// Generates an UPDATE of the rows matched by `filter`.
    fn update_sql(&self, table: &str, assignments: &[(String, Value)], filter: &str) -> String {
        let set: Vec<String> = assignments
            .iter()
            .map(|(name, value)| {
                format!(
                    "{} = {}",
                    self.escape_identifier(name),
                    self.escape_literal(value)
                )
            })
            .collect();
        format!(
            "UPDATE {} SET {} WHERE {filter}",
            self.escape_identifier(table),
            set.join(", ")
        )
    }

    /// Generates a DELETE of the rows matched by `filter`.
    fn delete_sql(&self, table: &str, filter: &str) -> String {
        format!("DELETE FROM {} WHERE {filter}", self.escape_identifier(table))
    }

    /// Splits a record into a quoted column list and a literal value list.
    fn columns_and_values(&self, record: &[(String, Value)]) -> (String, String) {
        let columns: Vec<String> = record
            .iter()
            .map(|(name, _)| self.escape_identifier(name))
            .collect();
        let values: Vec<String> = record
            .iter()
            .map(|(_, value)| self.escape_literal(value))
            .collect();
        (columns.join(", "), values.join(", "))
    }
}
