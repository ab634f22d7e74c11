//! MariaDB dialect.

use super::Dialect;
use crate::diff::Operation;
use crate::mapping::PhysicalColumn;
use crate::value::Value;

/// MariaDB SQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct MariaDbDialect;

impl MariaDbDialect {
    /// Creates a new MariaDB dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for MariaDbDialect {
    fn name(&self) -> &'static str {
        "mariadb"
    }

    fn escape_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn escape_literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) if f.is_finite() => f.to_string(),
            Value::Float(_) => "NULL".to_string(),
            Value::Text(s) => escape_string(s),
            Value::List(items) => items
                .iter()
                .map(|item| self.escape_literal(item))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    fn column_definition(&self, name: &str, column: &PhysicalColumn) -> String {
        let mut sql = format!("{} {}", self.escape_identifier(name), column.type_sql());
        if !column.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&self.escape_literal(default));
        }
        if column.auto_increment {
            sql.push_str(" AUTO_INCREMENT");
        }
        sql
    }

    fn alter_clause(&self, operation: &Operation) -> String {
        match operation {
            Operation::DropPrimaryKey => "DROP PRIMARY KEY".to_string(),
            Operation::AddPrimaryKey(fields) => {
                format!("ADD PRIMARY KEY ({})", self.identifier_list(fields))
            }
            Operation::DropColumn(name) => format!("DROP COLUMN {}", self.escape_identifier(name)),
            Operation::AddColumn { name, column } => {
                format!("ADD COLUMN {}", self.column_definition(name, column))
            }
            Operation::ChangeColumn { name, column } => format!(
                "CHANGE COLUMN {} {}",
                self.escape_identifier(name),
                self.column_definition(name, column)
            ),
            Operation::DropUniqueIndex(name) => {
                format!("DROP INDEX {}", self.escape_identifier(name))
            }
            Operation::AddUniqueIndex(name) => {
                let name = self.escape_identifier(name);
                format!("ADD UNIQUE INDEX {name} ({name})")
            }
            Operation::DropForeignKey(name) => {
                format!("DROP FOREIGN KEY {}", self.escape_identifier(name))
            }
            Operation::AddForeignKey { column, target } => {
                format!("ADD {}", self.foreign_key_constraint(column, target))
            }
        }
    }

    fn upsert_sql(
        &self,
        table: &str,
        record: &[(String, Value)],
        update_fields: &[String],
        returning: bool,
    ) -> String {
        let (columns, values) = self.columns_and_values(record);
        let ignore = if update_fields.is_empty() { " IGNORE" } else { "" };
        let mut sql = format!(
            "INSERT{ignore} INTO {} ({columns}) VALUES ({values})",
            self.escape_identifier(table)
        );
        if !update_fields.is_empty() {
            let updates: Vec<String> = update_fields
                .iter()
                .map(|field| {
                    let field = self.escape_identifier(field);
                    format!("{field} = VALUES({field})")
                })
                .collect();
            sql.push_str(" ON DUPLICATE KEY UPDATE ");
            sql.push_str(&updates.join(", "));
        }
        if returning {
            sql.push_str(" RETURNING *");
        }
        sql
    }
}

/// Quotes a string literal, escaping the characters MariaDB treats specially.
fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\0' => out.push_str("\\0"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x08' => out.push_str("\\b"),
            '\x1a' => out.push_str("\\Z"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
