//! Schema diffing.
//!
//! Compares a desired [`TableSchema`] with the columns of the live table and
//! produces the [`Plan`] that brings the live table in line.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::live::{KeyKind, LiveColumn};
use crate::mapping::{map_field, ForeignKeyTarget, PhysicalColumn};
use crate::schema::TableSchema;
use crate::value::Value;

/// A single change inside an `ALTER TABLE` statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    DropPrimaryKey,
    AddPrimaryKey(Vec<String>),
    DropColumn(String),
    AddColumn {
        name: String,
        column: PhysicalColumn,
    },
    ChangeColumn {
        name: String,
        column: PhysicalColumn,
    },
    DropUniqueIndex(String),
    AddUniqueIndex(String),
    /// Drops the foreign key constraint named after its column.
    DropForeignKey(String),
    AddForeignKey {
        column: String,
        target: ForeignKeyTarget,
    },
}

/// Everything needed to create a table from scratch.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub name: String,
    pub columns: Vec<(String, PhysicalColumn)>,
    /// Primary key fields. Unlike the per-column flag this includes
    /// non-integer fields.
    pub primary_key: Vec<String>,
    pub unique: Vec<String>,
    pub foreign_keys: Vec<(String, ForeignKeyTarget)>,
}

impl CreateTable {
    /// Builds the creation routine for a schema.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if a field cannot be mapped.
    pub fn from_schema(schema: &TableSchema) -> Result<Self> {
        let mut columns = Vec::new();
        let mut unique = Vec::new();
        let mut foreign_keys = Vec::new();
        for (name, spec) in schema.fields() {
            let column = map_field(spec)?;
            if spec.unique && !spec.primary_key {
                unique.push(name.to_string());
            }
            if let Some(target) = &column.foreign_key {
                foreign_keys.push((name.to_string(), target.clone()));
            }
            columns.push((name.to_string(), column));
        }
        Ok(Self {
            name: schema.name().to_string(),
            columns,
            primary_key: schema
                .primary_key()
                .into_iter()
                .map(str::to_string)
                .collect(),
            unique,
            foreign_keys,
        })
    }
}

/// Result of diffing a desired schema against a live table.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// The table doesn't exist yet.
    CreateTable(CreateTable),
    /// The table exists; apply these operations in order. May be empty.
    Alter {
        table: String,
        operations: Vec<Operation>,
    },
}

impl Plan {
    /// Returns `true` if there is nothing to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Alter { operations, .. } if operations.is_empty())
    }

    /// Name of the table the plan applies to.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::CreateTable(create) => &create.name,
            Self::Alter { table, .. } => table,
        }
    }
}

/// Diffs `desired` against the live columns of its table.
///
/// An empty `live` slice means the table doesn't exist. Otherwise the
/// operations are ordered: primary key, dropped columns, added columns,
/// changed columns, unique index drops and adds, then foreign key drops and
/// adds.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if a field cannot be mapped and
/// [`Error::Schema`] if a live column has no type.
pub fn diff_table(desired: &TableSchema, live: &[LiveColumn]) -> Result<Plan> {
    if live.is_empty() {
        debug!(table = %desired.name(), "table missing, planning creation");
        return Ok(Plan::CreateTable(CreateTable::from_schema(desired)?));
    }

    let table = desired.name();
    for column in live {
        if column.column_type.trim().is_empty() {
            return Err(Error::schema(format!(
                "live column {}.{} has no type",
                table, column.name
            )));
        }
    }

    let mut desired_columns = Vec::new();
    for (name, spec) in desired.fields() {
        desired_columns.push((name, spec, map_field(spec)?));
    }
    let live_by_name: HashMap<&str, &LiveColumn> =
        live.iter().map(|c| (c.name.as_str(), c)).collect();
    let desired_names: HashSet<&str> = desired_columns.iter().map(|(n, _, _)| *n).collect();

    let mut operations = Vec::new();

    // Primary key
    let desired_pk: Vec<&str> = desired.primary_key();
    let live_pk: Vec<&str> = live
        .iter()
        .filter(|c| c.key == Some(KeyKind::Primary))
        .map(|c| c.name.as_str())
        .collect();
    let desired_pk_set: HashSet<&str> = desired_pk.iter().copied().collect();
    let live_pk_set: HashSet<&str> = live_pk.iter().copied().collect();
    if desired_pk_set != live_pk_set {
        debug!(table, from = ?live_pk, to = ?desired_pk, "primary key changed");
        if !live_pk.is_empty() {
            operations.push(Operation::DropPrimaryKey);
        }
        if !desired_pk.is_empty() {
            operations.push(Operation::AddPrimaryKey(
                desired_pk.iter().map(|s| (*s).to_string()).collect(),
            ));
        }
    }

    // Columns
    let dropped: Vec<&str> = live
        .iter()
        .map(|c| c.name.as_str())
        .filter(|name| !desired_names.contains(name))
        .collect();
    for name in &dropped {
        warn!(table, column = %name, "dropping column");
        operations.push(Operation::DropColumn((*name).to_string()));
    }
    for (name, _, column) in &desired_columns {
        if !live_by_name.contains_key(name) {
            debug!(table, column = %name, "adding column");
            operations.push(Operation::AddColumn {
                name: (*name).to_string(),
                column: column.clone(),
            });
        }
    }
    for (name, _, column) in &desired_columns {
        if let Some(current) = live_by_name.get(name) {
            if column_changed(column, current) {
                debug!(
                    table,
                    column = %name,
                    from = %current.column_type,
                    to = %column.describe_type(),
                    "changing column"
                );
                operations.push(Operation::ChangeColumn {
                    name: (*name).to_string(),
                    column: column.clone(),
                });
            }
        }
    }

    // Unique indexes
    let desired_unique: Vec<&str> = desired_columns
        .iter()
        .filter(|(_, spec, _)| spec.unique && !spec.primary_key)
        .map(|(name, _, _)| *name)
        .collect();
    let live_unique: Vec<&str> = live
        .iter()
        .filter(|c| c.key == Some(KeyKind::Unique))
        .map(|c| c.name.as_str())
        .collect();
    // A dropped column takes its unique index with it.
    let stale_unique = live_unique
        .iter()
        .filter(|n| !desired_unique.contains(*n) && !dropped.contains(*n));
    for name in stale_unique {
        operations.push(Operation::DropUniqueIndex((*name).to_string()));
    }
    for name in desired_unique.iter().filter(|n| !live_unique.contains(*n)) {
        operations.push(Operation::AddUniqueIndex((*name).to_string()));
    }

    // Foreign keys: constraints sharing a name are re-created, since their
    // target may have changed.
    let desired_fk: Vec<(&str, &ForeignKeyTarget)> = desired_columns
        .iter()
        .filter_map(|(name, _, column)| column.foreign_key.as_ref().map(|fk| (*name, fk)))
        .collect();
    let live_fk: Vec<&str> = live
        .iter()
        .filter(|c| c.foreign_key)
        .map(|c| c.name.as_str())
        .collect();
    let desired_fk_names: HashSet<&str> = desired_fk.iter().map(|(n, _)| *n).collect();
    let removed = live_fk.iter().filter(|n| !desired_fk_names.contains(*n));
    let kept = live_fk.iter().filter(|n| desired_fk_names.contains(*n));
    for name in removed.chain(kept) {
        operations.push(Operation::DropForeignKey((*name).to_string()));
    }
    let added = desired_fk.iter().filter(|(n, _)| !live_fk.contains(n));
    let readded = desired_fk.iter().filter(|(n, _)| live_fk.contains(n));
    for (name, target) in added.chain(readded) {
        operations.push(Operation::AddForeignKey {
            column: (*name).to_string(),
            target: (*target).clone(),
        });
    }

    debug!(table, operations = operations.len(), "diff complete");
    Ok(Plan::Alter {
        table: table.to_string(),
        operations,
    })
}

fn column_changed(desired: &PhysicalColumn, live: &LiveColumn) -> bool {
    !desired
        .describe_type()
        .eq_ignore_ascii_case(live.column_type.trim())
        || desired.nullable != live.nullable
        || desired.auto_increment != live.is_auto_increment()
        || !defaults_match(desired.default.as_ref(), live.default.as_deref())
}

/// Compares a desired default with the one reported by the server.
/// Numbers compare by value (`1.50` equals `1.5`), anything else
/// case-insensitively.
fn defaults_match(desired: Option<&Value>, live: Option<&str>) -> bool {
    match (desired.and_then(Value::to_plain_string), live) {
        (None, None) => true,
        (Some(desired), Some(live)) => {
            if let (Ok(a), Ok(b)) = (desired.parse::<f64>(), live.parse::<f64>()) {
                return a == b;
            }
            desired.eq_ignore_ascii_case(live)
        }
        _ => false,
    }
}
