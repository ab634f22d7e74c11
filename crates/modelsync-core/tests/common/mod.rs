#![allow(dead_code)]

use modelsync_core::mapping::PhysicalColumn;
use modelsync_core::{diff_table, KeyKind, LiveColumn, Operation, Plan, TableSchema};

/// In-memory stand-in for a MariaDB table: applies plans the way the server
/// would and reports its columns the way `DESCRIBE` does.
#[derive(Debug, Clone, Default)]
pub struct SimTable {
    columns: Vec<LiveColumn>,
    primary: Vec<String>,
    unique: Vec<String>,
    foreign: Vec<String>,
}

impl SimTable {
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn from_live(columns: Vec<LiveColumn>) -> Self {
        let names = |kind: KeyKind| -> Vec<String> {
            columns
                .iter()
                .filter(|c| c.key == Some(kind))
                .map(|c| c.name.clone())
                .collect()
        };
        let primary = names(KeyKind::Primary);
        let unique = names(KeyKind::Unique);
        let foreign = columns
            .iter()
            .filter(|c| c.foreign_key)
            .map(|c| c.name.clone())
            .collect();
        let columns = columns
            .into_iter()
            .map(|mut c| {
                c.key = None;
                c.foreign_key = false;
                c
            })
            .collect();
        Self {
            columns,
            primary,
            unique,
            foreign,
        }
    }

    pub fn describe(&self) -> Vec<LiveColumn> {
        self.columns
            .iter()
            .map(|c| {
                let mut c = c.clone();
                c.key = if self.primary.contains(&c.name) {
                    Some(KeyKind::Primary)
                } else if self.unique.contains(&c.name) {
                    Some(KeyKind::Unique)
                } else if self.foreign.contains(&c.name) {
                    Some(KeyKind::Multiple)
                } else {
                    None
                };
                c.foreign_key = self.foreign.contains(&c.name);
                c
            })
            .collect()
    }

    pub fn apply(&mut self, plan: &Plan) {
        match plan {
            Plan::CreateTable(create) => {
                assert!(self.columns.is_empty(), "table already exists");
                self.columns = create
                    .columns
                    .iter()
                    .map(|(name, column)| to_live(name, column))
                    .collect();
                self.primary = create.primary_key.clone();
                self.unique = create.unique.clone();
                self.foreign = create.foreign_keys.iter().map(|(n, _)| n.clone()).collect();
            }
            Plan::Alter { operations, .. } => {
                for op in operations {
                    self.apply_operation(op);
                }
                // A column can't be dropped while a constraint still uses it.
                for name in &self.foreign {
                    assert!(self.position(name).is_some(), "constraint {name} lost its column");
                }
            }
        }
    }

    fn apply_operation(&mut self, op: &Operation) {
        match op {
            Operation::DropPrimaryKey => {
                assert!(!self.primary.is_empty(), "no primary key to drop");
                self.primary.clear();
            }
            Operation::AddPrimaryKey(fields) => {
                assert!(self.primary.is_empty(), "primary key already defined");
                self.primary = fields.clone();
            }
            Operation::DropColumn(name) => {
                let before = self.columns.len();
                self.columns.retain(|c| &c.name != name);
                assert_ne!(before, self.columns.len(), "no column {name}");
                self.primary.retain(|n| n != name);
                self.unique.retain(|n| n != name);
            }
            Operation::AddColumn { name, column } => {
                assert!(self.position(name).is_none(), "duplicate column {name}");
                self.columns.push(to_live(name, column));
            }
            Operation::ChangeColumn { name, column } => {
                let index = self
                    .position(name)
                    .unwrap_or_else(|| panic!("no column {name}"));
                self.columns[index] = to_live(name, column);
            }
            Operation::DropUniqueIndex(name) => {
                assert!(self.unique.contains(name), "no index {name}");
                self.unique.retain(|n| n != name);
            }
            Operation::AddUniqueIndex(name) => {
                assert!(!self.unique.contains(name), "duplicate index {name}");
                self.unique.push(name.clone());
            }
            Operation::DropForeignKey(name) => {
                assert!(self.foreign.contains(name), "no constraint {name}");
                self.foreign.retain(|n| n != name);
            }
            Operation::AddForeignKey { column, .. } => {
                assert!(!self.foreign.contains(column), "duplicate constraint {column}");
                self.foreign.push(column.clone());
            }
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

fn to_live(name: &str, column: &PhysicalColumn) -> LiveColumn {
    let mut live = LiveColumn::new(name, column.describe_type());
    live.nullable = column.nullable;
    live.default = column.default.as_ref().and_then(|v| v.to_plain_string());
    if column.auto_increment {
        live = live.auto_increment();
    }
    live
}

/// Diffs, applies, and returns the plan that was applied.
pub fn reconcile(schema: &TableSchema, table: &mut SimTable) -> Plan {
    let plan = diff_table(schema, &table.describe()).expect("diff failed");
    table.apply(&plan);
    plan
}
