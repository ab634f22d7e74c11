#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use modelsync_core::diff::CreateTable;
use modelsync_core::{FieldSpec, KeyKind, LiveColumn, MariaDbDialect, Record, TableSchema, Value};
use modelsync_orm::{Connection, OrmError, Result};

#[derive(Debug, Default)]
struct State {
    connected: bool,
    tables: HashMap<String, Vec<LiveColumn>>,
    statements: Vec<String>,
    rows: VecDeque<Vec<Record>>,
    affected: u64,
}

/// In-memory connection: answers DESCRIBE from preset tables, records every
/// statement it is given and replays queued result sets in order.
#[derive(Debug)]
pub struct MemoryConnection {
    dialect: MariaDbDialect,
    returning: bool,
    state: Mutex<State>,
}

impl MemoryConnection {
    pub fn new(returning: bool) -> Self {
        Self {
            dialect: MariaDbDialect::new(),
            returning,
            state: Mutex::new(State {
                affected: 1,
                ..State::default()
            }),
        }
    }

    /// Presets the live state of a table to exactly what `schema` describes.
    pub fn with_table(self, schema: &TableSchema) -> Self {
        self.state
            .lock()
            .unwrap()
            .tables
            .insert(schema.name().to_string(), live_columns(schema));
        self
    }

    pub fn with_live(self, table: &str, columns: Vec<LiveColumn>) -> Self {
        self.state
            .lock()
            .unwrap()
            .tables
            .insert(table.to_string(), columns);
        self
    }

    /// Queues the result of the next query.
    pub fn push_rows(&self, rows: Vec<Record>) {
        self.state.lock().unwrap().rows.push_back(rows);
    }

    pub fn set_affected(&self, affected: u64) {
        self.state.lock().unwrap().affected = affected;
    }

    pub fn statements(&self) -> Vec<String> {
        self.state.lock().unwrap().statements.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }

    fn record(&self, statement: &str) -> Result<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return Err(OrmError::NotConnected);
        }
        state.statements.push(statement.to_string());
        Ok(state)
    }
}

impl Connection for MemoryConnection {
    type Dialect = MariaDbDialect;

    fn dialect(&self) -> &MariaDbDialect {
        &self.dialect
    }

    async fn connect(&self) -> Result<()> {
        self.state.lock().unwrap().connected = true;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.state.lock().unwrap().connected = false;
        Ok(())
    }

    async fn describe_table(&self, table: &str) -> Result<Vec<LiveColumn>> {
        let state = self.state.lock().unwrap();
        if !state.connected {
            return Err(OrmError::NotConnected);
        }
        Ok(state.tables.get(table).cloned().unwrap_or_default())
    }

    async fn execute(&self, statement: &str) -> Result<u64> {
        Ok(self.record(statement)?.affected)
    }

    async fn query(&self, statement: &str) -> Result<Vec<Record>> {
        Ok(self.record(statement)?.rows.pop_front().unwrap_or_default())
    }

    async fn supports_returning(&self) -> Result<bool> {
        Ok(self.returning)
    }
}

/// The columns DESCRIBE reports for a freshly created `schema`.
pub fn live_columns(schema: &TableSchema) -> Vec<LiveColumn> {
    let create = CreateTable::from_schema(schema).unwrap();
    create
        .columns
        .iter()
        .map(|(name, column)| {
            let mut live = LiveColumn::new(name.as_str(), column.describe_type());
            live.nullable = column.nullable;
            live.default = column.default.as_ref().and_then(|v| v.to_plain_string());
            if column.auto_increment {
                live = live.auto_increment();
            }
            live.foreign_key = create.foreign_keys.iter().any(|(n, _)| n == name);
            live.key = if create.primary_key.contains(name) {
                Some(KeyKind::Primary)
            } else if create.unique.contains(name) {
                Some(KeyKind::Unique)
            } else if live.foreign_key {
                Some(KeyKind::Multiple)
            } else {
                None
            };
            live
        })
        .collect()
}

pub fn record(pairs: &[(&str, Value)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

pub fn users() -> TableSchema {
    TableSchema::builder("users")
        .field(
            "id",
            FieldSpec::uint(4_294_967_295.0).primary_key().auto_increment(),
        )
        .field("name", FieldSpec::string(100.0))
        .field("email", FieldSpec::string(255.0).unique())
        .field("age", FieldSpec::uint(150.0).nullable())
        .field("active", FieldSpec::boolean().default(true))
        .build()
        .unwrap()
}
