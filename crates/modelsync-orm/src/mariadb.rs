//! MariaDB connection backed by a sqlx MySQL pool.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use modelsync_core::live::normalize_default;
use modelsync_core::{KeyKind, LiveColumn, MariaDbDialect, Record, Value};
use serde::Deserialize;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::connection::Connection;
use crate::error::{OrmError, Result};

/// First server version with `INSERT ... RETURNING`.
const RETURNING_SINCE: (u32, u32) = (10, 5);

const DESCRIBE_SQL: &str = "SELECT COLUMN_NAME, COLUMN_TYPE, IS_NULLABLE, COLUMN_KEY, \
     COLUMN_DEFAULT, EXTRA FROM information_schema.COLUMNS \
     WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? ORDER BY ORDINAL_POSITION";

/// Columns carrying a foreign key constraint. `COLUMN_KEY` can't tell: it
/// reports `PRI` or `UNI` for keyed columns and `MUL` for any plain index.
const FOREIGN_KEYS_SQL: &str = "SELECT COLUMN_NAME FROM information_schema.KEY_COLUMN_USAGE \
     WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
     AND REFERENCED_TABLE_NAME IS NOT NULL";

/// Connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MariaDbConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    pub database: String,
    /// Upper bound on pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_host() -> String {
    "localhost".to_string()
}

const fn default_port() -> u16 {
    3306
}

fn default_username() -> String {
    "root".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

impl MariaDbConfig {
    /// Creates a configuration for `database` with every other setting at
    /// its default.
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: default_username(),
            password: None,
            database: database.into(),
            max_connections: default_max_connections(),
        }
    }
}

struct Session {
    pool: MySqlPool,
    version: (u32, u32),
}

/// A MariaDB server reached through a connection pool.
///
/// The pool is created by [`Connection::connect`] and dropped by
/// [`Connection::disconnect`].
pub struct MariaDbConnection {
    options: MySqlConnectOptions,
    max_connections: u32,
    dialect: MariaDbDialect,
    session: RwLock<Option<Session>>,
}

impl MariaDbConnection {
    /// Creates an unopened connection from explicit settings.
    #[must_use]
    pub fn new(config: &MariaDbConfig) -> Self {
        let mut options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.username)
            .database(&config.database);
        if let Some(password) = &config.password {
            options = options.password(password);
        }
        Self::with_options(options, config.max_connections)
    }

    /// Creates an unopened connection from a `mysql://` URL.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Connection`] if the URL can't be parsed.
    pub fn from_url(url: &str) -> Result<Self> {
        let options = url.parse::<MySqlConnectOptions>()?;
        Ok(Self::with_options(options, default_max_connections()))
    }

    fn with_options(options: MySqlConnectOptions, max_connections: u32) -> Self {
        Self {
            options,
            max_connections,
            dialect: MariaDbDialect::new(),
            session: RwLock::new(None),
        }
    }

    /// Returns the server version as `(major, minor)` once connected.
    pub async fn server_version(&self) -> Option<(u32, u32)> {
        self.session.read().await.as_ref().map(|s| s.version)
    }

    async fn pool(&self) -> Result<MySqlPool> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.pool.clone())
            .ok_or(OrmError::NotConnected)
    }
}

impl Connection for MariaDbConnection {
    type Dialect = MariaDbDialect;

    fn dialect(&self) -> &MariaDbDialect {
        &self.dialect
    }

    async fn connect(&self) -> Result<()> {
        let mut session = self.session.write().await;
        if session.is_some() {
            return Ok(());
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(self.max_connections)
            .connect_with(self.options.clone())
            .await?;
        let raw = sqlx::query_scalar::<_, String>("SELECT VERSION()")
            .fetch_one(&pool)
            .await?;
        let version = parse_version(&raw).ok_or_else(|| {
            OrmError::UnexpectedResponse(format!("unrecognised server version {raw}"))
        })?;

        info!(version = %raw, "Connected to MariaDB");
        *session = Some(Session { pool, version });
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        if let Some(session) = self.session.write().await.take() {
            session.pool.close().await;
            info!("Disconnected from MariaDB");
        }
        Ok(())
    }

    async fn describe_table(&self, table: &str) -> Result<Vec<LiveColumn>> {
        let pool = self.pool().await?;
        debug!(table = %table, "Describing table");
        let rows = sqlx::query(DESCRIBE_SQL)
            .bind(table)
            .fetch_all(&pool)
            .await?;
        let foreign_keys = sqlx::query(FOREIGN_KEYS_SQL)
            .bind(table)
            .fetch_all(&pool)
            .await?
            .iter()
            .map(|row| row.try_get_unchecked::<String, _>(0))
            .collect::<std::result::Result<HashSet<String>, _>>()?;

        rows.iter()
            .map(|row| -> Result<LiveColumn> {
                let name: String = row.try_get_unchecked(0)?;
                let nullable: String = row.try_get_unchecked(2)?;
                let key: String = row.try_get_unchecked(3)?;
                let default: Option<String> = row.try_get_unchecked(4)?;
                Ok(LiveColumn {
                    foreign_key: foreign_keys.contains(&name),
                    name,
                    column_type: row.try_get_unchecked(1)?,
                    nullable: nullable.eq_ignore_ascii_case("YES"),
                    key: KeyKind::from_describe(&key),
                    default: normalize_default(default.as_deref()),
                    extra: row.try_get_unchecked(5)?,
                })
            })
            .collect()
    }

    async fn execute(&self, statement: &str) -> Result<u64> {
        let pool = self.pool().await?;
        debug!(sql = %statement, "Executing SQL");
        let result = sqlx::query(statement).execute(&pool).await?;
        Ok(result.rows_affected())
    }

    async fn query(&self, statement: &str) -> Result<Vec<Record>> {
        let pool = self.pool().await?;
        debug!(sql = %statement, "Running query");
        let rows = sqlx::query(statement).fetch_all(&pool).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn supports_returning(&self) -> Result<bool> {
        self.server_version()
            .await
            .map(|version| version >= RETURNING_SINCE)
            .ok_or(OrmError::NotConnected)
    }
}

fn decode_row(row: &MySqlRow) -> Result<Record> {
    row.columns()
        .iter()
        .map(|column| -> Result<(String, Value)> {
            let value = decode_cell(row, column.ordinal(), column.type_info().name())?;
            Ok((column.name().to_string(), value))
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn decode_cell(row: &MySqlRow, index: usize, type_name: &str) -> Result<Value> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }

    let value = match type_name {
        "BOOLEAN" => Value::Bool(row.try_get(index)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => Value::Int(row.try_get(index)?),
        name if name.ends_with(" UNSIGNED") => {
            let number: u64 = row.try_get(index)?;
            i64::try_from(number).map_or(Value::Float(number as f64), Value::Int)
        }
        "FLOAT" => Value::Float(f64::from(row.try_get::<f32, _>(index)?)),
        "DOUBLE" => Value::Float(row.try_get(index)?),
        "DECIMAL" => {
            let text: String = row.try_get_unchecked(index)?;
            let number = text.parse::<f64>().map_err(|_| {
                OrmError::UnexpectedResponse(format!("invalid decimal {text}"))
            })?;
            Value::Float(number)
        }
        "TIMESTAMP" | "DATETIME" => {
            let at: NaiveDateTime = row.try_get(index)?;
            Value::Text(at.format("%Y-%m-%d %H:%M:%S%.f").to_string())
        }
        "DATE" => {
            let day: NaiveDate = row.try_get(index)?;
            Value::Text(day.format("%Y-%m-%d").to_string())
        }
        "TIME" => {
            let time: NaiveTime = row.try_get(index)?;
            Value::Text(time.format("%H:%M:%S%.f").to_string())
        }
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            let bytes: Vec<u8> = row.try_get(index)?;
            Value::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => Value::Text(row.try_get_unchecked(index)?),
    };
    Ok(value)
}

/// Extracts `(major, minor)` from a `VERSION()` string such as
/// `10.11.6-MariaDB-1:10.11.6+maria~ubu2204`.
fn parse_version(raw: &str) -> Option<(u32, u32)> {
    let mut parts = raw.split(|c: char| !c.is_ascii_digit());
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}
