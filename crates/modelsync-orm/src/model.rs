//! Registered models.
//!
//! A [`Model`] pairs one [`TableSchema`] with the connection its table lives
//! on. It can only be obtained through [`Model::register`], which reconciles
//! the table first, so every query method runs against a table of the right
//! shape. Every record and filter is validated before a statement is sent.

use std::fmt;
use std::sync::Arc;

use modelsync_core::{
    Dialect, Error, FilterExpr, Mode, Record, TableSchema, ToValue, Validator, Value,
};
use tracing::{debug, info};

use crate::connection::Connection;
use crate::error::{OrmError, Result};
use crate::sync;

/// A table bound to a connection.
pub struct Model<C: Connection> {
    connection: Arc<C>,
    schema: Arc<TableSchema>,
}

impl<C: Connection> fmt::Debug for Model<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("table", &self.schema.name())
            .finish_non_exhaustive()
    }
}

impl<C: Connection> Model<C> {
    /// Reconciles the table with `schema` and returns the ready model.
    ///
    /// # Errors
    ///
    /// Returns an error if the table can't be described, reconciled or
    /// altered.
    pub async fn register(connection: Arc<C>, schema: Arc<TableSchema>) -> Result<Self> {
        sync::reconcile(connection.as_ref(), &schema).await?;
        info!(table = %schema.name(), "Registered model");
        Ok(Self { connection, schema })
    }

    /// Returns the table name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    #[must_use]
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    #[must_use]
    pub fn connection(&self) -> &Arc<C> {
        &self.connection
    }

    /// Finds rows whose fields equal every entry of `query`. An empty query
    /// matches every row.
    ///
    /// # Errors
    ///
    /// Returns a validation or filter error for an unknown field, a value
    /// the field doesn't accept or a zero limit, and passes database errors
    /// through.
    pub async fn find(&self, query: &Record, limit: Option<u64>) -> Result<Vec<Record>> {
        check_limit(limit)?;
        let filter = if query.is_empty() {
            None
        } else {
            Some(self.render(&FilterExpr::all_equal(query))?)
        };
        let sql = self
            .dialect()
            .select_sql(self.name(), None, filter.as_deref(), limit);
        self.connection.query(&sql).await
    }

    /// Finds the first row matching `query`.
    pub async fn find_one(&self, query: &Record) -> Result<Option<Record>> {
        Ok(self.find(query, Some(1)).await?.into_iter().next())
    }

    /// Finds a row by its identifier. `field` defaults to `id`.
    pub async fn find_by_id<V: ToValue>(
        &self,
        id: V,
        field: Option<&str>,
    ) -> Result<Option<Record>> {
        let mut query = Record::new();
        query.insert(field.unwrap_or("id").to_string(), id.to_value());
        self.find_one(&query).await
    }

    /// Selects the named fields of rows matching `filter`, or of every row
    /// when no filter is given.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `fields` is empty or names an unknown
    /// field, or if the limit is zero. Filter errors are raised before the
    /// query is sent.
    pub async fn select(
        &self,
        fields: &[&str],
        filter: Option<&FilterExpr>,
        limit: Option<u64>,
    ) -> Result<Vec<Record>> {
        check_limit(limit)?;
        if fields.is_empty() {
            return Err(validation(format!(
                "no fields selected from table {}",
                self.name()
            )));
        }
        self.check_fields(fields)?;
        let fields: Vec<String> = fields.iter().map(ToString::to_string).collect();
        let filter = filter.map(|f| self.render(f)).transpose()?;
        let sql = self
            .dialect()
            .select_sql(self.name(), Some(&fields), filter.as_deref(), limit);
        self.connection.query(&sql).await
    }

    /// Selects the named fields of the first row matching `filter`.
    pub async fn select_one(
        &self,
        fields: &[&str],
        filter: Option<&FilterExpr>,
    ) -> Result<Option<Record>> {
        Ok(self
            .select(fields, filter, Some(1))
            .await?
            .into_iter()
            .next())
    }

    /// Inserts a row and returns it as stored.
    ///
    /// Every field except auto-increment ones is written: the supplied
    /// non-null value, else the field default, else NULL.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any I/O if the record is empty,
    /// misses a required field or holds an invalid value.
    pub async fn create(&self, record: &Record) -> Result<Record> {
        self.validator().validate(record, Mode::Create)?;
        let row = self.insert_row(record);

        let returning = self.connection.supports_returning().await?;
        let sql = self.dialect().insert_sql(self.name(), &row, returning);
        let stored = if returning {
            self.connection.query(&sql).await?.into_iter().next()
        } else {
            self.connection.execute(&sql).await?;
            self.first_matching(&row).await?
        };
        stored.ok_or_else(|| {
            OrmError::UnexpectedResponse(format!(
                "inserted row of table {} could not be read back",
                self.name()
            ))
        })
    }

    /// Replaces every non-auto-increment field of the rows matching `find`.
    /// Fields missing from `update` are set to NULL.
    ///
    /// Returns the first row holding the new values.
    ///
    /// # Errors
    ///
    /// Returns a filter error before any I/O if `find` is empty, and a
    /// validation error if `update` isn't a complete valid row.
    pub async fn update(&self, find: &Record, update: &Record) -> Result<Option<Record>> {
        let filter = self.render(&FilterExpr::all_equal(find))?;
        self.validator().validate(update, Mode::Update)?;
        let assignments: Vec<(String, Value)> = self
            .writable_fields()
            .map(|name| {
                let value = update.get(name).cloned().unwrap_or(Value::Null);
                (name.to_string(), value)
            })
            .collect();
        self.apply_update(&assignments, &filter).await
    }

    /// Sets only the supplied fields on the rows matching `filter`.
    ///
    /// Returns the first row holding the new values.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any I/O if `update` has no writable
    /// field or holds an invalid value, and a filter error for a malformed
    /// filter.
    pub async fn update_where(
        &self,
        filter: &FilterExpr,
        update: &Record,
    ) -> Result<Option<Record>> {
        let filter = self.render(filter)?;
        let validator = self.validator();
        let mut assignments = Vec::with_capacity(update.len());
        for (name, value) in update {
            validator.check_value(name, value)?;
            if self.schema.field(name).is_some_and(|f| !f.auto_increment) {
                assignments.push((name.clone(), value.clone()));
            }
        }
        if assignments.is_empty() {
            return Err(validation(format!(
                "no writable fields given for table {}",
                self.name()
            )));
        }
        self.apply_update(&assignments, &filter).await
    }

    /// Inserts a row, or updates `update_fields` of the existing row when a
    /// unique key collides. `update_fields` defaults to every inserted
    /// field; an empty list leaves an existing row untouched.
    ///
    /// Returns the stored row, or `None` when a collision was ignored.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any I/O if the record isn't a valid
    /// row or `update_fields` names an unknown field.
    pub async fn upsert(
        &self,
        record: &Record,
        update_fields: Option<&[&str]>,
    ) -> Result<Option<Record>> {
        self.validator().validate(record, Mode::Create)?;
        let row = self.insert_row(record);
        let update_fields: Vec<String> = match update_fields {
            Some(fields) => {
                self.check_fields(fields)?;
                fields.iter().map(ToString::to_string).collect()
            }
            None => row.iter().map(|(name, _)| name.clone()).collect(),
        };

        let returning = self.connection.supports_returning().await?;
        let sql = self
            .dialect()
            .upsert_sql(self.name(), &row, &update_fields, returning);
        if returning {
            Ok(self.connection.query(&sql).await?.into_iter().next())
        } else {
            self.connection.execute(&sql).await?;
            self.first_matching(&row).await
        }
    }

    /// Deletes the rows whose fields equal every entry of `find` and returns
    /// how many were removed. An empty `find` is a filter error.
    pub async fn delete(&self, find: &Record) -> Result<u64> {
        self.delete_where(&FilterExpr::all_equal(find)).await
    }

    /// Deletes the rows matching `filter` and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns a filter or validation error before any I/O for a malformed
    /// filter.
    pub async fn delete_where(&self, filter: &FilterExpr) -> Result<u64> {
        let filter = self.render(filter)?;
        let sql = self.dialect().delete_sql(self.name(), &filter);
        let removed = self.connection.execute(&sql).await?;
        debug!(table = %self.name(), removed, "Deleted rows");
        Ok(removed)
    }

    fn dialect(&self) -> &C::Dialect {
        self.connection.dialect()
    }

    fn validator(&self) -> Validator<'_> {
        Validator::new(&self.schema)
    }

    fn render(&self, filter: &FilterExpr) -> Result<String> {
        Ok(filter.render(&self.schema, self.dialect())?)
    }

    fn check_fields(&self, fields: &[&str]) -> Result<()> {
        match fields.iter().find(|f| !self.schema.has_field(f)) {
            Some(unknown) => Err(validation(format!(
                "field {unknown} doesn't exist in table {}",
                self.name()
            ))),
            None => Ok(()),
        }
    }

    fn writable_fields(&self) -> impl Iterator<Item = &str> {
        self.schema
            .fields()
            .filter(|(_, spec)| !spec.auto_increment)
            .map(|(name, _)| name)
    }

    fn insert_row(&self, record: &Record) -> Vec<(String, Value)> {
        self.schema
            .fields()
            .filter(|(_, spec)| !spec.auto_increment)
            .map(|(name, spec)| {
                let value = record
                    .get(name)
                    .filter(|v| !v.is_null())
                    .cloned()
                    .or_else(|| spec.default.clone())
                    .unwrap_or(Value::Null);
                (name.to_string(), value)
            })
            .collect()
    }

    async fn apply_update(
        &self,
        assignments: &[(String, Value)],
        filter: &str,
    ) -> Result<Option<Record>> {
        let sql = self.dialect().update_sql(self.name(), assignments, filter);
        let changed = self.connection.execute(&sql).await?;
        debug!(table = %self.name(), changed, "Updated rows");
        self.first_matching(assignments).await
    }

    /// Reads back the first row holding exactly `values`.
    async fn first_matching(&self, values: &[(String, Value)]) -> Result<Option<Record>> {
        let record: Record = values.iter().cloned().collect();
        self.find_one(&record).await
    }
}

fn check_limit(limit: Option<u64>) -> Result<()> {
    if limit == Some(0) {
        return Err(validation("limit has to be at least 1".to_string()));
    }
    Ok(())
}

fn validation(message: String) -> OrmError {
    Error::Validation(message).into()
}
