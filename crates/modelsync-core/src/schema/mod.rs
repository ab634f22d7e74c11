//! Declarative table definitions.
//!
//! A [`TableSchema`] is built once through [`TableSchemaBuilder`], which
//! checks every field invariant up front. After `build()` succeeds the schema
//! is immutable and can be shared freely between the type mapper, the
//! validator and the diff engine.

mod document;

pub use document::{FieldDefinition, ForeignKeyDefinition, SchemaDocument, TableDefinition};

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::mapping::map_field;
use crate::validate::check_field_value;
use crate::value::{ToValue, Value};

/// Logical, dialect-neutral field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    /// Signed integer.
    #[serde(rename = "SINT")]
    SignedInt,
    /// Unsigned integer.
    #[serde(rename = "UINT")]
    UnsignedInt,
    /// Variable-length string.
    #[serde(rename = "STRING")]
    String,
    /// Boolean.
    #[serde(rename = "BOOLEAN")]
    Boolean,
    /// Fixed-point decimal.
    #[serde(rename = "DECIMAL")]
    Decimal,
    /// Timestamp.
    #[serde(rename = "TIMESTAMP")]
    Timestamp,
}

impl FieldKind {
    /// Returns `true` for the two integer kinds.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::SignedInt | Self::UnsignedInt)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SignedInt => "SINT",
            Self::UnsignedInt => "UINT",
            Self::String => "STRING",
            Self::Boolean => "BOOLEAN",
            Self::Decimal => "DECIMAL",
            Self::Timestamp => "TIMESTAMP",
        };
        f.write_str(name)
    }
}

/// Foreign key action (ON DELETE, ON UPDATE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferentialAction {
    /// Cascade the delete/update to referencing rows.
    #[serde(rename = "CASCADE")]
    Cascade,
    /// Reject the delete/update.
    #[serde(rename = "RESTRICT")]
    Restrict,
    /// No action (checked at statement end).
    #[serde(rename = "NO ACTION")]
    NoAction,
    /// Set the referencing column to NULL.
    #[serde(rename = "SET NULL")]
    SetNull,
}

impl ReferentialAction {
    /// Returns the SQL representation of this action.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
            Self::NoAction => "NO ACTION",
            Self::SetNull => "SET NULL",
        }
    }
}

/// Type and bounds of a referenced field, copied when the foreign key is
/// declared.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FieldShape {
    kind: FieldKind,
    max_size: Option<f64>,
    min_size: Option<f64>,
}

/// A reference from one field to a field of another table.
///
/// Only the target table's name and a copy of the target field's shape are
/// kept; the referenced [`TableSchema`] itself is not retained.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    table: String,
    field: String,
    on_delete: Option<ReferentialAction>,
    on_update: Option<ReferentialAction>,
    target: Option<FieldShape>,
}

impl ForeignKey {
    /// Declares a reference to `field` of `table`.
    ///
    /// A missing target field is reported when the owning schema is built.
    #[must_use]
    pub fn to(table: &TableSchema, field: &str) -> Self {
        Self {
            table: table.name.clone(),
            field: field.to_string(),
            on_delete: None,
            on_update: None,
            target: table.field(field).map(|spec| FieldShape {
                kind: spec.kind,
                max_size: spec.max_size,
                min_size: spec.min_size,
            }),
        }
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub const fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    /// Sets the ON UPDATE action.
    #[must_use]
    pub const fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = Some(action);
        self
    }

    /// Name of the referenced table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Name of the referenced field.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// ON DELETE action, if any.
    #[must_use]
    pub const fn delete_action(&self) -> Option<ReferentialAction> {
        self.on_delete
    }

    /// ON UPDATE action, if any.
    #[must_use]
    pub const fn update_action(&self) -> Option<ReferentialAction> {
        self.on_update
    }
}

/// Logical definition of one column.
///
/// Fields are NOT NULL unless [`FieldSpec::nullable`] is called.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Logical type.
    pub kind: FieldKind,
    /// Upper bound. Its meaning depends on the kind: largest value for
    /// numbers, length for strings, fractional-seconds precision for
    /// timestamps.
    pub max_size: Option<f64>,
    /// Lower bound for numeric values.
    pub min_size: Option<f64>,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Whether the column carries a unique index.
    pub unique: bool,
    /// Whether the column is part of the primary key.
    pub primary_key: bool,
    /// Whether the column auto-increments.
    pub auto_increment: bool,
    /// Default value.
    pub default: Option<Value>,
    /// Foreign key reference.
    pub foreign_key: Option<ForeignKey>,
}

impl FieldSpec {
    /// Creates a field of the given kind with no bounds.
    #[must_use]
    pub const fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            max_size: None,
            min_size: None,
            nullable: false,
            unique: false,
            primary_key: false,
            auto_increment: false,
            default: None,
            foreign_key: None,
        }
    }

    /// Signed integer field holding values up to `max`.
    #[must_use]
    pub const fn sint(max: f64) -> Self {
        Self::new(FieldKind::SignedInt).max_size(max)
    }

    /// Unsigned integer field holding values up to `max`.
    #[must_use]
    pub const fn uint(max: f64) -> Self {
        Self::new(FieldKind::UnsignedInt).max_size(max)
    }

    /// String field of at most `length` characters.
    #[must_use]
    pub const fn string(length: f64) -> Self {
        Self::new(FieldKind::String).max_size(length)
    }

    /// Decimal field; `max` determines both precision and scale.
    #[must_use]
    pub const fn decimal(max: f64) -> Self {
        Self::new(FieldKind::Decimal).max_size(max)
    }

    /// Timestamp field with the given fractional-seconds precision.
    #[must_use]
    pub const fn timestamp(precision: f64) -> Self {
        Self::new(FieldKind::Timestamp).max_size(precision)
    }

    /// Boolean field.
    #[must_use]
    pub const fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    /// Sets the upper bound.
    #[must_use]
    pub const fn max_size(mut self, max: f64) -> Self {
        self.max_size = Some(max);
        self
    }

    /// Sets the lower bound.
    #[must_use]
    pub const fn min_size(mut self, min: f64) -> Self {
        self.min_size = Some(min);
        self
    }

    /// Allows NULL.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Adds a unique index.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Marks the field as (part of) the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Marks the field as auto-incrementing.
    #[must_use]
    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Sets the default value. A NULL default is the same as no default.
    #[must_use]
    pub fn default(mut self, value: impl ToValue) -> Self {
        let value = value.to_value();
        self.default = if value.is_null() { None } else { Some(value) };
        self
    }

    /// Adds a foreign key.
    #[must_use]
    pub fn references(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_key = Some(foreign_key);
        self
    }

    /// Returns `true` when a record must provide a value for this field.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        !self.nullable && !self.auto_increment && self.default.is_none()
    }
}

/// Validated, immutable definition of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    name: String,
    fields: Vec<(String, FieldSpec)>,
    non_nullable_fields: Vec<String>,
}

impl TableSchema {
    /// Starts building a schema for `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> TableSchemaBuilder {
        TableSchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    /// Gets a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, spec)| spec)
    }

    /// Returns whether a field exists.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Fields that are not nullable, not auto-incrementing and have no
    /// default, in declaration order.
    #[must_use]
    pub fn non_nullable_fields(&self) -> &[String] {
        &self.non_nullable_fields
    }

    /// Names of the primary key fields, in declaration order.
    #[must_use]
    pub fn primary_key(&self) -> Vec<&str> {
        self.fields()
            .filter(|(_, spec)| spec.primary_key)
            .map(|(name, _)| name)
            .collect()
    }
}

/// Builder for [`TableSchema`].
#[derive(Debug, Clone)]
pub struct TableSchemaBuilder {
    name: String,
    fields: Vec<(String, FieldSpec)>,
}

impl TableSchemaBuilder {
    /// Adds a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.push((name.into(), spec));
        self
    }

    /// Checks every field and builds the schema.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when a field lacks a size, cannot be
    /// mapped to a column type, carries an invalid default, or declares a
    /// foreign key that points at its own table or at a field that is
    /// missing or shaped differently.
    pub fn build(self) -> Result<TableSchema> {
        let table = self.name;
        if table.is_empty() {
            return Err(Error::configuration("table name must not be empty"));
        }
        if self.fields.is_empty() {
            return Err(Error::configuration(format!(
                "table {table} must declare at least one field"
            )));
        }

        let mut seen = HashSet::new();
        for (name, spec) in &self.fields {
            if !seen.insert(name.as_str()) {
                return Err(Error::configuration(format!(
                    "field {name} is declared twice in table {table}"
                )));
            }
            if spec.max_size.is_none() && spec.kind != FieldKind::Boolean {
                return Err(Error::configuration(format!(
                    "field {name} of table {table} must declare a maxSize (only boolean fields may omit it)"
                )));
            }
            map_field(spec).map_err(|e| match e {
                Error::Configuration(message) => {
                    Error::configuration(format!("field {name} of table {table}: {message}"))
                }
                other => other,
            })?;
            if let Some(default) = &spec.default {
                check_field_value(&table, name, spec, default, false).map_err(|e| {
                    Error::configuration(format!("invalid default for field {name}: {e}"))
                })?;
            }
            if let Some(fk) = &spec.foreign_key {
                check_foreign_key(&table, name, spec, fk)?;
            }
        }

        let non_nullable_fields = self
            .fields
            .iter()
            .filter(|(_, spec)| spec.is_required())
            .map(|(name, _)| name.clone())
            .collect();

        Ok(TableSchema {
            name: table,
            fields: self.fields,
            non_nullable_fields,
        })
    }
}

fn check_foreign_key(table: &str, name: &str, spec: &FieldSpec, fk: &ForeignKey) -> Result<()> {
    if fk.table == table {
        return Err(Error::configuration(format!(
            "foreign key of field {name} references its own table {table} (circular model dependency)"
        )));
    }
    let Some(target) = fk.target else {
        return Err(Error::configuration(format!(
            "field {name} has a foreign key to {}.{}, which doesn't exist",
            fk.table, fk.field
        )));
    };
    if target.kind != spec.kind {
        return Err(Error::configuration(format!(
            "foreign key field {name} is {} but {}.{} is {}",
            spec.kind, fk.table, fk.field, target.kind
        )));
    }
    if target.max_size != spec.max_size {
        return Err(Error::configuration(format!(
            "foreign key field {name} has a different maxSize than {}.{}",
            fk.table, fk.field
        )));
    }
    if target.min_size != spec.min_size {
        return Err(Error::configuration(format!(
            "foreign key field {name} has a different minSize than {}.{}",
            fk.table, fk.field
        )));
    }
    Ok(())
}
