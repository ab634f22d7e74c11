//! JSON schema documents.
//!
//! A document lists tables in dependency order. Foreign keys may only point
//! at tables defined earlier in the same document.

use serde::{Deserialize, Serialize};

use super::{FieldKind, FieldSpec, ForeignKey, ReferentialAction, TableSchema};
use crate::error::{Error, Result};
use crate::value::Value;

/// A set of table definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    /// Tables, referenced tables first.
    pub tables: Vec<TableDefinition>,
}

/// Serialized form of a [`TableSchema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    /// Table name.
    pub name: String,
    /// Fields in column order.
    pub fields: Vec<FieldDefinition>,
}

/// Serialized form of a [`FieldSpec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    /// Field name.
    pub name: String,
    /// Logical type.
    #[serde(rename = "type")]
    pub kind: FieldKind,
    /// Upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<f64>,
    /// Lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_size: Option<f64>,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub auto_increment: bool,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Foreign key reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKeyDefinition>,
}

/// Serialized form of a [`ForeignKey`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyDefinition {
    /// Referenced table.
    pub table: String,
    /// Referenced field.
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ReferentialAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ReferentialAction>,
}

impl SchemaDocument {
    /// Parses a document from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the JSON does not describe a
    /// schema document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::configuration(format!("invalid schema document: {e}")))
    }

    /// Builds every table, resolving foreign keys against the tables
    /// already built.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if a table fails to build or a
    /// foreign key names a table not defined before it.
    pub fn build(&self) -> Result<Vec<TableSchema>> {
        let mut built: Vec<TableSchema> = Vec::with_capacity(self.tables.len());
        for table in &self.tables {
            let mut builder = TableSchema::builder(&table.name);
            for field in &table.fields {
                let spec = field.to_spec(&table.name, &built)?;
                builder = builder.field(&field.name, spec);
            }
            built.push(builder.build()?);
        }
        Ok(built)
    }
}

impl FieldDefinition {
    fn to_spec(&self, table: &str, built: &[TableSchema]) -> Result<FieldSpec> {
        let mut spec = FieldSpec::new(self.kind);
        spec.max_size = self.max_size;
        spec.min_size = self.min_size;
        spec.nullable = self.nullable;
        spec.unique = self.unique;
        spec.primary_key = self.primary_key;
        spec.auto_increment = self.auto_increment;
        if let Some(default) = &self.default {
            spec = spec.default(default.clone());
        }
        if let Some(fk) = &self.foreign_key {
            if fk.table == table {
                // The builder reports the self reference.
                return Ok(spec.references(ForeignKey {
                    table: fk.table.clone(),
                    field: fk.field.clone(),
                    on_delete: fk.on_delete,
                    on_update: fk.on_update,
                    target: None,
                }));
            }
            let target = built.iter().find(|t| t.name() == fk.table).ok_or_else(|| {
                Error::configuration(format!(
                    "field {} of table {table} references table {}, which is not defined before it",
                    self.name, fk.table
                ))
            })?;
            let mut foreign_key = ForeignKey::to(target, &fk.field);
            if let Some(action) = fk.on_delete {
                foreign_key = foreign_key.on_delete(action);
            }
            if let Some(action) = fk.on_update {
                foreign_key = foreign_key.on_update(action);
            }
            spec = spec.references(foreign_key);
        }
        Ok(spec)
    }
}
