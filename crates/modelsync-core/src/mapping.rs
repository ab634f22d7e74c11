//! Mapping of logical fields to MariaDB column types.
//!
//! Integer widths are chosen from the declared maximum value, decimal
//! precision and scale from the digits of the maximum, and string length and
//! timestamp precision straight from `max_size`.

use std::fmt;

use crate::error::{Error, Result};
use crate::schema::{FieldKind, FieldSpec, ReferentialAction};
use crate::value::Value;

/// Physical MariaDB column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalType {
    TinyInt,
    SmallInt,
    MediumInt,
    Int,
    BigInt,
    Decimal,
    Boolean,
    Varchar,
    Timestamp,
}

impl PhysicalType {
    /// Returns the SQL keyword for this type.
    #[must_use]
    pub const fn sql_name(self) -> &'static str {
        match self {
            Self::TinyInt => "TINYINT",
            Self::SmallInt => "SMALLINT",
            Self::MediumInt => "MEDIUMINT",
            Self::Int => "INT",
            Self::BigInt => "BIGINT",
            Self::Decimal => "DECIMAL",
            Self::Boolean => "BOOLEAN",
            Self::Varchar => "VARCHAR",
            Self::Timestamp => "TIMESTAMP",
        }
    }

    /// Returns `true` for the integer types.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::TinyInt | Self::SmallInt | Self::MediumInt | Self::Int | Self::BigInt
        )
    }
}

/// Size argument of a column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSize {
    /// No size argument.
    None,
    /// A single argument: display width, length or precision.
    Length(u32),
    /// Decimal precision and scale.
    Decimal { precision: u32, scale: u32 },
}

/// Target of a foreign key, as carried by a physical column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyTarget {
    pub table: String,
    pub field: String,
    pub on_delete: Option<ReferentialAction>,
    pub on_update: Option<ReferentialAction>,
}

/// A field translated to a concrete column.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalColumn {
    pub physical_type: PhysicalType,
    pub size: TypeSize,
    pub unsigned: bool,
    pub nullable: bool,
    /// Only ever set for integer columns.
    pub primary_key: bool,
    pub auto_increment: bool,
    pub unique: bool,
    pub default: Option<Value>,
    pub foreign_key: Option<ForeignKeyTarget>,
}

impl PhysicalColumn {
    /// Returns the type as written in DDL, e.g. `INT(10) UNSIGNED`.
    #[must_use]
    pub fn type_sql(&self) -> String {
        let mut sql = self.physical_type.sql_name().to_string();
        sql.push_str(&self.size.to_string());
        if self.unsigned {
            sql.push_str(" UNSIGNED");
        }
        sql
    }

    /// Returns the type the way `DESCRIBE` reports it, e.g.
    /// `int(10) unsigned`.
    ///
    /// `BOOLEAN` is an alias for `TINYINT(1)` and is reported as such.
    #[must_use]
    pub fn describe_type(&self) -> String {
        if self.physical_type == PhysicalType::Boolean {
            return "tinyint(1)".to_string();
        }
        self.type_sql().to_ascii_lowercase()
    }
}

impl fmt::Display for TypeSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Length(n) => write!(f, "({n})"),
            Self::Decimal { precision, scale } => write!(f, "({precision},{scale})"),
        }
    }
}

/// Maps a field to its physical column.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if a non-boolean field has no
/// `max_size`, or if the size cannot be expressed by the target type.
pub fn map_field(spec: &FieldSpec) -> Result<PhysicalColumn> {
    let max = || {
        spec.max_size.ok_or_else(|| {
            Error::configuration(format!("{} field requires a maxSize", spec.kind))
        })
    };
    let (physical_type, size) = match spec.kind {
        FieldKind::Boolean => (PhysicalType::Boolean, TypeSize::None),
        FieldKind::SignedInt => integer_type(max()?, true)?,
        FieldKind::UnsignedInt => integer_type(max()?, false)?,
        FieldKind::Decimal => decimal_size(max()?)?,
        FieldKind::String => varchar_size(max()?)?,
        FieldKind::Timestamp => timestamp_size(max()?)?,
    };

    Ok(PhysicalColumn {
        physical_type,
        size,
        unsigned: spec.kind == FieldKind::UnsignedInt,
        nullable: spec.nullable,
        primary_key: spec.primary_key && physical_type.is_integer(),
        auto_increment: spec.auto_increment,
        unique: spec.unique,
        default: spec.default.clone(),
        foreign_key: spec.foreign_key.as_ref().map(|fk| ForeignKeyTarget {
            table: fk.table().to_string(),
            field: fk.field().to_string(),
            on_delete: fk.delete_action(),
            on_update: fk.update_action(),
        }),
    })
}

#[allow(clippy::cast_possible_truncation)]
fn integer_type(max: f64, signed: bool) -> Result<(PhysicalType, TypeSize)> {
    // A signed column needs one more bit for the same positive range.
    let range = if signed { max * 2.0 } else { max };
    let bytes = (range.log2() / 8.0).ceil();
    let invalid = || {
        Error::configuration(format!(
            "invalid size for integer field: maxSize {max} needs {bytes} bytes"
        ))
    };
    if !bytes.is_finite() {
        return Err(invalid());
    }
    let physical_type = match bytes as i64 {
        0 | 1 => PhysicalType::TinyInt,
        2 => PhysicalType::SmallInt,
        3 => PhysicalType::MediumInt,
        4 => PhysicalType::Int,
        5..=8 => PhysicalType::BigInt,
        _ => return Err(invalid()),
    };
    Ok((physical_type, TypeSize::Length(decimal_digits(max))))
}

fn decimal_size(max: f64) -> Result<(PhysicalType, TypeSize)> {
    if !max.is_finite() || max <= 0.0 {
        return Err(Error::configuration(format!(
            "invalid size for decimal field: {max}"
        )));
    }
    let printed = max.to_string();
    let scale = printed
        .split_once('.')
        .map_or(0, |(_, fraction)| fraction.len());
    let scale = u32::try_from(scale).unwrap_or(u32::MAX);
    let precision = decimal_digits(max.floor()).saturating_add(scale);
    if precision > 65 || scale > 38 {
        return Err(Error::configuration(format!(
            "invalid size for decimal field: DECIMAL({precision},{scale}) exceeds the supported range"
        )));
    }
    Ok((PhysicalType::Decimal, TypeSize::Decimal { precision, scale }))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn varchar_size(max: f64) -> Result<(PhysicalType, TypeSize)> {
    if max.fract() != 0.0 || !(1.0..=65535.0).contains(&max) {
        return Err(Error::configuration(format!(
            "invalid length for string field: {max}"
        )));
    }
    Ok((PhysicalType::Varchar, TypeSize::Length(max as u32)))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn timestamp_size(max: f64) -> Result<(PhysicalType, TypeSize)> {
    if max.fract() != 0.0 || !(0.0..=6.0).contains(&max) {
        return Err(Error::configuration(format!(
            "invalid fractional seconds precision for timestamp field: {max}"
        )));
    }
    let size = if max == 0.0 {
        TypeSize::None
    } else {
        TypeSize::Length(max as u32)
    };
    Ok((PhysicalType::Timestamp, size))
}

/// Computes `ceil(log10(value + 1))` without floating point rounding: the
/// smallest `d` such that `10^d >= value + 1`.
fn decimal_digits(value: f64) -> u32 {
    let target = value + 1.0;
    let mut digits = 0;
    let mut bound = 1.0_f64;
    while bound < target && bound.is_finite() {
        bound *= 10.0;
        digits += 1;
    }
    digits
}
