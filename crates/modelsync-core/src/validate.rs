//! Record validation against a table schema.

use crate::error::{Error, Result};
use crate::schema::{FieldKind, FieldSpec, TableSchema};
use crate::value::{Record, Value};

/// What a record is validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// A full row about to be inserted.
    Create,
    /// A full row replacing the stored one.
    Update,
    /// Values compared against in a lookup. Required fields may be absent.
    Predicate,
}

/// Validates records against a borrowed [`TableSchema`].
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    schema: &'a TableSchema,
}

impl<'a> Validator<'a> {
    #[must_use]
    pub const fn new(schema: &'a TableSchema) -> Self {
        Self { schema }
    }

    /// Checks a whole record.
    ///
    /// In create and update mode the record must not be empty and must give
    /// every required field a non-null value. In every mode each present
    /// field must exist and hold a value its type accepts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] describing the first problem found.
    pub fn validate(&self, record: &Record, mode: Mode) -> Result<()> {
        let table = self.schema.name();
        if mode != Mode::Predicate {
            if record.is_empty() {
                return Err(Error::validation(format!(
                    "no fields given for table {table}"
                )));
            }
            let missing: Vec<&str> = self
                .schema
                .non_nullable_fields()
                .iter()
                .filter(|name| record.get(name.as_str()).is_none_or(Value::is_null))
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                return Err(Error::validation(format!(
                    "missing required fields of table {table}: {}",
                    missing.join(", ")
                )));
            }
        }

        for (name, value) in record {
            self.check_value(name, value)?;
        }
        Ok(())
    }

    /// Checks a single value for the named field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the field doesn't exist or the value
    /// violates its type, bounds or nullability.
    pub fn check_value(&self, name: &str, value: &Value) -> Result<()> {
        let table = self.schema.name();
        let spec = self.schema.field(name).ok_or_else(|| {
            Error::validation(format!("field {name} doesn't exist in table {table}"))
        })?;
        let required = self.schema.non_nullable_fields().iter().any(|f| f == name);
        check_field_value(table, name, spec, value, required)
    }
}

/// Checks one value against one field specification.
pub(crate) fn check_field_value(
    table: &str,
    name: &str,
    spec: &FieldSpec,
    value: &Value,
    required: bool,
) -> Result<()> {
    let fail = |what: &str| {
        Err(Error::validation(format!(
            "field {name} of table {table} {what}, got {value}"
        )))
    };

    match value {
        Value::Null if required => return fail("cannot be null"),
        Value::Null => return Ok(()),
        Value::List(_) => return fail("does not accept a list"),
        _ => {}
    }

    match spec.kind {
        FieldKind::SignedInt | FieldKind::UnsignedInt => {
            if !value.is_whole_number() {
                return fail("has to be an integer");
            }
        }
        FieldKind::Decimal => {
            if !value.as_f64().is_some_and(f64::is_finite) {
                return fail("has to be a number");
            }
        }
        FieldKind::Boolean => {
            if !matches!(value, Value::Bool(_)) {
                return fail("has to be a boolean");
            }
        }
        FieldKind::String => {
            if !matches!(value, Value::Text(_)) {
                return fail("has to be a string");
            }
        }
        FieldKind::Timestamp => return Ok(()),
    }

    if let Some(number) = value.as_f64() {
        if spec.kind == FieldKind::UnsignedInt && number < 0.0 {
            return fail("has to be unsigned");
        }
        if let Some(min) = spec.min_size {
            if number < min {
                return fail(&format!("has to be at least {min}"));
            }
        }
        if let Some(max) = spec.max_size {
            if number > max {
                return fail(&format!("has to be at most {max}"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> TableSchema {
        TableSchema::builder("people")
            .field("id", FieldSpec::uint(65535.0).primary_key().auto_increment())
            .field("name", FieldSpec::string(50.0))
            .field("age", FieldSpec::uint(150.0).min_size(1.0))
            .field("balance", FieldSpec::decimal(9999.99).nullable())
            .field("offset", FieldSpec::sint(1000.0).min_size(-1000.0).nullable())
            .field("active", FieldSpec::boolean().default(false))
            .field("seen_at", FieldSpec::timestamp(0.0).nullable())
            .build()
            .unwrap()
    }

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_valid_create() {
        let schema = people();
        let validator = Validator::new(&schema);
        let rec = record(&[
            ("name", Value::Text("Ann".into())),
            ("age", Value::Int(30)),
            ("balance", Value::Float(12.5)),
        ]);
        assert!(validator.validate(&rec, Mode::Create).is_ok());
    }

    #[test]
    fn test_empty_record() {
        let schema = people();
        let validator = Validator::new(&schema);
        assert!(validator.validate(&Record::new(), Mode::Create).is_err());
        assert!(validator.validate(&Record::new(), Mode::Update).is_err());
        assert!(validator.validate(&Record::new(), Mode::Predicate).is_ok());
    }

    #[test]
    fn test_missing_required_fields_are_listed() {
        let schema = people();
        let validator = Validator::new(&schema);
        let err = validator
            .validate(&record(&[("name", Value::Null)]), Mode::Create)
            .unwrap_err();
        let Error::Validation(message) = err else {
            panic!("expected validation error");
        };
        assert!(message.contains("name, age"));
    }

    #[test]
    fn test_required_fields_not_needed_for_predicates() {
        let schema = people();
        let validator = Validator::new(&schema);
        assert!(validator
            .validate(&record(&[("age", Value::Int(3))]), Mode::Predicate)
            .is_ok());
        assert!(validator
            .validate(&record(&[("age", Value::Null)]), Mode::Predicate)
            .is_err());
    }

    #[test]
    fn test_unknown_field() {
        let schema = people();
        let validator = Validator::new(&schema);
        let err = validator
            .validate(&record(&[("nickname", Value::Text("x".into()))]), Mode::Predicate)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m.contains("nickname")));
    }

    #[test]
    fn test_integer_checks() {
        let schema = people();
        let validator = Validator::new(&schema);
        assert!(validator.check_value("age", &Value::Int(150)).is_ok());
        assert!(validator.check_value("age", &Value::Float(20.0)).is_ok());
        assert!(validator.check_value("age", &Value::Float(20.5)).is_err());
        assert!(validator.check_value("age", &Value::Int(151)).is_err());
        assert!(validator.check_value("age", &Value::Int(0)).is_err());
        assert!(validator.check_value("age", &Value::Text("3".into())).is_err());
        assert!(validator.check_value("offset", &Value::Int(-1000)).is_ok());
        assert!(validator.check_value("offset", &Value::Int(-1001)).is_err());
    }

    #[test]
    fn test_unsigned_rejects_negative() {
        let schema = TableSchema::builder("t")
            .field("n", FieldSpec::uint(10.0))
            .build()
            .unwrap();
        let err = Validator::new(&schema)
            .check_value("n", &Value::Int(-1))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m.contains("unsigned")));
    }

    #[test]
    fn test_other_kinds() {
        let schema = people();
        let validator = Validator::new(&schema);
        assert!(validator.check_value("balance", &Value::Int(10)).is_ok());
        assert!(validator.check_value("balance", &Value::Float(10000.0)).is_err());
        assert!(validator.check_value("balance", &Value::Float(f64::NAN)).is_err());
        assert!(validator.check_value("active", &Value::Bool(true)).is_ok());
        assert!(validator.check_value("active", &Value::Int(1)).is_err());
        assert!(validator.check_value("name", &Value::Int(1)).is_err());
        assert!(validator.check_value("name", &Value::Text(String::new())).is_ok());
        assert!(validator
            .check_value("seen_at", &Value::Text("2024-01-01 00:00:00".into()))
            .is_ok());
    }

    #[test]
    fn test_nulls() {
        let schema = people();
        let validator = Validator::new(&schema);
        assert!(validator.check_value("balance", &Value::Null).is_ok());
        assert!(validator.check_value("active", &Value::Null).is_ok());
        assert!(validator.check_value("id", &Value::Null).is_ok());
        assert!(validator.check_value("name", &Value::Null).is_err());
    }

    #[test]
    fn test_lists_rejected() {
        let schema = people();
        let validator = Validator::new(&schema);
        let list = Value::List(vec![Value::Int(1)]);
        assert!(validator.check_value("age", &list).is_err());
    }
}
