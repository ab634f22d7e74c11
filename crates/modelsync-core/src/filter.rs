//! Filter expressions rendered to WHERE clauses.
//!
//! # Example
//!
//! ```
//! use modelsync_core::{FieldSpec, FilterExpr, MariaDbDialect, TableSchema};
//!
//! let people = TableSchema::builder("people")
//!     .field("age", FieldSpec::uint(150.0))
//!     .build()
//!     .unwrap();
//! let filter = FilterExpr::and(vec![
//!     FilterExpr::gte("age", 18),
//!     FilterExpr::lt("age", 65),
//! ]);
//! let sql = filter.render(&people, &MariaDbDialect::new()).unwrap();
//! assert_eq!(sql, "(`age` >= 18 AND `age` < 65)");
//! ```

use std::fmt;
use std::str::FromStr;

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::schema::TableSchema;
use crate::validate::Validator;
use crate::value::{Record, ToValue, Value};

/// Comparison operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    Like,
    In,
    Between,
}

impl Operator {
    /// Returns the SQL token.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Gte => ">=",
            Self::Lte => "<=",
            Self::Like => "LIKE",
            Self::In => "IN",
            Self::Between => "BETWEEN",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "=" => Ok(Self::Eq),
            "!=" => Ok(Self::Ne),
            ">" => Ok(Self::Gt),
            "<" => Ok(Self::Lt),
            ">=" => Ok(Self::Gte),
            "<=" => Ok(Self::Lte),
            "LIKE" => Ok(Self::Like),
            "IN" => Ok(Self::In),
            "BETWEEN" => Ok(Self::Between),
            _ => Err(Error::filter(format!("unsupported operator: {s}"))),
        }
    }
}

/// How the children of a group are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

impl FromStr for Combinator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "AND" => Ok(Self::And),
            "OR" => Ok(Self::Or),
            _ => Err(Error::filter(format!(
                "invalid combinator {s:?}, expected AND or OR"
            ))),
        }
    }
}

/// A filter tree: predicates combined by AND/OR groups.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Predicate {
        field: String,
        operator: Operator,
        value: Value,
    },
    Group {
        combinator: Combinator,
        children: Vec<FilterExpr>,
    },
}

impl FilterExpr {
    /// Creates a predicate.
    #[must_use]
    pub fn predicate<V: ToValue>(field: &str, operator: Operator, value: V) -> Self {
        Self::Predicate {
            field: field.to_string(),
            operator,
            value: value.to_value(),
        }
    }

    #[must_use]
    pub fn eq<V: ToValue>(field: &str, value: V) -> Self {
        Self::predicate(field, Operator::Eq, value)
    }

    #[must_use]
    pub fn ne<V: ToValue>(field: &str, value: V) -> Self {
        Self::predicate(field, Operator::Ne, value)
    }

    #[must_use]
    pub fn gt<V: ToValue>(field: &str, value: V) -> Self {
        Self::predicate(field, Operator::Gt, value)
    }

    #[must_use]
    pub fn lt<V: ToValue>(field: &str, value: V) -> Self {
        Self::predicate(field, Operator::Lt, value)
    }

    #[must_use]
    pub fn gte<V: ToValue>(field: &str, value: V) -> Self {
        Self::predicate(field, Operator::Gte, value)
    }

    #[must_use]
    pub fn lte<V: ToValue>(field: &str, value: V) -> Self {
        Self::predicate(field, Operator::Lte, value)
    }

    #[must_use]
    pub fn like(field: &str, pattern: &str) -> Self {
        Self::predicate(field, Operator::Like, pattern)
    }

    /// `field IS NULL`.
    #[must_use]
    pub fn is_null(field: &str) -> Self {
        Self::predicate(field, Operator::Eq, Value::Null)
    }

    /// `field IS NOT NULL`.
    #[must_use]
    pub fn is_not_null(field: &str) -> Self {
        Self::predicate(field, Operator::Ne, Value::Null)
    }

    /// `field IN (values...)`.
    #[must_use]
    pub fn in_list<V: ToValue>(field: &str, values: Vec<V>) -> Self {
        Self::predicate(field, Operator::In, values)
    }

    /// `field BETWEEN low AND high`.
    #[must_use]
    pub fn between<V: ToValue>(field: &str, low: V, high: V) -> Self {
        Self::predicate(
            field,
            Operator::Between,
            Value::List(vec![low.to_value(), high.to_value()]),
        )
    }

    /// Joins children with AND.
    #[must_use]
    pub fn and(children: Vec<FilterExpr>) -> Self {
        Self::Group {
            combinator: Combinator::And,
            children,
        }
    }

    /// Joins children with OR.
    #[must_use]
    pub fn or(children: Vec<FilterExpr>) -> Self {
        Self::Group {
            combinator: Combinator::Or,
            children,
        }
    }

    /// AND of equality predicates, one per record entry.
    #[must_use]
    pub fn all_equal(record: &Record) -> Self {
        Self::and(
            record
                .iter()
                .map(|(field, value)| Self::eq(field.as_str(), value.clone()))
                .collect(),
        )
    }

    /// Checks field names, operands and values against the schema without
    /// rendering.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Filter`] for an unknown field, an empty group or a
    /// malformed list operand, and [`Error::Validation`] for a value the
    /// field does not accept.
    pub fn validate(&self, schema: &TableSchema) -> Result<()> {
        match self {
            Self::Predicate {
                field,
                operator,
                value,
            } => check_predicate(schema, field, *operator, value),
            Self::Group {
                combinator,
                children,
            } => {
                if children.is_empty() {
                    return Err(Error::filter(format!(
                        "{} group must contain at least one filter",
                        combinator.as_sql()
                    )));
                }
                children.iter().try_for_each(|child| child.validate(schema))
            }
        }
    }

    /// Validates and renders the filter as a WHERE fragment.
    ///
    /// # Errors
    ///
    /// See [`FilterExpr::validate`].
    pub fn render(&self, schema: &TableSchema, dialect: &impl Dialect) -> Result<String> {
        self.validate(schema)?;
        Ok(self.render_unchecked(dialect))
    }

    fn render_unchecked(&self, dialect: &impl Dialect) -> String {
        match self {
            Self::Predicate {
                field,
                operator,
                value,
            } => {
                let column = dialect.escape_identifier(field);
                match (operator, value) {
                    (Operator::Eq, Value::Null) => format!("{column} IS NULL"),
                    (Operator::Ne, Value::Null) => format!("{column} IS NOT NULL"),
                    (Operator::In, Value::List(_)) => {
                        format!("{column} IN ({})", dialect.escape_literal(value))
                    }
                    (Operator::Between, Value::List(bounds)) => format!(
                        "{column} BETWEEN {} AND {}",
                        dialect.escape_literal(&bounds[0]),
                        dialect.escape_literal(&bounds[1])
                    ),
                    (operator, value) => {
                        format!("{column} {operator} {}", dialect.escape_literal(value))
                    }
                }
            }
            Self::Group {
                combinator,
                children,
            } => {
                let parts: Vec<String> = children
                    .iter()
                    .map(|child| child.render_unchecked(dialect))
                    .collect();
                format!("({})", parts.join(&format!(" {} ", combinator.as_sql())))
            }
        }
    }
}

fn check_predicate(
    schema: &TableSchema,
    field: &str,
    operator: Operator,
    value: &Value,
) -> Result<()> {
    if !schema.has_field(field) {
        return Err(Error::filter(format!(
            "field {field} doesn't exist in table {}",
            schema.name()
        )));
    }
    let validator = Validator::new(schema);
    match (operator, value) {
        (Operator::In, Value::List(items)) if !items.is_empty() => items
            .iter()
            .try_for_each(|item| validator.check_value(field, item)),
        (Operator::In, _) => Err(Error::filter(format!(
            "IN on field {field} requires a non-empty list"
        ))),
        (Operator::Between, Value::List(items)) if items.len() == 2 => items
            .iter()
            .try_for_each(|item| validator.check_value(field, item)),
        (Operator::Between, _) => Err(Error::filter(format!(
            "BETWEEN on field {field} requires exactly two values"
        ))),
        (operator, Value::List(_)) => Err(Error::filter(format!(
            "operator {operator} on field {field} does not accept a list"
        ))),
        (_, value) => validator.check_value(field, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::MariaDbDialect;
    use crate::schema::FieldSpec;

    fn people() -> TableSchema {
        TableSchema::builder("people")
            .field("id", FieldSpec::uint(65535.0).primary_key().auto_increment())
            .field("name", FieldSpec::string(50.0))
            .field("age", FieldSpec::uint(150.0))
            .field("nick", FieldSpec::string(20.0).nullable())
            .build()
            .unwrap()
    }

    fn render(filter: &FilterExpr) -> Result<String> {
        filter.render(&people(), &MariaDbDialect::new())
    }

    #[test]
    fn test_and_group() {
        let filter = FilterExpr::and(vec![FilterExpr::gte("age", 18), FilterExpr::lt("age", 65)]);
        assert_eq!(render(&filter).unwrap(), "(`age` >= 18 AND `age` < 65)");
    }

    #[test]
    fn test_nested_groups() {
        let filter = FilterExpr::or(vec![
            FilterExpr::eq("name", "O'Neil"),
            FilterExpr::and(vec![
                FilterExpr::like("nick", "a%"),
                FilterExpr::ne("age", 3),
            ]),
        ]);
        assert_eq!(
            render(&filter).unwrap(),
            "(`name` = 'O\\'Neil' OR (`nick` LIKE 'a%' AND `age` != 3))"
        );
    }

    #[test]
    fn test_null_comparisons() {
        assert_eq!(
            render(&FilterExpr::is_null("nick")).unwrap(),
            "`nick` IS NULL"
        );
        assert_eq!(
            render(&FilterExpr::is_not_null("nick")).unwrap(),
            "`nick` IS NOT NULL"
        );
        assert!(render(&FilterExpr::eq("name", Value::Null)).is_err());
    }

    #[test]
    fn test_in_and_between() {
        assert_eq!(
            render(&FilterExpr::in_list("age", vec![1, 2, 3])).unwrap(),
            "`age` IN (1, 2, 3)"
        );
        assert_eq!(
            render(&FilterExpr::between("age", 18, 65)).unwrap(),
            "`age` BETWEEN 18 AND 65"
        );
        assert!(matches!(
            render(&FilterExpr::in_list::<i32>("age", vec![])),
            Err(Error::Filter(_))
        ));
        assert!(matches!(
            render(&FilterExpr::predicate("age", Operator::Between, vec![1])),
            Err(Error::Filter(_))
        ));
        assert!(matches!(
            render(&FilterExpr::in_list("age", vec![1, 200])),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            render(&FilterExpr::predicate("age", Operator::Gt, vec![1, 2])),
            Err(Error::Filter(_))
        ));
    }

    #[test]
    fn test_unknown_field() {
        let err = render(&FilterExpr::eq("email", "x")).unwrap_err();
        assert!(matches!(err, Error::Filter(ref m) if m.contains("email")));
    }

    #[test]
    fn test_invalid_value() {
        let err = render(&FilterExpr::eq("age", "old")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_empty_group() {
        assert!(matches!(
            render(&FilterExpr::and(vec![])),
            Err(Error::Filter(_))
        ));
        let nested = FilterExpr::or(vec![FilterExpr::eq("age", 1), FilterExpr::and(vec![])]);
        assert!(matches!(render(&nested), Err(Error::Filter(_))));
    }

    #[test]
    fn test_parse_operator_and_combinator() {
        assert_eq!("like".parse::<Operator>().unwrap(), Operator::Like);
        assert_eq!(">=".parse::<Operator>().unwrap(), Operator::Gte);
        assert!(matches!("~".parse::<Operator>(), Err(Error::Filter(_))));
        assert_eq!("OR".parse::<Combinator>().unwrap(), Combinator::Or);
        assert!(matches!("XOR".parse::<Combinator>(), Err(Error::Filter(_))));
    }

    #[test]
    fn test_all_equal() {
        let mut record = Record::new();
        record.insert("age".to_string(), Value::Int(30));
        record.insert("name".to_string(), Value::Text("ann".into()));
        assert_eq!(
            render(&FilterExpr::all_equal(&record)).unwrap(),
            "(`age` = 30 AND `name` = 'ann')"
        );
    }
}
