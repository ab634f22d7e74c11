//! Error types for the model core.

use thiserror::Error;

/// Errors raised by schema construction, validation, filter rendering and
/// schema diffing.
///
/// None of these involve I/O: each one is raised before a statement is sent
/// to the database.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A field specification is malformed (missing size, bad foreign key,
    /// unmappable numeric width).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A record or predicate value violates its field's constraints.
    #[error("validation error: {0}")]
    Validation(String),

    /// A filter tree is malformed (unknown field, unsupported operator,
    /// empty group, invalid combinator).
    #[error("filter error: {0}")]
    Filter(String),

    /// The live table cannot be reconciled with the desired schema.
    #[error("schema error: {0}")]
    Schema(String),
}

impl Error {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn filter(message: impl Into<String>) -> Self {
        Self::Filter(message.into())
    }

    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
