//! Error types for the ORM.

use thiserror::Error;

/// ORM errors.
#[derive(Debug, Error)]
pub enum OrmError {
    /// Schema, validation, filter or diff error raised before any I/O.
    #[error(transparent)]
    Core(#[from] modelsync_core::Error),

    /// Database error from sqlx, passed through unchanged.
    #[error("database error: {0}")]
    Connection(#[from] sqlx::Error),

    /// The connection has not been opened, or was closed.
    #[error("database is not connected")]
    NotConnected,

    /// The server answered with something that couldn't be interpreted.
    #[error("unexpected response from database: {0}")]
    UnexpectedResponse(String),

    /// A connection or model with this name already exists.
    #[error("{kind} {name} is already registered")]
    AlreadyRegistered { kind: &'static str, name: String },

    /// No connection or model with this name exists.
    #[error("{kind} {name} is not registered")]
    NotRegistered { kind: &'static str, name: String },
}

/// Result type alias for ORM operations.
pub type Result<T> = std::result::Result<T, OrmError>;
