//! Models bound to live MariaDB tables.
//!
//! `modelsync-orm` puts the pure schema machinery of `modelsync-core` behind
//! an async [`Connection`]:
//!
//! - **Connection** - The database seam, implemented for MariaDB over a sqlx pool
//! - **Sync** - Describe, diff and apply in one call
//! - **Model** - Validated CRUD on a reconciled table
//! - **Registry** - Named connections and the models registered on them
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use modelsync_orm::prelude::*;
//!
//! # async fn run() -> modelsync_orm::Result<()> {
//! let users = TableSchema::builder("users")
//!     .field("id", FieldSpec::uint(4_294_967_295.0).primary_key().auto_increment())
//!     .field("email", FieldSpec::string(255.0).unique())
//!     .build()?;
//!
//! let mut registry = Registry::new();
//! registry
//!     .register_connection("default", MariaDbConnection::new(&MariaDbConfig::new("app")))
//!     .await?;
//! let users = registry.register_model("default", Arc::new(users)).await?;
//!
//! let mut record = Record::new();
//! record.insert("email".into(), "ann@example.com".to_value());
//! let stored = users.create(&record).await?;
//! println!("{stored:?}");
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod mariadb;
pub mod model;
pub mod registry;
pub mod sync;

pub use connection::Connection;
pub use error::{OrmError, Result};
pub use mariadb::{MariaDbConfig, MariaDbConnection};
pub use model::Model;
pub use registry::Registry;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::connection::Connection;
    pub use crate::error::{OrmError, Result};
    pub use crate::mariadb::{MariaDbConfig, MariaDbConnection};
    pub use crate::model::Model;
    pub use crate::registry::Registry;
    pub use modelsync_core::prelude::*;
}
