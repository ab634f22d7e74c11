//! Declarative table models for MariaDB.
//!
//! `modelsync-core` holds everything that doesn't touch the network:
//!
//! - **Schema** - Logical field and table definitions, checked once at build time
//! - **Mapping** - Translation of logical fields to physical MariaDB column types
//! - **Diff** - Comparison of a desired table with the live one, producing a plan
//! - **Filter** - AND/OR predicate trees rendered to escaped WHERE fragments
//! - **Validate** - Record checks for create, update and lookup
//! - **Dialect** - Identifier/literal escaping and statement generation
//!
//! # Example
//!
//! ```
//! use modelsync_core::prelude::*;
//!
//! let users = TableSchema::builder("users")
//!     .field("id", FieldSpec::uint(4_294_967_295.0).primary_key().auto_increment())
//!     .field("email", FieldSpec::string(255.0).unique())
//!     .build()
//!     .unwrap();
//!
//! // Nothing exists yet, so the plan creates the table.
//! let plan = diff_table(&users, &[]).unwrap();
//! let sql = MariaDbDialect::new().plan_sql(&plan).unwrap();
//! assert!(sql.starts_with("CREATE TABLE `users`"));
//! ```

pub mod dialect;
pub mod diff;
pub mod error;
pub mod filter;
pub mod live;
pub mod mapping;
pub mod schema;
pub mod validate;
pub mod value;

pub use dialect::{Dialect, MariaDbDialect};
pub use diff::{diff_table, CreateTable, Operation, Plan};
pub use error::{Error, Result};
pub use filter::{Combinator, FilterExpr, Operator};
pub use live::{KeyKind, LiveColumn};
pub use mapping::{map_field, PhysicalColumn, PhysicalType};
pub use schema::{
    FieldKind, FieldSpec, ForeignKey, ReferentialAction, SchemaDocument, TableSchema,
};
pub use validate::{Mode, Validator};
pub use value::{Record, ToValue, Value};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::dialect::{Dialect, MariaDbDialect};
    pub use crate::diff::{diff_table, Operation, Plan};
    pub use crate::error::{Error, Result};
    pub use crate::filter::{Combinator, FilterExpr, Operator};
    pub use crate::live::{KeyKind, LiveColumn};
    pub use crate::schema::{
        FieldKind, FieldSpec, ForeignKey, ReferentialAction, SchemaDocument, TableSchema,
    };
    pub use crate::validate::{Mode, Validator};
    pub use crate::value::{Record, ToValue, Value};
}
