//! Dialect-aware schema reconciliation.
//!
//! `oxide-reconcile` brings a live database schema in line with a desired set
//! of tables. It reads the catalog, diffs it against the desired model and
//! runs the DDL that closes the gap, all inside one transaction. It only
//! moves forward: columns and unique indexes are dropped only when the
//! matching option is enabled.
//!
//! # Architecture
//!
//! - **Dialect** - Type mapping, quoting, catalog queries and DDL per database
//! - **Introspector** - Reads columns, indexes and constraints of live tables
//! - **Differ** - Computes the change-set for an existing table
//! - **Allocator** - Reserves a disjoint primary key range per table
//! - **Migrate** - Owns the transaction and the per-table execution order
//!
//! # Example
//!
//! ```rust,ignore
//! use oxide_reconcile::prelude::*;
//!
//! let users = Table::new("users")
//!     .primary(Column::new("id", ColumnType::Int).increment())
//!     .column(Column::new("name", ColumnType::String).nullable())
//!     .column(Column::new("age", ColumnType::Int));
//! let pets = Table::new("pets")
//!     .primary(Column::new("id", ColumnType::Int).increment())
//!     .column(Column::new("owner_id", ColumnType::Int).nullable())
//!     .foreign_key(
//!         ForeignKey::new("pets_owner", ["owner_id"], "users", ["id"])
//!             .on_delete(ForeignKeyAction::Cascade),
//!     );
//!
//! let driver = PgDriver::connect("postgres://localhost/app").await?;
//! Migrate::new(driver, PostgresDialect::new())
//!     .with_options(MigrateOptions::new().with_global_unique_id(true))
//!     .create(&[users, pets])
//!     .await?;
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Show the statements that would run
//! oxide-reconcile --schema schema.json plan
//!
//! # Apply them, allowing column removal
//! oxide-reconcile --schema schema.json apply --drop-column
//! ```

pub mod allocator;
pub mod config;
pub mod conn;
pub mod dialect;
pub mod diff;
pub mod error;
pub mod ident;
pub mod introspect;
pub mod migrate;
pub mod options;
pub mod schema;
pub mod sqlx_conn;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::allocator::{TypeRegistry, MAX_TYPES, RANGE, TYPE_TABLE};
    pub use crate::config::ReconcileConfig;
    pub use crate::conn::{Driver, DryRun, Row, Statement, Transaction, Value};
    pub use crate::dialect::{ConstraintKind, Dialect, MySqlDialect, PostgresDialect};
    pub use crate::diff::{ChangeSet, Differ};
    pub use crate::error::{ErrorKind, ReconcileError, Result};
    pub use crate::ident::shorten;
    pub use crate::introspect::{Introspector, LiveColumn, LiveIndex, LiveTable};
    pub use crate::migrate::Migrate;
    pub use crate::options::MigrateOptions;
    pub use crate::schema::{
        Column, ColumnType, DefaultValue, ForeignKey, ForeignKeyAction, Table,
    };
    pub use crate::sqlx_conn::{MySqlDriver, PgDriver};
}
