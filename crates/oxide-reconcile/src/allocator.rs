//! Global unique ID allocation.
//!
//! Every table with a single auto-increment primary key is registered in a
//! bookkeeping table. Its position in that table is its slot, and the slot
//! decides the first identity value: `slot * RANGE`. Tables therefore draw
//! their keys from disjoint ranges.
//!
//! The registry is re-read at the start of every migration. Concurrent
//! migrations against the same schema may race on registration.

use tracing::{debug, info};

use crate::conn::{execute, Statement, Transaction};
use crate::dialect::Dialect;
use crate::error::{ReconcileError, Result};
use crate::introspect::Introspector;
use crate::schema::{Column, ColumnType, Table};

/// Name of the bookkeeping table.
pub const TYPE_TABLE: &str = "oxide_types";

/// Size of the ID range reserved per type.
pub const RANGE: u64 = 1 << 32;

/// Maximum number of registered types.
pub const MAX_TYPES: usize = u16::MAX as usize;

/// Returns the definition of the bookkeeping table.
#[must_use]
pub fn types_table() -> Table {
    Table::new(TYPE_TABLE)
        .primary(Column::new("id", ColumnType::Int).increment())
        .column(Column::new("type", ColumnType::String).unique())
}

/// Returns the first identity value of `slot`.
#[must_use]
pub fn range_start(slot: usize) -> u64 {
    slot as u64 * RANGE
}

/// Registered types in slot order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeRegistry {
    types: Vec<String>,
}

impl TypeRegistry {
    /// Creates a registry from types in slot order.
    #[must_use]
    pub fn new(types: Vec<String>) -> Self {
        Self { types }
    }

    /// Returns the registered types in slot order.
    #[must_use]
    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// Returns the slot of `name`, if registered.
    #[must_use]
    pub fn slot(&self, name: &str) -> Option<usize> {
        self.types.iter().position(|t| t == name)
    }

    /// Creates the bookkeeping table, or reads it when it exists.
    pub async fn load<T: Transaction>(
        dialect: &dyn Dialect,
        introspector: &Introspector<'_>,
        tx: &mut T,
    ) -> Result<Self> {
        if !introspector.table_exists(tx, TYPE_TABLE).await? {
            execute(tx, &dialect.create_table(&types_table())?).await?;
            info!(table = TYPE_TABLE, "Created type registry");
            return Ok(Self::default());
        }

        let stmt = Statement::new(format!(
            "SELECT {} FROM {} ORDER BY {} ASC",
            dialect.quote_identifier("type"),
            dialect.quote_identifier(TYPE_TABLE),
            dialect.quote_identifier("id")
        ));
        debug!(sql = %stmt, "Querying type registry");
        let rows = tx.query(&stmt).await?;
        let types = rows.iter().map(|row| row.text(0)).collect::<Result<Vec<_>>>()?;
        Ok(Self::new(types))
    }

    /// Assigns `table` its ID range.
    ///
    /// Must run right after the table was created. A table that is already
    /// registered is restored at its slot without a new registry row.
    pub async fn allocate<T: Transaction>(
        &mut self,
        dialect: &dyn Dialect,
        tx: &mut T,
        table: &str,
        column: &str,
    ) -> Result<u64> {
        let slot = match self.slot(table) {
            Some(slot) => {
                info!(table, slot, "Restoring ID range");
                slot
            }
            None => self.register(dialect, tx, table).await?,
        };
        let start = range_start(slot);
        execute(tx, &dialect.restart_identity(table, column, start)).await?;
        Ok(start)
    }

    async fn register<T: Transaction>(
        &mut self,
        dialect: &dyn Dialect,
        tx: &mut T,
        table: &str,
    ) -> Result<usize> {
        if self.types.len() >= MAX_TYPES {
            return Err(ReconcileError::TooManyTypes { max: MAX_TYPES });
        }
        let stmt = Statement::new(dialect.insert(TYPE_TABLE, &["type".to_string()])).arg(table);
        execute(tx, &stmt).await?;
        self.types.push(table.to_string());
        let slot = self.types.len() - 1;
        info!(table, slot, "Registered ID range");
        Ok(slot)
    }
}
