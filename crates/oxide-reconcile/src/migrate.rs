//! Migration orchestrator.
//!
//! [`Migrate::create`] runs the whole reconciliation inside one transaction:
//! version gate, type registry, one create-or-alter step per table in caller
//! order, then a second pass adding missing foreign keys. Any failure rolls
//! everything back.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::allocator::TypeRegistry;
use crate::conn::{execute, DryRun, Driver, Statement, Transaction};
use crate::dialect::{ConstraintKind, Dialect};
use crate::diff::Differ;
use crate::error::{ReconcileError, Result};
use crate::introspect::Introspector;
use crate::options::MigrateOptions;
use crate::schema::Table;

/// Reconciles live schemas with desired tables.
pub struct Migrate<D: Driver> {
    driver: D,
    dialect: Box<dyn Dialect>,
    options: MigrateOptions,
}

impl<D: Driver> Migrate<D> {
    /// Creates a migrator with default options.
    pub fn new(driver: D, dialect: impl Dialect + 'static) -> Self {
        Self {
            driver,
            dialect: Box::new(dialect),
            options: MigrateOptions::default(),
        }
    }

    /// Sets the options.
    #[must_use]
    pub fn with_options(mut self, options: MigrateOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the options.
    #[must_use]
    pub fn options(&self) -> &MigrateOptions {
        &self.options
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Creates and alters `tables` so the database matches them.
    ///
    /// Either every statement is committed or none is.
    pub async fn create(&self, tables: &[Table]) -> Result<()> {
        validate(tables)?;

        let mut tx = self.driver.begin().await?;
        match self.run(&mut tx, tables).await {
            Ok(()) => {
                tx.commit().await?;
                info!(tables = tables.len(), "Schema migration committed");
                Ok(())
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "Rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Returns the statements [`Migrate::create`] would execute, without
    /// applying them.
    pub async fn plan(&self, tables: &[Table]) -> Result<Vec<Statement>> {
        validate(tables)?;

        let mut tx = DryRun::new(self.driver.begin().await?);
        match self.run(&mut tx, tables).await {
            Ok(()) => tx.finish().await,
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "Rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn run<T: Transaction>(&self, tx: &mut T, tables: &[Table]) -> Result<()> {
        let dialect = self.dialect.as_ref();
        let introspector = Introspector::new(dialect);
        introspector.check_version(tx).await?;

        let mut registry = if self.options.global_unique_id {
            Some(TypeRegistry::load(dialect, &introspector, tx).await?)
        } else {
            None
        };

        for table in tables {
            if introspector.table_exists(tx, &table.name).await? {
                self.alter_table(tx, &introspector, table).await?;
                continue;
            }

            execute(tx, &dialect.create_table(table)?).await?;
            info!(table = %table.name, "Created table");

            if let (Some(registry), Some(identity)) = (registry.as_mut(), table.identity_column()) {
                let start = registry
                    .allocate(dialect, tx, &table.name, &identity.name)
                    .await?;
                debug!(table = %table.name, start, "Assigned ID range");
            }
        }

        for table in tables {
            self.add_foreign_keys(tx, &introspector, table).await?;
        }
        Ok(())
    }

    async fn alter_table<T: Transaction>(
        &self,
        tx: &mut T,
        introspector: &Introspector<'_>,
        table: &Table,
    ) -> Result<()> {
        let dialect = self.dialect.as_ref();
        let live = introspector.table(tx, &table.name).await?;
        let changes = Differ::new(dialect, self.options).diff(table, &live)?;
        if changes.is_empty() {
            debug!(table = %table.name, "Table is up to date");
            return Ok(());
        }

        for index in &changes.drop_unique {
            let constraint = dialect.unique_constraints()
                && introspector
                    .constraint_exists(tx, ConstraintKind::Unique, index)
                    .await?;
            execute(tx, &dialect.drop_unique(&table.name, index, constraint)).await?;
        }

        let clauses = changes.alter_clauses(dialect)?;
        if !clauses.is_empty() {
            execute(tx, &dialect.alter_table(&table.name, &clauses)).await?;
        }

        for index in &changes.add_unique {
            let stmt =
                dialect.create_unique_index(&table.name, &index.name, &[index.column.clone()]);
            execute(tx, &stmt).await?;
        }

        info!(
            table = %table.name,
            added = changes.add.len(),
            dropped = changes.drop.len(),
            modified = changes.modify.len(),
            unique_added = changes.add_unique.len(),
            unique_dropped = changes.drop_unique.len(),
            "Altered table"
        );
        Ok(())
    }

    async fn add_foreign_keys<T: Transaction>(
        &self,
        tx: &mut T,
        introspector: &Introspector<'_>,
        table: &Table,
    ) -> Result<()> {
        let dialect = self.dialect.as_ref();
        let mut clauses = Vec::new();
        for fk in &table.foreign_keys {
            let symbol = dialect.shorten(&fk.symbol);
            if introspector
                .constraint_exists(tx, ConstraintKind::ForeignKey, &symbol)
                .await?
            {
                continue;
            }
            clauses.push(dialect.add_foreign_key(fk));
        }
        if clauses.is_empty() {
            return Ok(());
        }

        execute(tx, &dialect.alter_table(&table.name, &clauses)).await?;
        info!(table = %table.name, count = clauses.len(), "Added foreign keys");
        Ok(())
    }
}

/// Checks every table, then foreign keys that reference tables in the same
/// call.
fn validate(tables: &[Table]) -> Result<()> {
    let mut by_name = HashMap::new();
    for table in tables {
        table.validate()?;
        if by_name.insert(table.name.as_str(), table).is_some() {
            return Err(ReconcileError::InvalidSchema(format!(
                "table '{}' is declared twice",
                table.name
            )));
        }
    }

    for table in tables {
        for fk in &table.foreign_keys {
            let Some(target) = by_name.get(fk.ref_table.as_str()) else {
                continue;
            };
            if let Some(missing) = fk
                .ref_columns
                .iter()
                .find(|c| target.get_column(c).is_none())
            {
                return Err(ReconcileError::InvalidSchema(format!(
                    "foreign key '{}' references unknown column '{}.{}'",
                    fk.symbol, fk.ref_table, missing
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, ColumnType, ForeignKey};

    fn users() -> Table {
        Table::new("users").primary(Column::new("id", ColumnType::Int).increment())
    }

    #[test]
    fn test_validate_accepts_self_reference() {
        let table = users()
            .column(Column::new("spouse_id", ColumnType::Int).nullable())
            .foreign_key(ForeignKey::new("user_spouse", ["spouse_id"], "users", ["id"]));
        assert!(validate(&[table]).is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_reference_column() {
        let pets = Table::new("pets")
            .primary(Column::new("id", ColumnType::Int).increment())
            .column(Column::new("owner_id", ColumnType::Int).nullable())
            .foreign_key(ForeignKey::new("pets_owner", ["owner_id"], "users", ["uid"]));
        assert!(matches!(
            validate(&[users(), pets]),
            Err(ReconcileError::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_tables() {
        assert!(validate(&[users(), users()]).is_err());
    }

    #[test]
    fn test_validate_allows_external_reference() {
        let pets = Table::new("pets")
            .primary(Column::new("id", ColumnType::Int).increment())
            .column(Column::new("owner_id", ColumnType::Int))
            .foreign_key(ForeignKey::new("pets_owner", ["owner_id"], "owners", ["id"]));
        assert!(validate(&[pets]).is_ok());
    }
}
