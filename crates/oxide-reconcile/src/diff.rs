//! Differ for reconciling an existing table with its desired definition.
//!
//! The differ compares a desired [`Table`] against introspected state and
//! produces a [`ChangeSet`]. It never queries the database itself.

use std::collections::HashSet;

use crate::dialect::Dialect;
use crate::error::{ReconcileError, Result};
use crate::introspect::LiveTable;
use crate::options::MigrateOptions;
use crate::schema::{Column, Table};

/// A unique index to create on an existing column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueIndex {
    /// Index name, already shortened.
    pub name: String,
    /// Indexed column.
    pub column: String,
}

/// Changes needed to bring one existing table in line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    /// Columns to add.
    pub add: Vec<Column>,
    /// Columns to drop.
    pub drop: Vec<String>,
    /// Columns whose type or nullability changes.
    pub modify: Vec<Column>,
    /// Unique indexes to create.
    pub add_unique: Vec<UniqueIndex>,
    /// Unique indexes (or constraints) to drop, by name.
    pub drop_unique: Vec<String>,
}

impl ChangeSet {
    /// Returns whether there is nothing to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add.is_empty()
            && self.drop.is_empty()
            && self.modify.is_empty()
            && self.add_unique.is_empty()
            && self.drop_unique.is_empty()
    }

    /// Renders the column changes as `ALTER TABLE` clauses: adds, then drops,
    /// then modifications.
    pub fn alter_clauses(&self, dialect: &dyn Dialect) -> Result<Vec<String>> {
        let mut clauses = Vec::new();
        for column in &self.add {
            clauses.push(dialect.add_column(column)?);
        }
        for name in &self.drop {
            clauses.push(dialect.drop_column(name));
        }
        for column in &self.modify {
            clauses.extend(dialect.alter_column(column)?);
        }
        Ok(clauses)
    }
}

/// Computes [`ChangeSet`]s.
pub struct Differ<'a> {
    dialect: &'a dyn Dialect,
    options: MigrateOptions,
}

impl<'a> Differ<'a> {
    /// Creates a differ for `dialect`.
    #[must_use]
    pub fn new(dialect: &'a dyn Dialect, options: MigrateOptions) -> Self {
        Self { dialect, options }
    }

    /// Compares `desired` with the live state of the same table.
    ///
    /// Fails with `PrimaryKeyChanged` when the live primary key differs from
    /// the desired one, including when only one side has a primary key.
    pub fn diff(&self, desired: &Table, live: &LiveTable) -> Result<ChangeSet> {
        if live.primary_key() != desired.primary_key.as_slice() {
            return Err(ReconcileError::PrimaryKeyChanged {
                table: desired.name.clone(),
            });
        }

        let mut changes = ChangeSet::default();

        for column in &desired.columns {
            let Some(current) = live.column(&column.name) else {
                changes.add.push(column.clone());
                continue;
            };
            // Primary key columns are never altered.
            if desired.is_primary(&column.name) {
                continue;
            }
            if self.type_changed(column, &current.raw_type)? || column.nullable != current.nullable
            {
                changes.modify.push(column.clone());
            }
        }

        if self.options.drop_column {
            let desired_names: HashSet<&str> =
                desired.columns.iter().map(|c| c.name.as_str()).collect();
            changes.drop = live
                .columns
                .iter()
                .filter(|c| !desired_names.contains(c.name.as_str()))
                .map(|c| c.name.clone())
                .collect();
        }

        for column in &desired.columns {
            let exists = live.column(&column.name).is_some();
            let indexed = live.unique_index(&column.name);
            match (column.unique, indexed) {
                // New unique columns carry UNIQUE in their definition.
                (true, None) if exists && !desired.is_primary(&column.name) => {
                    changes.add_unique.push(UniqueIndex {
                        name: self
                            .dialect
                            .shorten(&format!("{}_{}", desired.name, column.name)),
                        column: column.name.clone(),
                    });
                }
                (false, Some(index)) if self.options.drop_index => {
                    changes.drop_unique.push(index.name.clone());
                }
                _ => {}
            }
        }

        Ok(changes)
    }

    fn type_changed(&self, column: &Column, raw_type: &str) -> Result<bool> {
        let desired = self.dialect.column_type(column)?;
        Ok(self.dialect.canonical_type(&desired) != self.dialect.canonical_type(raw_type))
    }
}
