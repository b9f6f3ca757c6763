//! Database dialect implementations.
//!
//! A dialect knows the catalog queries, type names and DDL syntax of one
//! database system. Everything above this module depends only on the
//! [`Dialect`] trait.

mod mysql;
mod postgres;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;

use crate::conn::{Row, Statement};
use crate::error::Result;
use crate::ident;
use crate::schema::{Column, ForeignKey, Table};

/// Kind of a named table constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Foreign key constraint.
    ForeignKey,
    /// Unique constraint.
    Unique,
}

impl ConstraintKind {
    /// Returns the `constraint_type` value used by `INFORMATION_SCHEMA`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ForeignKey => "FOREIGN KEY",
            Self::Unique => "UNIQUE",
        }
    }
}

/// Database-specific catalog queries and SQL generation.
pub trait Dialect: Send + Sync {
    /// Returns the dialect name, used as the key for column type overrides.
    fn name(&self) -> &'static str;

    /// Returns the identifier quote character.
    fn quote_char(&self) -> char;

    /// Returns the bind placeholder for the 1-based argument `index`.
    fn placeholder(&self, index: usize) -> String;

    /// Returns the maximum length of an identifier in bytes.
    fn max_identifier_len(&self) -> usize;

    /// Query returning the server version.
    fn version_query(&self) -> Statement;

    /// Fails with `UnsupportedVersion` if the rows of [`Dialect::version_query`]
    /// report a server below the supported minimum.
    fn check_version(&self, rows: &[Row]) -> Result<()>;

    /// Count query for a table in the current schema.
    fn table_exists_query(&self, table: &str) -> Statement;

    /// Query returning `(column_name, type, is_nullable, column_default)`.
    fn columns_query(&self, table: &str) -> Statement;

    /// Query returning `(index_name, column_name, primary, unique, seq_in_index)`.
    fn indexes_query(&self, table: &str) -> Statement;

    /// Count query for a named constraint of the given kind.
    fn constraint_exists_query(&self, kind: ConstraintKind, name: &str) -> Statement;

    /// Maps a column to its SQL type, ignoring overrides.
    fn sql_type(&self, column: &Column) -> Result<String>;

    /// Normalizes a type name so that aliases compare equal.
    fn canonical_type(&self, raw: &str) -> String;

    /// Returns the clause that makes a column an identity.
    fn identity_clause(&self) -> &'static str;

    /// Returns the clauses that change a column's type and nullability.
    fn alter_column(&self, column: &Column) -> Result<Vec<String>>;

    /// Whether uniqueness can be backed by a table constraint rather than an
    /// index. When false, removal never consults the catalog.
    fn unique_constraints(&self) -> bool {
        true
    }

    /// Drops a unique index, or the unique constraint backing it.
    fn drop_unique(&self, table: &str, name: &str, constraint: bool) -> Statement;

    /// Restarts the identity of `table.column` at `start`.
    fn restart_identity(&self, table: &str, column: &str, start: u64) -> Statement;

    /// Quotes an identifier.
    fn quote_identifier(&self, name: &str) -> String {
        ident::quote_with(self.quote_char(), name)
    }

    /// Quotes and joins a list of identifiers.
    fn quote_list(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|n| self.quote_identifier(n))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Shortens a name to the identifier limit.
    fn shorten(&self, name: &str) -> String {
        ident::shorten(name, self.max_identifier_len())
    }

    /// Returns the SQL type for a column, honoring its override for this dialect.
    fn column_type(&self, column: &Column) -> Result<String> {
        match column.schema_type.get(self.name()) {
            Some(ty) => Ok(ty.clone()),
            None => self.sql_type(column),
        }
    }

    /// Returns whether a DEFAULT clause may be rendered for the column.
    fn supports_default(&self, _column: &Column) -> bool {
        true
    }

    /// Text appended after the closing parenthesis of `CREATE TABLE`.
    fn create_table_suffix(&self) -> &'static str {
        ""
    }

    /// Generates a column definition.
    fn column_definition(&self, column: &Column) -> Result<String> {
        let mut parts = vec![self.quote_identifier(&column.name), self.column_type(column)?];

        if column.unique {
            parts.push("UNIQUE".to_string());
        }
        if column.increment {
            parts.push(self.identity_clause().to_string());
        }
        parts.push(if column.nullable { "NULL" } else { "NOT NULL" }.to_string());

        if let Some(default) = &column.default {
            if self.supports_default(column) {
                parts.push(format!("DEFAULT {}", default.to_sql()));
            }
        }

        Ok(parts.join(" "))
    }

    /// Generates `CREATE TABLE` without foreign keys.
    fn create_table(&self, table: &Table) -> Result<Statement> {
        let mut defs = table
            .columns
            .iter()
            .map(|c| self.column_definition(c))
            .collect::<Result<Vec<_>>>()?;
        if !table.primary_key.is_empty() {
            defs.push(format!("PRIMARY KEY({})", self.quote_list(&table.primary_key)));
        }
        Ok(Statement::new(format!(
            "CREATE TABLE IF NOT EXISTS {}({}){}",
            self.quote_identifier(&table.name),
            defs.join(", "),
            self.create_table_suffix()
        )))
    }

    /// Generates an `ADD COLUMN` clause.
    fn add_column(&self, column: &Column) -> Result<String> {
        Ok(format!("ADD COLUMN {}", self.column_definition(column)?))
    }

    /// Generates a `DROP COLUMN` clause.
    fn drop_column(&self, name: &str) -> String {
        format!("DROP COLUMN {}", self.quote_identifier(name))
    }

    /// Joins clauses into one `ALTER TABLE` statement.
    fn alter_table(&self, table: &str, clauses: &[String]) -> Statement {
        Statement::new(format!(
            "ALTER TABLE {} {}",
            self.quote_identifier(table),
            clauses.join(", ")
        ))
    }

    /// Generates `CREATE UNIQUE INDEX`.
    fn create_unique_index(&self, table: &str, name: &str, columns: &[String]) -> Statement {
        Statement::new(format!(
            "CREATE UNIQUE INDEX {} ON {}({})",
            self.quote_identifier(name),
            self.quote_identifier(table),
            self.quote_list(columns)
        ))
    }

    /// Generates an `ADD CONSTRAINT ... FOREIGN KEY` clause.
    ///
    /// The symbol is shortened to the identifier limit.
    fn add_foreign_key(&self, fk: &ForeignKey) -> String {
        format!(
            "ADD CONSTRAINT {} FOREIGN KEY({}) REFERENCES {}({}) ON DELETE {}",
            self.quote_identifier(&self.shorten(&fk.symbol)),
            self.quote_list(&fk.columns),
            self.quote_identifier(&fk.ref_table),
            self.quote_list(&fk.ref_columns),
            fk.on_delete.to_sql()
        )
    }

    /// Generates `INSERT` of one row with the given columns.
    fn insert(&self, table: &str, columns: &[String]) -> String {
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| self.placeholder(i)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.quote_identifier(table),
            self.quote_list(columns),
            placeholders.join(", ")
        )
    }
}
