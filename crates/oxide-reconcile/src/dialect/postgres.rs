//! PostgreSQL dialect.
//!
//! Catalog queries go through `INFORMATION_SCHEMA` scoped to
//! `CURRENT_SCHEMA()`, except the index listing which needs `pg_index` to
//! tell primary and unique indexes apart.

use crate::conn::{Row, Statement};
use crate::error::{ReconcileError, Result};
use crate::schema::{Column, ColumnType};

use super::{ConstraintKind, Dialect};

/// Oldest supported `server_version_num`.
const MIN_VERSION: i64 = 100_000;

/// Strings above this many bytes are stored as `text`.
const MAX_VARCHAR_SIZE: u64 = 10 << 20;

const INDEXES_QUERY: &str = "SELECT i.relname AS index_name, a.attname AS column_name, \
idx.indisprimary AS primary, idx.indisunique AS unique, \
array_position(idx.indkey, a.attnum) AS seq_in_index \
FROM pg_class t, pg_class i, pg_index idx, pg_attribute a, pg_namespace n \
WHERE t.oid = idx.indrelid AND i.oid = idx.indexrelid AND n.oid = t.relnamespace \
AND a.attrelid = t.oid AND a.attnum = ANY(idx.indkey) AND t.relkind = 'r' \
AND n.nspname = CURRENT_SCHEMA() AND t.relname = $1 \
ORDER BY index_name, seq_in_index";

/// PostgreSQL dialect.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_char(&self) -> char {
        '"'
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    fn max_identifier_len(&self) -> usize {
        63
    }

    fn version_query(&self) -> Statement {
        Statement::new("SHOW server_version_num")
    }

    fn check_version(&self, rows: &[Row]) -> Result<()> {
        let row = rows
            .first()
            .ok_or_else(|| ReconcileError::Catalog("server_version_num returned no rows".into()))?;
        let version = row.int(0)?;
        if version < MIN_VERSION {
            return Err(ReconcileError::UnsupportedVersion {
                dialect: self.name(),
                version: version.to_string(),
                minimum: MIN_VERSION.to_string(),
            });
        }
        Ok(())
    }

    fn table_exists_query(&self, table: &str) -> Statement {
        Statement::new(
            "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES \
             WHERE \"table_schema\" = CURRENT_SCHEMA() AND \"table_name\" = $1",
        )
        .arg(table)
    }

    fn columns_query(&self, table: &str) -> Statement {
        Statement::new(
            "SELECT \"column_name\", \"data_type\", \"is_nullable\", \"column_default\" \
             FROM INFORMATION_SCHEMA.COLUMNS \
             WHERE \"table_schema\" = CURRENT_SCHEMA() AND \"table_name\" = $1",
        )
        .arg(table)
    }

    fn indexes_query(&self, table: &str) -> Statement {
        Statement::new(INDEXES_QUERY).arg(table)
    }

    fn constraint_exists_query(&self, kind: ConstraintKind, name: &str) -> Statement {
        Statement::new(
            "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS \
             WHERE \"table_schema\" = CURRENT_SCHEMA() \
             AND \"constraint_type\" = $1 AND \"constraint_name\" = $2",
        )
        .arg(kind.as_str())
        .arg(name)
    }

    fn sql_type(&self, column: &Column) -> Result<String> {
        let ty = match column.ty {
            ColumnType::Bool => "boolean",
            ColumnType::Int8 | ColumnType::Int16 | ColumnType::Uint8 => "smallint",
            ColumnType::Int32 | ColumnType::Uint16 => "integer",
            ColumnType::Int
            | ColumnType::Int64
            | ColumnType::Uint
            | ColumnType::Uint32
            | ColumnType::Uint64 => "bigint",
            ColumnType::Float32 => "real",
            ColumnType::Float64 => "double precision",
            ColumnType::String => match column.size {
                Some(size) if size > MAX_VARCHAR_SIZE => "text",
                _ => "varchar",
            },
            ColumnType::Enum => "varchar",
            ColumnType::Bytes => "bytea",
            ColumnType::Json => "jsonb",
            ColumnType::Uuid => "uuid",
            ColumnType::Time => "timestamp with time zone",
        };
        Ok(ty.to_string())
    }

    fn canonical_type(&self, raw: &str) -> String {
        // Drop type parameters such as `(255)` or `(5,2)`.
        let mut stripped = String::with_capacity(raw.len());
        let mut depth = 0_usize;
        for c in raw.chars() {
            match c {
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                _ if depth == 0 => stripped.push(c.to_ascii_lowercase()),
                _ => {}
            }
        }
        let normalized = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

        match normalized.as_str() {
            "character varying" | "varchar" | "character" | "char" | "bpchar" => "varchar",
            "int8" | "bigint" | "bigserial" | "serial8" => "bigint",
            "int" | "int4" | "integer" | "serial" | "serial4" => "integer",
            "int2" | "smallint" | "smallserial" | "serial2" => "smallint",
            "float8" | "double precision" => "double precision",
            "float4" | "real" => "real",
            "decimal" | "numeric" => "numeric",
            "bool" | "boolean" => "boolean",
            "timestamptz" | "timestamp with time zone" => "timestamp with time zone",
            "timestamp" | "timestamp without time zone" => "timestamp",
            other => return other.to_string(),
        }
        .to_string()
    }

    fn identity_clause(&self) -> &'static str {
        "GENERATED BY DEFAULT AS IDENTITY"
    }

    fn alter_column(&self, column: &Column) -> Result<Vec<String>> {
        let name = self.quote_identifier(&column.name);
        let null = if column.nullable { "DROP" } else { "SET" };
        Ok(vec![
            format!("ALTER COLUMN {} TYPE {}", name, self.column_type(column)?),
            format!("ALTER COLUMN {name} {null} NOT NULL"),
        ])
    }

    fn drop_unique(&self, table: &str, name: &str, constraint: bool) -> Statement {
        if constraint {
            Statement::new(format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                self.quote_identifier(table),
                self.quote_identifier(name)
            ))
        } else {
            Statement::new(format!("DROP INDEX {}", self.quote_identifier(name)))
        }
    }

    fn restart_identity(&self, table: &str, column: &str, start: u64) -> Statement {
        // Identity sequences cannot restart below 1.
        Statement::new(format!(
            "ALTER TABLE {} ALTER COLUMN {} RESTART WITH {}",
            self.quote_identifier(table),
            self.quote_identifier(column),
            start.max(1)
        ))
    }
}
