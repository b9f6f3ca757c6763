//! Live schema introspection.
//!
//! Every query runs on the caller's transaction and returns freshly read
//! catalog state. Nothing is cached between calls.

use tracing::debug;

use crate::conn::{Row, Statement, Transaction};
use crate::dialect::{ConstraintKind, Dialect};
use crate::error::{ReconcileError, Result};

/// A column as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveColumn {
    /// Column name.
    pub name: String,
    /// Type name as the catalog prints it.
    pub raw_type: String,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Whether the column has a default expression.
    ///
    /// Informational only: default values are not compared, so a changed
    /// default never causes a modification.
    pub has_default: bool,
}

impl LiveColumn {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            name: row.text(0)?,
            raw_type: row.text(1)?,
            nullable: row.bool(2)?,
            has_default: row
                .opt_text(3)?
                .is_some_and(|d| !d.eq_ignore_ascii_case("null")),
        })
    }
}

/// An index as reported by the catalog, with its columns in key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveIndex {
    /// Index name.
    pub name: String,
    /// Indexed columns.
    pub columns: Vec<String>,
    /// Whether this is the primary key index.
    pub primary: bool,
    /// Whether the index enforces uniqueness.
    pub unique: bool,
}

/// Introspected state of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveTable {
    /// Columns physically present.
    pub columns: Vec<LiveColumn>,
    /// Indexes, including the primary key.
    pub indexes: Vec<LiveIndex>,
}

impl LiveTable {
    /// Gets a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&LiveColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns the primary key columns, empty if the table has none.
    #[must_use]
    pub fn primary_key(&self) -> &[String] {
        self.indexes
            .iter()
            .find(|i| i.primary)
            .map(|i| i.columns.as_slice())
            .unwrap_or_default()
    }

    /// Returns the non-primary unique index covering exactly `column`.
    #[must_use]
    pub fn unique_index(&self, column: &str) -> Option<&LiveIndex> {
        self.indexes
            .iter()
            .find(|i| i.unique && !i.primary && i.columns.len() == 1 && i.columns[0] == column)
    }
}

/// Groups index rows by index name, ordering columns by their position.
fn group_indexes(rows: &[Row]) -> Result<Vec<LiveIndex>> {
    let mut grouped: Vec<(LiveIndex, Vec<(i64, String)>)> = Vec::new();
    for row in rows {
        let name = row.text(0)?;
        let column = row.text(1)?;
        let position = row.int(4)?;
        let entry = match grouped.iter().position(|(idx, _)| idx.name == name) {
            Some(i) => &mut grouped[i],
            None => {
                grouped.push((
                    LiveIndex {
                        name,
                        columns: Vec::new(),
                        primary: row.bool(2)?,
                        unique: row.bool(3)?,
                    },
                    Vec::new(),
                ));
                let last = grouped.len() - 1;
                &mut grouped[last]
            }
        };
        entry.1.push((position, column));
    }

    Ok(grouped
        .into_iter()
        .map(|(mut index, mut columns)| {
            columns.sort_by_key(|(position, _)| *position);
            index.columns = columns.into_iter().map(|(_, c)| c).collect();
            index
        })
        .collect())
}

/// Reads live schema state through a dialect's catalog queries.
pub struct Introspector<'a> {
    dialect: &'a dyn Dialect,
}

impl<'a> Introspector<'a> {
    /// Creates an introspector for `dialect`.
    #[must_use]
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self { dialect }
    }

    async fn query<T: Transaction>(&self, tx: &mut T, stmt: &Statement) -> Result<Vec<Row>> {
        debug!(sql = %stmt, "Querying catalog");
        tx.query(stmt).await
    }

    async fn count<T: Transaction>(&self, tx: &mut T, stmt: &Statement) -> Result<i64> {
        let rows = self.query(tx, stmt).await?;
        rows.first()
            .ok_or_else(|| ReconcileError::Catalog(format!("count query returned no rows: {stmt}")))?
            .int(0)
    }

    /// Checks the server version against the dialect minimum.
    pub async fn check_version<T: Transaction>(&self, tx: &mut T) -> Result<()> {
        let rows = self.query(tx, &self.dialect.version_query()).await?;
        self.dialect.check_version(&rows)
    }

    /// Returns whether `table` exists in the current schema.
    pub async fn table_exists<T: Transaction>(&self, tx: &mut T, table: &str) -> Result<bool> {
        Ok(self.count(tx, &self.dialect.table_exists_query(table)).await? > 0)
    }

    /// Lists the columns of `table`.
    pub async fn table_columns<T: Transaction>(
        &self,
        tx: &mut T,
        table: &str,
    ) -> Result<Vec<LiveColumn>> {
        let rows = self.query(tx, &self.dialect.columns_query(table)).await?;
        rows.iter().map(LiveColumn::from_row).collect()
    }

    /// Lists the indexes of `table`.
    pub async fn table_indexes<T: Transaction>(
        &self,
        tx: &mut T,
        table: &str,
    ) -> Result<Vec<LiveIndex>> {
        let rows = self.query(tx, &self.dialect.indexes_query(table)).await?;
        group_indexes(&rows)
    }

    /// Reads columns and indexes of `table`.
    pub async fn table<T: Transaction>(&self, tx: &mut T, table: &str) -> Result<LiveTable> {
        let columns = self.table_columns(tx, table).await?;
        let indexes = self.table_indexes(tx, table).await?;
        Ok(LiveTable { columns, indexes })
    }

    /// Returns whether a constraint named `name` of `kind` exists.
    pub async fn constraint_exists<T: Transaction>(
        &self,
        tx: &mut T,
        kind: ConstraintKind,
        name: &str,
    ) -> Result<bool> {
        let stmt = self.dialect.constraint_exists_query(kind, name);
        Ok(self.count(tx, &stmt).await? > 0)
    }
}
