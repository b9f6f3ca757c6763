//! Connection collaborator.
//!
//! The engine never talks to a driver directly. It opens one [`Transaction`]
//! through a [`Driver`] and issues every catalog query and DDL statement on
//! it. Rows come back as positional [`Value`]s so dialects can share the
//! decoding code.

use std::fmt;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{ReconcileError, Result};

/// A single SQL value, used both for bind arguments and result cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Any integer.
    Int(i64),
    /// Boolean.
    Bool(bool),
    /// Character data, and anything the driver could only decode as text.
    Text(String),
}

impl Value {
    /// Returns the text content, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Interprets the value as an integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Null => None,
        }
    }

    /// Interprets the value as a boolean.
    ///
    /// Catalogs report booleans as `t`/`f`, `YES`/`NO` or `0`/`1` depending
    /// on the database and column.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(i) => Some(*i != 0),
            Self::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "t" | "true" | "y" | "yes" | "1" => Some(true),
                "f" | "false" | "n" | "no" | "0" => Some(false),
                _ => None,
            },
            Self::Null => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A result row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row(Vec<Value>);

impl Row {
    /// Creates a row from its cells.
    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Returns the number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the row has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the cell at `idx`.
    pub fn get(&self, idx: usize) -> Result<&Value> {
        self.0.get(idx).ok_or_else(|| {
            ReconcileError::Catalog(format!(
                "expected at least {} columns, got {}",
                idx + 1,
                self.0.len()
            ))
        })
    }

    /// Returns the cell at `idx` as text, or `None` for NULL.
    pub fn opt_text(&self, idx: usize) -> Result<Option<String>> {
        match self.get(idx)? {
            Value::Null => Ok(None),
            Value::Text(s) => Ok(Some(s.clone())),
            Value::Int(i) => Ok(Some(i.to_string())),
            Value::Bool(b) => Ok(Some(b.to_string())),
        }
    }

    /// Returns the cell at `idx` as non-null text.
    pub fn text(&self, idx: usize) -> Result<String> {
        self.opt_text(idx)?
            .ok_or_else(|| ReconcileError::Catalog(format!("column {idx} is NULL")))
    }

    /// Returns the cell at `idx` as an integer.
    pub fn int(&self, idx: usize) -> Result<i64> {
        let value = self.get(idx)?;
        value.as_i64().ok_or_else(|| {
            ReconcileError::Catalog(format!("column {idx} is not an integer: {value:?}"))
        })
    }

    /// Returns the cell at `idx` as a boolean.
    pub fn bool(&self, idx: usize) -> Result<bool> {
        let value = self.get(idx)?;
        value.as_bool().ok_or_else(|| {
            ReconcileError::Catalog(format!("column {idx} is not a boolean: {value:?}"))
        })
    }
}

/// A SQL statement with positional bind arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// SQL text, with dialect placeholders for `args`.
    pub sql: String,
    /// Bind arguments.
    pub args: Vec<Value>,
}

impl Statement {
    /// Creates a statement without arguments.
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }

    /// Appends a bind argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Opens transactions.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Transaction handle produced by [`Driver::begin`].
    type Tx: Transaction;

    /// Begins a transaction.
    async fn begin(&self) -> Result<Self::Tx>;
}

/// A transaction scope.
///
/// Dropping a transaction that was neither committed nor rolled back must
/// roll it back.
#[async_trait]
pub trait Transaction: Send {
    /// Executes a statement that returns no rows.
    async fn exec(&mut self, stmt: &Statement) -> Result<()>;

    /// Runs a query and returns all rows.
    async fn query(&mut self, stmt: &Statement) -> Result<Vec<Row>>;

    /// Commits the transaction.
    async fn commit(self) -> Result<()>;

    /// Rolls the transaction back.
    async fn rollback(self) -> Result<()>;
}

/// Executes `stmt` on `tx`, logging the statement.
pub(crate) async fn execute<T: Transaction>(tx: &mut T, stmt: &Statement) -> Result<()> {
    debug!(sql = %stmt, "Executing SQL");
    tx.exec(stmt).await
}

/// A transaction that forwards queries but only records executed statements.
///
/// Used to compute the statements a migration would run without applying
/// them. It never commits.
pub struct DryRun<T> {
    inner: T,
    statements: Vec<Statement>,
}

impl<T: Transaction> DryRun<T> {
    /// Wraps a transaction.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            statements: Vec::new(),
        }
    }

    /// Returns the statements recorded so far.
    #[must_use]
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Rolls back the wrapped transaction and returns the recorded statements.
    pub async fn finish(self) -> Result<Vec<Statement>> {
        self.inner.rollback().await?;
        Ok(self.statements)
    }
}

#[async_trait]
impl<T: Transaction> Transaction for DryRun<T> {
    async fn exec(&mut self, stmt: &Statement) -> Result<()> {
        self.statements.push(stmt.clone());
        Ok(())
    }

    async fn query(&mut self, stmt: &Statement) -> Result<Vec<Row>> {
        self.inner.query(stmt).await
    }

    async fn commit(self) -> Result<()> {
        self.inner.rollback().await
    }

    async fn rollback(self) -> Result<()> {
        self.inner.rollback().await
    }
}
