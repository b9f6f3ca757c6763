//! `sqlx` implementations of [`Driver`] and [`Transaction`].
//!
//! Statement logging in `sqlx` is disabled; the engine logs every statement
//! through `tracing` itself.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlPoolOptions, MySqlRow};
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column as _, ConnectOptions, MySql, Pool, Postgres, Row as _, TypeInfo, ValueRef};

use crate::conn::{Driver, Row, Statement, Transaction, Value};
use crate::error::{ReconcileError, Result};

/// Pool size. A migration uses a single connection.
const MAX_CONNECTIONS: u32 = 1;

/// PostgreSQL driver backed by a `sqlx` pool.
#[derive(Debug, Clone)]
pub struct PgDriver {
    pool: Pool<Postgres>,
}

impl PgDriver {
    /// Wraps an existing pool.
    #[must_use]
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Connects to `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = PgConnectOptions::from_str(url)?.disable_statement_logging();
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;
        Ok(Self::new(pool))
    }
}

/// An open PostgreSQL transaction.
pub struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl Driver for PgDriver {
    type Tx = PgTransaction;

    async fn begin(&self) -> Result<PgTransaction> {
        Ok(PgTransaction {
            tx: self.pool.begin().await?,
        })
    }
}

fn bind_pg<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    args: &[Value],
) -> Query<'q, Postgres, PgArguments> {
    for arg in args {
        query = match arg {
            Value::Null => query.bind(None::<String>),
            Value::Int(i) => query.bind(*i),
            Value::Bool(b) => query.bind(*b),
            Value::Text(s) => query.bind(s.clone()),
        };
    }
    query
}

fn decode_pg(row: &PgRow) -> Result<Row> {
    let mut values = Vec::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        if row.try_get_raw(idx)?.is_null() {
            values.push(Value::Null);
            continue;
        }
        let value = match column.type_info().name() {
            "INT8" => Value::Int(row.try_get::<i64, _>(idx)?),
            "INT4" => Value::Int(i64::from(row.try_get::<i32, _>(idx)?)),
            "INT2" => Value::Int(i64::from(row.try_get::<i16, _>(idx)?)),
            "BOOL" => Value::Bool(row.try_get::<bool, _>(idx)?),
            // Catalog columns use domains such as `name` and `sql_identifier`.
            _ => Value::Text(row.try_get_unchecked::<String, _>(idx)?),
        };
        values.push(value);
    }
    Ok(Row::new(values))
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn exec(&mut self, stmt: &Statement) -> Result<()> {
        bind_pg(sqlx::query(&stmt.sql), &stmt.args)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn query(&mut self, stmt: &Statement) -> Result<Vec<Row>> {
        let rows = bind_pg(sqlx::query(&stmt.sql), &stmt.args)
            .fetch_all(&mut *self.tx)
            .await?;
        rows.iter().map(decode_pg).collect()
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// MySQL driver backed by a `sqlx` pool.
///
/// MySQL commits DDL implicitly, so a failed migration may leave earlier
/// statements applied.
#[derive(Debug, Clone)]
pub struct MySqlDriver {
    pool: Pool<MySql>,
}

impl MySqlDriver {
    /// Wraps an existing pool.
    #[must_use]
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// Connects to `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = MySqlConnectOptions::from_str(url)?.disable_statement_logging();
        let pool = MySqlPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;
        Ok(Self::new(pool))
    }
}

/// An open MySQL transaction.
pub struct MySqlTransaction {
    tx: sqlx::Transaction<'static, MySql>,
}

#[async_trait]
impl Driver for MySqlDriver {
    type Tx = MySqlTransaction;

    async fn begin(&self) -> Result<MySqlTransaction> {
        Ok(MySqlTransaction {
            tx: self.pool.begin().await?,
        })
    }
}

fn bind_mysql<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    args: &[Value],
) -> Query<'q, MySql, MySqlArguments> {
    for arg in args {
        query = match arg {
            Value::Null => query.bind(None::<String>),
            Value::Int(i) => query.bind(*i),
            Value::Bool(b) => query.bind(*b),
            Value::Text(s) => query.bind(s.clone()),
        };
    }
    query
}

fn decode_mysql(row: &MySqlRow) -> Result<Row> {
    let mut values = Vec::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        if row.try_get_raw(idx)?.is_null() {
            values.push(Value::Null);
            continue;
        }
        let ty = column.type_info().name();
        let value = if ty.ends_with("UNSIGNED") {
            let v = row.try_get::<u64, _>(idx)?;
            Value::Int(i64::try_from(v).map_err(|_| {
                ReconcileError::Catalog(format!("column {idx} out of range: {v}"))
            })?)
        } else if ty == "BOOLEAN" {
            Value::Bool(row.try_get::<bool, _>(idx)?)
        } else if matches!(ty, "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT") {
            Value::Int(row.try_get::<i64, _>(idx)?)
        } else {
            // INFORMATION_SCHEMA reports some text columns as binary.
            Value::Text(row.try_get_unchecked::<String, _>(idx)?)
        };
        values.push(value);
    }
    Ok(Row::new(values))
}

#[async_trait]
impl Transaction for MySqlTransaction {
    async fn exec(&mut self, stmt: &Statement) -> Result<()> {
        bind_mysql(sqlx::query(&stmt.sql), &stmt.args)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn query(&mut self, stmt: &Statement) -> Result<Vec<Row>> {
        let rows = bind_mysql(sqlx::query(&stmt.sql), &stmt.args)
            .fetch_all(&mut *self.tx)
            .await?;
        rows.iter().map(decode_mysql).collect()
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
