#![allow(dead_code)]

//! Scripted driver: every test lists the statements it expects, in order,
//! with canned results.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use oxide_reconcile::prelude::*;

#[derive(Debug)]
enum Expectation {
    Begin { fail: bool },
    Query { sql: String, args: Vec<Value>, rows: Vec<Row> },
    Exec { sql: String, args: Vec<Value>, fail: bool },
    Commit,
    Rollback,
}

#[derive(Debug, Default)]
struct Script {
    expected: VecDeque<Expectation>,
    failures: Vec<String>,
    executed: Vec<String>,
}

impl Script {
    fn fail(&mut self, msg: String) -> ReconcileError {
        self.failures.push(msg.clone());
        ReconcileError::Connection(sqlx::Error::Protocol(msg))
    }
}

fn injected() -> ReconcileError {
    ReconcileError::Connection(sqlx::Error::Protocol("injected failure".into()))
}

/// Driver replaying a script of expectations.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    script: Arc<Mutex<Script>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, expectation: Expectation) -> &Self {
        self.script.lock().unwrap().expected.push_back(expectation);
        self
    }

    pub fn expect_begin(&self) -> &Self {
        self.push(Expectation::Begin { fail: false })
    }

    pub fn expect_begin_error(&self) -> &Self {
        self.push(Expectation::Begin { fail: true })
    }

    pub fn expect_query(&self, sql: &str, args: Vec<Value>, rows: Vec<Row>) -> &Self {
        self.push(Expectation::Query {
            sql: sql.to_string(),
            args,
            rows,
        })
    }

    pub fn expect_exec(&self, sql: &str, args: Vec<Value>) -> &Self {
        self.push(Expectation::Exec {
            sql: sql.to_string(),
            args,
            fail: false,
        })
    }

    pub fn expect_exec_error(&self, sql: &str) -> &Self {
        self.push(Expectation::Exec {
            sql: sql.to_string(),
            args: Vec::new(),
            fail: true,
        })
    }

    pub fn expect_commit(&self) -> &Self {
        self.push(Expectation::Commit)
    }

    pub fn expect_rollback(&self) -> &Self {
        self.push(Expectation::Rollback)
    }

    /// Statements passed to `exec`, in order.
    pub fn executed(&self) -> Vec<String> {
        self.script.lock().unwrap().executed.clone()
    }

    /// Panics if an expectation was violated or left unmet.
    pub fn assert_done(&self) {
        let script = self.script.lock().unwrap();
        assert!(
            script.failures.is_empty(),
            "unexpected calls:\n{}",
            script.failures.join("\n")
        );
        assert!(
            script.expected.is_empty(),
            "unmet expectations: {:#?}",
            script.expected
        );
    }
}

/// Transaction handed out by [`MockDriver`].
pub struct MockTransaction {
    script: Arc<Mutex<Script>>,
}

#[async_trait]
impl Driver for MockDriver {
    type Tx = MockTransaction;

    async fn begin(&self) -> Result<MockTransaction> {
        let mut script = self.script.lock().unwrap();
        match script.expected.pop_front() {
            Some(Expectation::Begin { fail: false }) => Ok(MockTransaction {
                script: Arc::clone(&self.script),
            }),
            Some(Expectation::Begin { fail: true }) => Err(injected()),
            other => Err(script.fail(format!("begin, expected {other:?}"))),
        }
    }
}

#[async_trait]
impl Transaction for MockTransaction {
    async fn exec(&mut self, stmt: &Statement) -> Result<()> {
        let mut script = self.script.lock().unwrap();
        script.executed.push(stmt.sql.clone());
        match script.expected.pop_front() {
            Some(Expectation::Exec { sql, args, fail })
                if sql == stmt.sql && (fail || args == stmt.args) =>
            {
                if fail {
                    Err(injected())
                } else {
                    Ok(())
                }
            }
            other => Err(script.fail(format!("exec {stmt:?}, expected {other:?}"))),
        }
    }

    async fn query(&mut self, stmt: &Statement) -> Result<Vec<Row>> {
        let mut script = self.script.lock().unwrap();
        match script.expected.pop_front() {
            Some(Expectation::Query { sql, args, rows })
                if sql == stmt.sql && args == stmt.args =>
            {
                Ok(rows)
            }
            other => Err(script.fail(format!("query {stmt:?}, expected {other:?}"))),
        }
    }

    async fn commit(self) -> Result<()> {
        let mut script = self.script.lock().unwrap();
        match script.expected.pop_front() {
            Some(Expectation::Commit) => Ok(()),
            other => Err(script.fail(format!("commit, expected {other:?}"))),
        }
    }

    async fn rollback(self) -> Result<()> {
        let mut script = self.script.lock().unwrap();
        match script.expected.pop_front() {
            Some(Expectation::Rollback) => Ok(()),
            other => Err(script.fail(format!("rollback, expected {other:?}"))),
        }
    }
}

/// Builds a result row.
pub fn row(values: &[Value]) -> Row {
    Row::new(values.to_vec())
}

/// Builds a text value.
pub fn text(s: &str) -> Value {
    Value::from(s)
}

/// Builds a single-cell count result.
pub fn count(n: i64) -> Vec<Row> {
    vec![row(&[Value::Int(n)])]
}
