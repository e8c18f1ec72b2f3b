#![allow(dead_code)]

use erbridge::{
    async_trait,
    driver::{ColumnMeta, Connection, Response, ResultSet, Transaction},
    schema::{ScalarType, Schema},
    stmt::{NamedParams, Value},
    Db, Error, Result,
};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

/// Everything the mock driver was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Begin,
    Execute { sql: String, params: Vec<(String, Value)> },
    Open { sql: String },
    Close,
    Commit,
    Rollback,
}

/// In-memory connection recording every operation.
///
/// Queries are answered with the canned rows; an `EXECUTE BLOCK` returns the
/// next generated key. A statement containing `fail_on` fails with a driver
/// error.
#[derive(Debug, Clone, Default)]
pub struct MockConnection {
    log: Arc<Mutex<Vec<Op>>>,
    columns: Vec<ColumnMeta>,
    rows: Vec<Vec<Value>>,
    fail_on: Option<String>,
    next_key: Arc<Mutex<i64>>,
}

impl MockConnection {
    pub fn new() -> MockConnection {
        MockConnection {
            next_key: Arc::new(Mutex::new(100)),
            ..MockConnection::default()
        }
    }

    pub fn rows(mut self, labels: &[&str], rows: Vec<Vec<Value>>) -> MockConnection {
        self.columns = labels
            .iter()
            .map(|label| ColumnMeta::new(*label, "INTEGER"))
            .collect();
        self.rows = rows;
        self
    }

    pub fn fail_on(mut self, fragment: &str) -> MockConnection {
        self.fail_on = Some(fragment.to_string());
        self
    }

    /// Shared handle on the operation log.
    pub fn log(&self) -> Arc<Mutex<Vec<Op>>> {
        self.log.clone()
    }

    fn record(&self, op: Op) {
        self.log.lock().expect("ops log lock").push(op);
    }

    fn check(&self, sql: &str) -> Result<()> {
        match &self.fail_on {
            Some(fragment) if sql.contains(fragment.as_str()) => Err(Error::driver(
                std::io::Error::other(format!("constraint violated by `{sql}`")),
            )),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        self.record(Op::Begin);
        Ok(Box::new(MockTransaction {
            connection: self.clone(),
        }))
    }
}

#[derive(Debug)]
pub struct MockTransaction {
    connection: MockConnection,
}

#[async_trait]
impl Transaction for MockTransaction {
    async fn execute(&mut self, sql: &str, params: &NamedParams) -> Result<Response> {
        self.connection.record(Op::Execute {
            sql: sql.to_string(),
            params: params
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
        });
        self.connection.check(sql)?;

        if sql.starts_with("EXECUTE BLOCK") {
            let mut next = self.connection.next_key.lock().expect("key lock");
            let key = *next;
            *next += 1;
            Ok(Response::returning(key))
        } else {
            Ok(Response::count(1))
        }
    }

    async fn open(&mut self, sql: &str, _params: &NamedParams) -> Result<Box<dyn ResultSet>> {
        self.connection.record(Op::Open {
            sql: sql.to_string(),
        });
        self.connection.check(sql)?;

        Ok(Box::new(MockRows {
            columns: self.connection.columns.clone(),
            rows: self.connection.rows.clone().into(),
            connection: self.connection.clone(),
        }))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.connection.record(Op::Commit);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.connection.record(Op::Rollback);
        Ok(())
    }
}

#[derive(Debug)]
pub struct MockRows {
    columns: Vec<ColumnMeta>,
    rows: VecDeque<Vec<Value>>,
    connection: MockConnection,
}

#[async_trait]
impl ResultSet for MockRows {
    fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    async fn next(&mut self) -> Result<Option<Vec<Value>>> {
        // Let concurrent callers interleave between rows
        tokio::task::yield_now().await;
        Ok(self.rows.pop_front())
    }

    async fn close(&mut self) -> Result<()> {
        self.connection.record(Op::Close);
        Ok(())
    }
}

pub fn schema() -> Schema {
    let mut builder = Schema::builder();

    builder
        .entity("TAG")
        .scalar("LABEL", ScalarType::String { max_len: 20 });

    builder.entity("ITEM").scalar("QTY", ScalarType::Integer);

    builder
        .entity("E")
        .scalar("X", ScalarType::Integer)
        .set("X_SET", "TAG")
        .cross("WEIGHT", ScalarType::Integer)
        .detail("LINES", "ITEM");

    builder.build().unwrap()
}

pub fn db(connection: &MockConnection) -> Db {
    let _ = env_logger::builder().is_test(true).try_init();
    Db::new(schema(), connection.clone())
}

pub fn ops(connection: &MockConnection) -> Vec<Op> {
    connection.log().lock().unwrap().clone()
}
