//! The executor seam.
//!
//! Compilation never touches a database. Compiled statements are handed to
//! an external executor through these traits: a [`Connection`] opens
//! transactions, a [`Transaction`] runs statements and opens result sets,
//! and a [`ResultSet`] streams rows with column metadata.

mod response;
pub use response::{ColumnMeta, Response};

use crate::{async_trait, stmt::NamedParams, stmt::Value, Result};

use std::fmt::Debug;

#[async_trait]
pub trait Connection: Debug + Send + Sync + 'static {
    /// Starts a transaction. Every statement of a query or a batch runs
    /// inside the returned scope.
    async fn begin(&self) -> Result<Box<dyn Transaction>>;
}

#[async_trait]
pub trait Transaction: Debug + Send {
    /// Runs a statement that produces no result set.
    async fn execute(&mut self, sql: &str, params: &NamedParams) -> Result<Response>;

    /// Runs a query and returns its rows as a stream.
    async fn open(&mut self, sql: &str, params: &NamedParams) -> Result<Box<dyn ResultSet>>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait ResultSet: Debug + Send {
    /// Label and declared type of every column, in select list order.
    fn columns(&self) -> &[ColumnMeta];

    /// The next row, or `None` once the set is exhausted.
    async fn next(&mut self) -> Result<Option<Vec<Value>>>;

    async fn close(&mut self) -> Result<()>;
}
