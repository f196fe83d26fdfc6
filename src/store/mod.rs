//! Relational store capability.
//!
//! The load pipeline only needs to run statements and read rows back, so it works against the
//! [`RelationalStore`] trait. [`SqliteStore`] is the bundled implementation.

mod sqlite;

use crate::error::StoreResult;
use crate::types::{QueryResult, Value};

pub use sqlite::SqliteStore;

/// A connection-like handle to a relational database.
///
/// Statements use numbered `$1, $2, ...` placeholders bound positionally from `params`.
pub trait RelationalStore {
    /// Run a statement, returning the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[Value]) -> StoreResult<usize>;

    /// Run a query and collect every row.
    fn query(&mut self, sql: &str) -> StoreResult<QueryResult>;

    /// Release the underlying connection.
    fn close(self) -> StoreResult<()>
    where
        Self: Sized;
}

impl<S: RelationalStore + ?Sized> RelationalStore for &mut S {
    fn execute(&mut self, sql: &str, params: &[Value]) -> StoreResult<usize> {
        (**self).execute(sql, params)
    }

    fn query(&mut self, sql: &str) -> StoreResult<QueryResult> {
        (**self).query(sql)
    }

    /// Borrowed handles are released by their owner.
    fn close(self) -> StoreResult<()> {
        Ok(())
    }
}
