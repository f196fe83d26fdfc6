use std::path::Path;
use std::time::Duration;

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::types::{QueryResult, Value};

use super::RelationalStore;

/// Default busy timeout applied to every connection.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// [`RelationalStore`] backed by a single SQLite connection.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened sqlite database");
        Self::configured(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::configured(Connection::open_in_memory()?)
    }

    fn configured(conn: Connection) -> StoreResult<Self> {
        conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
        Ok(Self { conn })
    }
}

impl RelationalStore for SqliteStore {
    fn execute(&mut self, sql: &str, params: &[Value]) -> StoreResult<usize> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        Ok(stmt.execute(params_from_iter(params.iter()))?)
    }

    fn query(&mut self, sql: &str) -> StoreResult<QueryResult> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_owned)
            .collect();
        let width = columns.len();

        let mut out = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                values.push(from_value_ref(row.get_ref(idx)?));
            }
            out.push(values);
        }

        Ok(QueryResult::new(columns, out))
    }

    fn close(self) -> StoreResult<()> {
        self.conn.close().map_err(|(_, e)| StoreError::Sqlite(e))
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Int64(v) => ToSqlOutput::Borrowed(ValueRef::Integer(*v)),
            Value::Float64(v) => ToSqlOutput::Borrowed(ValueRef::Real(*v)),
            Value::Utf8(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

fn from_value_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Int64(v),
        ValueRef::Real(v) => Value::Float64(v),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::Utf8(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}
