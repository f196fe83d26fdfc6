//! Row-count based idempotence check.
//!
//! A table whose row count equals the source file's row count is treated as already loaded.
//! This is a proxy, not a content comparison: a changed file with an unchanged row count is
//! skipped as well.

use tracing::{debug, warn};

use crate::error::{LoadError, StoreError, StoreResult};
use crate::sql::count_sql;
use crate::store::RelationalStore;
use crate::types::Value;

/// Number of rows currently stored in `table`.
pub fn stored_row_count<S: RelationalStore + ?Sized>(
    store: &mut S,
    table: &str,
) -> StoreResult<u64> {
    let result = store.query(&count_sql(table))?;
    match result.scalar() {
        Some(Value::Int64(n)) if *n >= 0 => Ok(*n as u64),
        // Some drivers hand back COUNT(*) as text.
        Some(Value::Utf8(s)) => s.trim().parse().map_err(|_| StoreError::UnexpectedResult {
            message: format!("count is not a number: '{s}'"),
        }),
        other => Err(StoreError::UnexpectedResult {
            message: format!("expected a single count, got {other:?}"),
        }),
    }
}

/// Decide whether loading `table` can be skipped.
///
/// Returns the error alongside `false` when the count could not be read, so callers can report
/// it; a failed count never blocks ingestion.
pub fn check_loaded<S: RelationalStore + ?Sized>(
    store: &mut S,
    table: &str,
    source_rows: usize,
) -> (bool, Option<LoadError>) {
    match stored_row_count(store, table) {
        Ok(stored) => {
            debug!(table, stored, source_rows, "reconciled row count");
            (stored == source_rows as u64, None)
        }
        Err(source) => {
            let err = LoadError::Reconciliation {
                table: table.to_owned(),
                source,
            };
            warn!(table, error = %err, "row count check failed, loading anyway");
            (false, Some(err))
        }
    }
}

/// `true` when the stored row count equals `source_rows`; `false` otherwise or on any error.
pub fn should_skip<S: RelationalStore + ?Sized>(
    store: &mut S,
    table: &str,
    source_rows: usize,
) -> bool {
    check_loaded(store, table, source_rows).0
}
