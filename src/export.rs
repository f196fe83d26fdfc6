//! Writing tables back out as CSV.

use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::error::{LoadError, LoadResult};
use crate::sql::select_all_sql;
use crate::store::RelationalStore;

/// Export every row of `table` to a CSV file with a header row. Returns the number of rows.
pub fn export_table<S: RelationalStore + ?Sized>(
    store: &mut S,
    table: &str,
    dest: impl AsRef<Path>,
) -> LoadResult<usize> {
    let dest = dest.as_ref();
    let wtr = csv::Writer::from_path(dest).map_err(|e| LoadError::csv(dest, e))?;
    let rows = export_table_to_writer(store, table, wtr)?;
    info!(table, path = %dest.display(), rows, "exported table");
    Ok(rows)
}

/// Export every row of `table` into an existing CSV writer, flushing it at the end.
///
/// `NULL` values are written as empty fields.
pub fn export_table_to_writer<S, W>(
    store: &mut S,
    table: &str,
    mut wtr: csv::Writer<W>,
) -> LoadResult<usize>
where
    S: RelationalStore + ?Sized,
    W: Write,
{
    let export_err = |message: String| LoadError::Export {
        table: table.to_owned(),
        message,
    };

    let result = store
        .query(&select_all_sql(table))
        .map_err(|e| export_err(e.to_string()))?;

    wtr.write_record(&result.columns)
        .map_err(|e| export_err(e.to_string()))?;
    for row in &result.rows {
        wtr.write_record(row.iter().map(|v| v.to_field()))
            .map_err(|e| export_err(e.to_string()))?;
    }
    wtr.flush().map_err(|e| export_err(e.to_string()))?;

    Ok(result.row_count())
}
