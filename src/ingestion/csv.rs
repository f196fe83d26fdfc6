//! Delimited file reading.

use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::error::{LoadError, LoadResult};
use crate::types::RowSet;

use super::separator::Separator;

/// A CSV reader builder configured the way every source file is read.
///
/// - The first record is always the header.
/// - Records may be shorter than the header; missing cells become `None`.
pub fn reader_builder(separator: Separator) -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .flexible(true)
        .delimiter(separator.as_byte());
    builder
}

/// Read every row of a delimited file into a [`RowSet`].
pub fn read_rows(path: impl AsRef<Path>, separator: Separator) -> LoadResult<RowSet> {
    let path = path.as_ref();
    let mut rdr = reader_builder(separator)
        .from_path(path)
        .map_err(|e| LoadError::csv(path, e))?;
    read_rows_from_reader(&mut rdr, path)
}

/// Read every row from an existing CSV reader.
///
/// `origin` only labels errors.
pub fn read_rows_from_reader<R: Read>(
    rdr: &mut csv::Reader<R>,
    origin: impl AsRef<Path>,
) -> LoadResult<RowSet> {
    let origin = origin.as_ref();
    let headers = rdr.headers().map_err(|e| LoadError::csv(origin, e))?;

    let mut columns: Vec<String> = Vec::with_capacity(headers.len());
    for (idx, name) in headers.iter().enumerate() {
        let name = if idx == 0 {
            name.trim_start_matches('\u{feff}')
        } else {
            name
        };
        if columns.iter().any(|c| c == name) {
            return Err(LoadError::DuplicateColumn {
                path: origin.to_path_buf(),
                column: name.to_owned(),
            });
        }
        columns.push(name.to_owned());
    }

    let mut rows = Vec::new();
    for (row_idx0, result) in rdr.records().enumerate() {
        // 1-based, and the header is line 1.
        let user_row = row_idx0 + 2;
        let record = result.map_err(|e| LoadError::csv(origin, e))?;
        if record.len() > columns.len() {
            return Err(LoadError::RaggedRow {
                path: origin.to_path_buf(),
                row: user_row,
                expected: columns.len(),
                found: record.len(),
            });
        }

        let row = (0..columns.len())
            .map(|idx| record.get(idx).map(str::to_owned))
            .collect();
        rows.push(row);
    }

    debug!(path = %origin.display(), columns = columns.len(), rows = rows.len(), "read source rows");
    Ok(RowSet::new(columns, rows))
}
