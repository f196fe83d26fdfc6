//! Per-file load orchestration.
//!
//! Each file goes through, strictly in order:
//!
//! 1. detect the separator
//! 2. read every row (zero rows abandons the file)
//! 3. infer column types
//! 4. ensure the table exists (`CREATE TABLE IF NOT EXISTS`, always attempted)
//! 5. reconcile: skip when the table already holds exactly as many rows as the file
//! 6. sanitize and insert each row with its own statement, continuing past failing rows
//!
//! [`run_batch`] drives many files over one store and closes the store exactly once at the end,
//! whatever happened to the individual files.

mod observability;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{LoadError, LoadErrorKind, LoadResult};
use crate::inference::{infer_with_scope, InferenceScope};
use crate::ingestion::{detect_separator, read_rows, Separator};
use crate::reconcile::check_loaded;
use crate::sanitize::{RowSanitizer, TypeLookup, DEFAULT_DATE_REPAIR_COLUMNS};
use crate::sql::{create_table_sql, insert_sql};
use crate::store::RelationalStore;
use crate::types::{ColumnTypeMap, RowSet};

pub use observability::{
    severity_for_error, CompositeObserver, JsonLinesObserver, LoadContext, LoadObserver, LoadSeverity,
    LoadStats,
};

/// Options controlling how files are loaded.
///
/// Use [`Default`] for the standard behavior.
#[derive(Clone)]
pub struct LoadOptions {
    /// Rows fed to type inference.
    pub inference: InferenceScope,
    /// How sanitization finds a value's column type.
    pub type_lookup: TypeLookup,
    /// Columns whose partial dates are completed before insertion.
    pub date_repair_columns: Vec<String>,
    /// Skip files whose table already holds the same number of rows.
    pub skip_if_loaded: bool,
    /// Optional observer for outcomes and alerts.
    pub observer: Option<Arc<dyn LoadObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: LoadSeverity,
}

impl fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadOptions")
            .field("inference", &self.inference)
            .field("type_lookup", &self.type_lookup)
            .field("date_repair_columns", &self.date_repair_columns)
            .field("skip_if_loaded", &self.skip_if_loaded)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            inference: InferenceScope::default(),
            type_lookup: TypeLookup::default(),
            date_repair_columns: DEFAULT_DATE_REPAIR_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            skip_if_loaded: true,
            observer: None,
            alert_at_or_above: LoadSeverity::Critical,
        }
    }
}

/// What happened to a file that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    /// Rows were inserted (some may have failed or been ignored).
    Loaded,
    /// The table already held the file's row count; nothing was inserted.
    Skipped,
}

/// Outcome of one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileLoadSummary {
    pub path: PathBuf,
    pub table: String,
    pub separator: Separator,
    pub columns: ColumnTypeMap,
    pub status: LoadStatus,
    pub stats: LoadStats,
}

/// A file that was abandoned.
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub table: Option<String>,
    pub kind: LoadErrorKind,
    pub error: String,
}

impl FileFailure {
    fn new(path: &Path, err: &LoadError) -> Self {
        Self {
            path: path.to_path_buf(),
            table: table_name_for(path).ok(),
            kind: err.kind(),
            error: err.to_string(),
        }
    }
}

/// Outcome of a [`run_batch`] call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub files: Vec<FileLoadSummary>,
    pub failures: Vec<FileFailure>,
    /// Set when releasing the store failed.
    pub close_error: Option<String>,
}

impl LoadReport {
    pub fn loaded_count(&self) -> usize {
        self.count_status(LoadStatus::Loaded)
    }

    pub fn skipped_count(&self) -> usize {
        self.count_status(LoadStatus::Skipped)
    }

    /// No file failed and the store closed cleanly.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.close_error.is_none()
    }

    fn count_status(&self, status: LoadStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }
}

/// Table name for a source file: its base name without extension.
pub fn table_name_for(path: impl AsRef<Path>) -> LoadResult<String> {
    let path = path.as_ref();
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| LoadError::InvalidTableName {
            path: path.to_path_buf(),
        })
}

/// Loads files into one borrowed store.
pub struct LoadPipeline<'a, S: ?Sized> {
    store: &'a mut S,
    options: &'a LoadOptions,
}

impl<'a, S: RelationalStore + ?Sized> LoadPipeline<'a, S> {
    pub fn new(store: &'a mut S, options: &'a LoadOptions) -> Self {
        Self { store, options }
    }

    /// Load a single file.
    ///
    /// Fatal errors abandon the file and are returned; row insert and reconciliation failures are
    /// logged, reported to the observer, and counted in the summary instead.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> LoadResult<FileLoadSummary> {
        let path = path.as_ref();
        let ctx = LoadContext {
            path: path.to_path_buf(),
            table: table_name_for(path)?,
        };

        let result = self.run_steps(&ctx);

        match &result {
            Ok(summary) => {
                if let Some(obs) = self.options.observer.as_ref() {
                    match summary.status {
                        LoadStatus::Loaded => obs.on_success(&ctx, summary.stats),
                        LoadStatus::Skipped => obs.on_skip(&ctx, summary.stats.rows_read),
                    }
                }
            }
            Err(e) => self.report_failure(&ctx, e),
        }

        result
    }

    fn run_steps(&mut self, ctx: &LoadContext) -> LoadResult<FileLoadSummary> {
        let path = ctx.path.as_path();
        let table = ctx.table.as_str();

        let separator = detect_separator(path)?;
        info!(path = %path.display(), %separator, "detected separator");

        let rows = read_rows(path, separator)?;
        if rows.is_empty() {
            return Err(LoadError::EmptySource {
                path: path.to_path_buf(),
            });
        }

        let columns = infer_with_scope(&rows, self.options.inference);

        let ddl = create_table_sql(table, &columns);
        info!(table, "ensuring table:\n{ddl}");
        self.store
            .execute(&ddl, &[])
            .map_err(|source| LoadError::Schema {
                table: table.to_owned(),
                source,
            })?;

        let mut stats = LoadStats {
            rows_read: rows.row_count(),
            ..Default::default()
        };

        let mut summary = FileLoadSummary {
            path: path.to_path_buf(),
            table: table.to_owned(),
            separator,
            columns,
            status: LoadStatus::Skipped,
            stats,
        };

        if self.options.skip_if_loaded {
            let (loaded, err) = check_loaded(&mut *self.store, table, rows.row_count());
            if let Some(err) = err {
                self.report_failure(ctx, &err);
            }
            if loaded {
                info!(table, rows = rows.row_count(), "table already loaded, skipping insert");
                return Ok(summary);
            }
        }

        self.insert_rows(ctx, &rows, &summary.columns, &mut stats);
        info!(
            table,
            inserted = stats.rows_inserted,
            ignored = stats.rows_ignored,
            failed = stats.rows_failed,
            "finished inserting"
        );

        summary.status = LoadStatus::Loaded;
        summary.stats = stats;
        Ok(summary)
    }

    fn insert_rows(
        &mut self,
        ctx: &LoadContext,
        rows: &RowSet,
        columns: &ColumnTypeMap,
        stats: &mut LoadStats,
    ) {
        let options = self.options;
        let sanitizer = RowSanitizer::new(
            columns,
            options.type_lookup,
            &options.date_repair_columns,
        );
        let insert = insert_sql(&ctx.table, &rows.columns);

        for (idx, row) in rows.rows.iter().enumerate() {
            let user_row = idx + 2;
            let values = sanitizer.prepare_row(&rows.columns, row);
            debug!(table = %ctx.table, row = user_row, ?values, "inserting row");

            match self.store.execute(&insert, &values) {
                Ok(0) => stats.rows_ignored += 1,
                Ok(n) => stats.rows_inserted += n,
                Err(source) => {
                    let err = LoadError::RowInsert {
                        table: ctx.table.clone(),
                        row: user_row,
                        source,
                    };
                    warn!(error = %err, "row insert failed, continuing");
                    self.report_failure(ctx, &err);
                    stats.rows_failed += 1;
                }
            }
        }
    }

    fn report_failure(&self, ctx: &LoadContext, err: &LoadError) {
        if let Some(obs) = self.options.observer.as_ref() {
            let sev = severity_for_error(err);
            obs.on_failure(ctx, sev, err);
            if sev >= self.options.alert_at_or_above {
                obs.on_alert(ctx, sev, err);
            }
        }
    }
}

/// Load every file in order over one store, then close the store.
///
/// A failing file is logged and recorded in the report; the remaining files are still attempted.
/// The store is closed exactly once after the last file.
pub fn run_batch<S, P>(mut store: S, files: &[P], options: &LoadOptions) -> LoadReport
where
    S: RelationalStore,
    P: AsRef<Path>,
{
    let mut report = LoadReport::default();

    {
        let mut pipeline = LoadPipeline::new(&mut store, options);
        for file in files {
            let path = file.as_ref();
            match pipeline.load_file(path) {
                Ok(summary) => report.files.push(summary),
                Err(e) => {
                    error!(path = %path.display(), error = %e, "abandoning file");
                    report.failures.push(FileFailure::new(path, &e));
                }
            }
        }
    }

    debug!("closing store");
    if let Err(e) = store.close() {
        let err = LoadError::Close(e);
        error!(error = %err, "failed to release store");
        report.close_error = Some(err.to_string());
    }

    info!(
        loaded = report.loaded_count(),
        skipped = report.skipped_count(),
        failed = report.failures.len(),
        "batch finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::table_name_for;

    #[test]
    fn table_name_is_file_stem() {
        assert_eq!(table_name_for("data/raw/tracks.csv").unwrap(), "tracks");
        assert_eq!(table_name_for("artists.tsv").unwrap(), "artists");
        assert_eq!(table_name_for("plays").unwrap(), "plays");
    }

    #[test]
    fn path_without_stem_is_rejected() {
        assert!(table_name_for("data/..").is_err());
    }
}
