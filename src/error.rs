use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Convenience result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Convenience result type for relational store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error returned by a [`crate::store::RelationalStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite backend error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The statement ran but its result did not have the expected shape.
    #[error("unexpected result: {message}")]
    UnexpectedResult { message: String },

    /// Backend-specific failure for stores other than the bundled ones.
    #[error("{message}")]
    Backend { message: String },
}

/// Coarse classification of a [`LoadError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadErrorKind {
    /// The source file could not be opened, streamed or parsed.
    SourceRead,
    /// The source file parsed to zero rows.
    EmptySource,
    /// The create-table statement failed.
    Schema,
    /// The row-count query failed (non-fatal).
    Reconciliation,
    /// A single row failed to insert (non-fatal).
    RowInsert,
    /// Exporting a table to CSV failed.
    Export,
    /// Listing, downloading or uploading through an object store failed.
    ObjectStore,
    /// The external transform command failed.
    Transform,
    /// Releasing the store failed.
    Close,
}

/// Error type shared by the load pipeline and its collaborators.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Underlying I/O error while reading a source file.
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The delimited source could not be parsed.
    #[error("failed to parse '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A data row has more fields than the header.
    #[error("row {row} of '{path}' has {found} fields, header has {expected}")]
    RaggedRow {
        path: PathBuf,
        row: usize,
        expected: usize,
        found: usize,
    },

    /// The header names the same column twice.
    #[error("duplicate column '{column}' in header of '{path}'")]
    DuplicateColumn { path: PathBuf, column: String },

    /// No table name can be derived from the file name.
    #[error("cannot derive a table name from '{path}'")]
    InvalidTableName { path: PathBuf },

    /// The source produced zero data rows.
    #[error("no data found in '{path}'")]
    EmptySource { path: PathBuf },

    /// The create-table statement failed.
    #[error("failed to create table \"{table}\": {source}")]
    Schema {
        table: String,
        #[source]
        source: StoreError,
    },

    /// The row-count query failed.
    #[error("failed to count rows of table \"{table}\": {source}")]
    Reconciliation {
        table: String,
        #[source]
        source: StoreError,
    },

    /// Inserting one row failed.
    #[error("failed to insert row {row} into \"{table}\": {source}")]
    RowInsert {
        table: String,
        row: usize,
        #[source]
        source: StoreError,
    },

    /// Exporting a table failed.
    #[error("failed to export table \"{table}\": {message}")]
    Export { table: String, message: String },

    /// An object store operation failed.
    #[error("object store error for '{key}': {source}")]
    ObjectStore {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// A file-name pattern for object store listing is not a valid glob.
    #[error("invalid file pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// The external transform command could not run or exited unsuccessfully.
    #[error("transform command '{command}' failed: {message}")]
    Transform { command: String, message: String },

    /// Closing the store failed.
    #[error("failed to close store: {0}")]
    Close(#[source] StoreError),
}

impl LoadError {
    /// Map this error onto the coarse taxonomy.
    pub fn kind(&self) -> LoadErrorKind {
        match self {
            Self::Io { .. }
            | Self::Csv { .. }
            | Self::RaggedRow { .. }
            | Self::DuplicateColumn { .. }
            | Self::InvalidTableName { .. } => LoadErrorKind::SourceRead,
            Self::EmptySource { .. } => LoadErrorKind::EmptySource,
            Self::Schema { .. } => LoadErrorKind::Schema,
            Self::Reconciliation { .. } => LoadErrorKind::Reconciliation,
            Self::RowInsert { .. } => LoadErrorKind::RowInsert,
            Self::Export { .. } => LoadErrorKind::Export,
            Self::ObjectStore { .. } | Self::Pattern { .. } => LoadErrorKind::ObjectStore,
            Self::Transform { .. } => LoadErrorKind::Transform,
            Self::Close(_) => LoadErrorKind::Close,
        }
    }

    /// Whether the pipeline keeps going after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            LoadErrorKind::Reconciliation | LoadErrorKind::RowInsert
        )
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}
