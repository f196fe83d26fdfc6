//! `csv-autoload` loads CSV files of unknown shape into a relational store without a predefined
//! schema.
//!
//! For every file it sniffs the delimiter, reads all rows, infers a SQL type per column, creates
//! the table if it does not exist yet, skips files whose table already holds the same number of
//! rows, and inserts the remaining rows one statement at a time.
//!
//! The primary entrypoint is [`pipeline::run_batch`], which loads a list of files over one
//! [`store::RelationalStore`] and closes the store when it is done.
//!
//! ## Loading files
//!
//! ```no_run
//! use csv_autoload::pipeline::{run_batch, LoadOptions};
//! use csv_autoload::store::SqliteStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::open("warehouse.db")?;
//! let report = run_batch(store, &["data/tracks.csv", "data/artists.csv"], &LoadOptions::default());
//! println!(
//!     "loaded={} skipped={} failed={}",
//!     report.loaded_count(),
//!     report.skipped_count(),
//!     report.failures.len()
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Type inference
//!
//! Types are `TEXT`, `INT`, `FLOAT` or `DATE`. The type of a column is decided by the **last**
//! row processed; earlier rows are overwritten, not voted on.
//!
//! ```rust
//! use csv_autoload::inference::infer_column_types;
//! use csv_autoload::sql::create_table_sql;
//! use csv_autoload::types::{ColumnType, RowSet};
//!
//! let rows = RowSet::from_strings(
//!     ["id", "title", "release_date"],
//!     [["1", "Song A", "1999"], ["2", "Song B", "2000-05"]],
//! );
//! let types = infer_column_types(&rows);
//! assert_eq!(types.get("release_date"), Some(ColumnType::Date));
//!
//! let ddl = create_table_sql("tracks", &types);
//! assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS \"tracks\""));
//! ```
//!
//! ## Sanitization
//!
//! Before insertion, partial dates in `release_date` are completed (`1999` becomes
//! `1999-01-01`, `2000-05` becomes `2000-05-01`) and empty values in `INT`/`FLOAT` columns become
//! `NULL`. Empty values in other columns are inserted as empty strings.
//!
//! ## Modules
//!
//! - [`ingestion`]: delimiter sniffing and CSV reading
//! - [`inference`]: column type inference
//! - [`sql`]: DDL and statement generation
//! - [`sanitize`]: date repair and null coercion
//! - [`reconcile`]: row-count idempotence check
//! - [`pipeline`]: per-file orchestration, batch runs, observers
//! - [`store`]: relational store trait and the SQLite backend
//! - [`source`]: object store listing and local staging
//! - [`export`]: table to CSV
//! - [`transform`]: external transform command
//! - [`logging`]: `tracing` subscriber setup

pub mod error;
pub mod export;
pub mod inference;
pub mod ingestion;
pub mod logging;
pub mod pipeline;
pub mod reconcile;
pub mod sanitize;
pub mod source;
pub mod sql;
pub mod store;
pub mod transform;
pub mod types;

pub use error::{LoadError, LoadErrorKind, LoadResult, StoreError, StoreResult};
