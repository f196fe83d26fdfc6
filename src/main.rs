use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, warn};

use csv_autoload::export::export_table;
use csv_autoload::inference::InferenceScope;
use csv_autoload::logging;
use csv_autoload::pipeline::{
    run_batch, JsonLinesObserver, LoadObserver, LoadOptions, LoadReport, LoadSeverity,
};
use csv_autoload::sanitize::TypeLookup;
use csv_autoload::source::{stage_files, LocalObjectStore, ObjectStore, DEFAULT_PATTERN};
use csv_autoload::store::{RelationalStore, SqliteStore};
use csv_autoload::transform::{CommandRunner, TransformRunner};

#[derive(Debug, Parser)]
#[command(name = "csv-autoload", version, about = "Load CSV files into SQLite without a predefined schema")]
struct Cli {
    /// Log every step, including inserted values.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Stage, infer, create and insert.
    Load(LoadArgs),
    /// Write tables back out as CSV.
    Export(ExportArgs),
}

#[derive(Debug, Args)]
struct LoadArgs {
    /// Working directory holding the CSV files to load.
    #[arg(long, env = "CSV_DIRECTORY")]
    csv_dir: PathBuf,

    /// SQLite database file.
    #[arg(long, env = "DATABASE_PATH")]
    database: PathBuf,

    /// Object store root to stage files from. Without it, `--csv-dir` is loaded as is.
    #[arg(long, env = "SOURCE_ROOT")]
    source_root: Option<PathBuf>,

    /// Key prefix to list under.
    #[arg(long, env = "SOURCE_PREFIX", default_value = "")]
    prefix: String,

    /// File-name glob for listed files.
    #[arg(long, default_value = DEFAULT_PATTERN)]
    pattern: String,

    /// Infer types from the first N rows instead of every row.
    #[arg(long, value_name = "N")]
    sample_rows: Option<usize>,

    /// Look up sanitization types by type-map position instead of column name.
    #[arg(long)]
    positional_type_lookup: bool,

    /// Column whose partial dates are completed (repeatable).
    #[arg(long = "date-column", default_value = "release_date")]
    date_columns: Vec<String>,

    /// Insert even when the table already holds the file's row count.
    #[arg(long)]
    force: bool,

    /// Append JSON load events to this file.
    #[arg(long)]
    event_log: Option<PathBuf>,

    /// Command to run after loading, e.g. `--transform dbt run`.
    #[arg(long, env = "TRANSFORM_COMMAND", num_args = 1.., value_delimiter = ' ')]
    transform: Vec<String>,

    /// Working directory for the transform command.
    #[arg(long, env = "TRANSFORM_DIRECTORY")]
    transform_dir: Option<PathBuf>,

    /// Print the load report as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct ExportArgs {
    /// SQLite database file.
    #[arg(long, env = "DATABASE_PATH")]
    database: PathBuf,

    /// Table to export (repeatable).
    #[arg(long = "table", required = true)]
    tables: Vec<String>,

    /// Directory the CSV files are written to.
    #[arg(long, env = "EXPORT_DIRECTORY", default_value = ".")]
    out_dir: PathBuf,

    /// Object store root to upload exported files to.
    #[arg(long, env = "UPLOAD_ROOT")]
    upload_root: Option<PathBuf>,

    /// Key prefix for uploaded files.
    #[arg(long, env = "UPLOAD_PREFIX", default_value = "transformed")]
    upload_prefix: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Command::Load(args) => load(args),
        Command::Export(args) => export(args),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load(args: LoadArgs) -> Result<ExitCode> {
    let files = match &args.source_root {
        Some(root) => {
            let remote = LocalObjectStore::with_pattern(root, &args.pattern)?;
            stage_files(&remote, &args.prefix, &args.csv_dir)
                .with_context(|| format!("staging files into {}", args.csv_dir.display()))?
        }
        None => {
            let local = LocalObjectStore::with_pattern(&args.csv_dir, &args.pattern)?;
            local
                .list_files(&args.prefix)?
                .iter()
                .map(|key| local.path_for(key))
                .collect()
        }
    };

    if files.is_empty() {
        warn!(dir = %args.csv_dir.display(), "no CSV files found");
        return Ok(ExitCode::SUCCESS);
    }

    let store = SqliteStore::open(&args.database)
        .with_context(|| format!("opening database {}", args.database.display()))?;

    let options = LoadOptions {
        inference: args
            .sample_rows
            .map(InferenceScope::Sample)
            .unwrap_or_default(),
        type_lookup: if args.positional_type_lookup {
            TypeLookup::ByTypeMapPosition
        } else {
            TypeLookup::ByColumnName
        },
        date_repair_columns: args.date_columns.clone(),
        skip_if_loaded: !args.force,
        observer: args
            .event_log
            .as_ref()
            .map(|p| Arc::new(JsonLinesObserver::new(p)) as Arc<dyn LoadObserver>),
        alert_at_or_above: LoadSeverity::Critical,
    };

    let report = run_batch(store, &files, &options);
    print_report(&report, args.json)?;

    if let Some(runner) = CommandRunner::from_command_line(args.transform.iter().cloned()) {
        let runner = match &args.transform_dir {
            Some(dir) => runner.current_dir(dir),
            None => runner,
        };
        if let Err(e) = runner.run() {
            error!(error = %e, "transform failed");
            return Ok(ExitCode::FAILURE);
        }
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_report(report: &LoadReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for file in &report.files {
        println!(
            "{:<8} {:<24} read={} inserted={} ignored={} failed={}",
            format!("{:?}", file.status).to_lowercase(),
            file.table,
            file.stats.rows_read,
            file.stats.rows_inserted,
            file.stats.rows_ignored,
            file.stats.rows_failed,
        );
    }
    for failure in &report.failures {
        println!("failed   {} ({:?}): {}", failure.path.display(), failure.kind, failure.error);
    }
    if let Some(e) = &report.close_error {
        println!("close    {e}");
    }
    Ok(())
}

fn export(args: ExportArgs) -> Result<ExitCode> {
    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;
    let mut store = SqliteStore::open(&args.database)
        .with_context(|| format!("opening database {}", args.database.display()))?;
    let uploader = args.upload_root.as_ref().map(LocalObjectStore::new);
    let mut ok = true;

    for table in &args.tables {
        let file_name = format!("{table}.csv");
        let dest = args.out_dir.join(&file_name);
        match export_table(&mut store, table, &dest) {
            Ok(rows) => println!("exported {table} ({rows} rows) to {}", dest.display()),
            Err(e) => {
                error!(table = %table, error = %e, "export failed");
                ok = false;
                continue;
            }
        }

        if let Some(uploader) = &uploader {
            let prefix = args.upload_prefix.trim_end_matches('/');
            let key = if prefix.is_empty() {
                file_name
            } else {
                format!("{prefix}/{file_name}")
            };
            if let Err(e) = uploader.upload(&dest, &key) {
                error!(table = %table, error = %e, "upload failed");
                ok = false;
            }
        }
    }

    store.close().context("closing database")?;
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
