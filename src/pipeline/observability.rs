use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::json;

use crate::error::LoadError;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadSeverity {
    /// Informational event.
    Info,
    /// Non-fatal problem; the file kept loading.
    Warning,
    /// The file was abandoned.
    Error,
    /// The file was abandoned because of an I/O failure.
    Critical,
}

/// The file and table a callback refers to.
#[derive(Debug, Clone)]
pub struct LoadContext {
    /// Source file path.
    pub path: PathBuf,
    /// Target table name.
    pub table: String,
}

/// Counters reported when a file finishes loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LoadStats {
    /// Rows read from the source file.
    pub rows_read: usize,
    /// Rows the store reported as inserted.
    pub rows_inserted: usize,
    /// Rows dropped by `ON CONFLICT DO NOTHING`.
    pub rows_ignored: usize,
    /// Rows whose insert failed.
    pub rows_failed: usize,
}

/// Observer interface for load outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait LoadObserver: Send + Sync {
    /// Called when a file's rows were inserted.
    fn on_success(&self, _ctx: &LoadContext, _stats: LoadStats) {}

    /// Called when a file was skipped because the table already holds its row count.
    fn on_skip(&self, _ctx: &LoadContext, _rows: usize) {}

    /// Called for every failure, fatal or not.
    fn on_failure(&self, _ctx: &LoadContext, _severity: LoadSeverity, _error: &LoadError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &LoadContext, severity: LoadSeverity, error: &LoadError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Severity the pipeline assigns to an error.
pub fn severity_for_error(e: &LoadError) -> LoadSeverity {
    match e {
        LoadError::Io { .. } | LoadError::ObjectStore { .. } => LoadSeverity::Critical,
        LoadError::Csv { source, .. } => match source.kind() {
            csv::ErrorKind::Io(_) => LoadSeverity::Critical,
            _ => LoadSeverity::Error,
        },
        e if e.is_recoverable() => LoadSeverity::Warning,
        _ => LoadSeverity::Error,
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn LoadObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn LoadObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl LoadObserver for CompositeObserver {
    fn on_success(&self, ctx: &LoadContext, stats: LoadStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_skip(&self, ctx: &LoadContext, rows: usize) {
        for o in &self.observers {
            o.on_skip(ctx, rows);
        }
    }

    fn on_failure(&self, ctx: &LoadContext, severity: LoadSeverity, error: &LoadError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &LoadContext, severity: LoadSeverity, error: &LoadError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Appends one JSON object per event to a local file.
///
/// Writes are best-effort; failures to open/write the file are ignored.
#[derive(Debug)]
pub struct JsonLinesObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonLinesObserver {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append(&self, event: serde_json::Value) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{event}");
        }
    }
}

impl LoadObserver for JsonLinesObserver {
    fn on_success(&self, ctx: &LoadContext, stats: LoadStats) {
        self.append(json!({
            "ts": unix_ts(),
            "event": "loaded",
            "path": ctx.path.display().to_string(),
            "table": ctx.table,
            "stats": stats,
        }));
    }

    fn on_skip(&self, ctx: &LoadContext, rows: usize) {
        self.append(json!({
            "ts": unix_ts(),
            "event": "skipped",
            "path": ctx.path.display().to_string(),
            "table": ctx.table,
            "rows": rows,
        }));
    }

    fn on_failure(&self, ctx: &LoadContext, severity: LoadSeverity, error: &LoadError) {
        self.append(failure_event("failed", ctx, severity, error));
    }

    fn on_alert(&self, ctx: &LoadContext, severity: LoadSeverity, error: &LoadError) {
        self.append(failure_event("alert", ctx, severity, error));
    }
}

fn failure_event(
    event: &str,
    ctx: &LoadContext,
    severity: LoadSeverity,
    error: &LoadError,
) -> serde_json::Value {
    json!({
        "ts": unix_ts(),
        "event": event,
        "severity": severity,
        "kind": error.kind(),
        "path": ctx.path.display().to_string(),
        "table": ctx.table,
        "error": error.to_string(),
    })
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    use super::{
        severity_for_error, CompositeObserver, JsonLinesObserver, LoadContext, LoadObserver,
        LoadSeverity, LoadStats,
    };
    use crate::error::{LoadError, StoreError};

    #[test]
    fn severities_follow_error_taxonomy() {
        let io = LoadError::Io {
            path: PathBuf::from("x.csv"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        let empty = LoadError::EmptySource {
            path: PathBuf::from("x.csv"),
        };
        let row = LoadError::RowInsert {
            table: "x".into(),
            row: 2,
            source: StoreError::Backend {
                message: "boom".into(),
            },
        };
        assert_eq!(severity_for_error(&io), LoadSeverity::Critical);
        assert_eq!(severity_for_error(&empty), LoadSeverity::Error);
        assert_eq!(severity_for_error(&row), LoadSeverity::Warning);
    }

    #[test]
    fn json_lines_observer_appends_one_event_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("events.jsonl");
        let obs = JsonLinesObserver::new(&log);
        let ctx = LoadContext {
            path: PathBuf::from("tracks.csv"),
            table: "tracks".into(),
        };

        obs.on_success(&ctx, LoadStats { rows_read: 2, rows_inserted: 2, ..Default::default() });
        obs.on_skip(&ctx, 2);

        let text = std::fs::read_to_string(&log).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "loaded");
        assert_eq!(lines[0]["stats"]["rows_inserted"], 2);
        assert_eq!(lines[1]["event"], "skipped");
        assert_eq!(lines[1]["table"], "tracks");
    }

    #[derive(Default)]
    struct Counting {
        skips: Mutex<usize>,
    }

    impl LoadObserver for Counting {
        fn on_skip(&self, _ctx: &LoadContext, _rows: usize) {
            *self.skips.lock().unwrap() += 1;
        }
    }

    #[test]
    fn composite_observer_fans_out_to_every_observer() {
        let a = Arc::new(Counting::default());
        let b = Arc::new(Counting::default());
        let composite = CompositeObserver::new(vec![a.clone(), b.clone()]);
        let ctx = LoadContext {
            path: PathBuf::from("tracks.csv"),
            table: "tracks".into(),
        };

        composite.on_skip(&ctx, 3);

        assert_eq!(*a.skips.lock().unwrap(), 1);
        assert_eq!(*b.skips.lock().unwrap(), 1);
    }
}
