use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use csv_autoload::error::{LoadError, LoadErrorKind, StoreError, StoreResult};
use csv_autoload::pipeline::{
    run_batch, LoadContext, LoadObserver, LoadOptions, LoadSeverity, LoadStats,
};
use csv_autoload::store::{RelationalStore, SqliteStore};
use csv_autoload::types::{QueryResult, Value};

#[derive(Default)]
struct RecordingObserver {
    failures: Mutex<Vec<(LoadSeverity, LoadErrorKind)>>,
    alerts: Mutex<Vec<(LoadSeverity, LoadErrorKind)>>,
    successes: Mutex<Vec<(String, LoadStats)>>,
    skips: Mutex<Vec<(String, usize)>>,
}

impl LoadObserver for RecordingObserver {
    fn on_success(&self, ctx: &LoadContext, stats: LoadStats) {
        self.successes.lock().unwrap().push((ctx.table.clone(), stats));
    }

    fn on_skip(&self, ctx: &LoadContext, rows: usize) {
        self.skips.lock().unwrap().push((ctx.table.clone(), rows));
    }

    fn on_failure(&self, _ctx: &LoadContext, severity: LoadSeverity, error: &LoadError) {
        self.failures.lock().unwrap().push((severity, error.kind()));
    }

    fn on_alert(&self, _ctx: &LoadContext, severity: LoadSeverity, error: &LoadError) {
        self.alerts.lock().unwrap().push((severity, error.kind()));
    }
}

/// Store whose statements can be made to fail, recording what it was asked to run.
#[derive(Default)]
struct ScriptedStore {
    fail_create: bool,
    fail_count: bool,
    fail_close: bool,
    statements: Rc<RefCell<Vec<String>>>,
    closes: Rc<Cell<usize>>,
}

impl RelationalStore for ScriptedStore {
    fn execute(&mut self, sql: &str, _params: &[Value]) -> StoreResult<usize> {
        self.statements.borrow_mut().push(sql.to_owned());
        if self.fail_create && sql.starts_with("CREATE TABLE") {
            return Err(StoreError::Backend {
                message: "permission denied".into(),
            });
        }
        Ok(1)
    }

    fn query(&mut self, _sql: &str) -> StoreResult<QueryResult> {
        if self.fail_count {
            return Err(StoreError::Backend {
                message: "relation does not exist".into(),
            });
        }
        Ok(QueryResult::new(
            vec!["count".into()],
            vec![vec![Value::Int64(0)]],
        ))
    }

    fn close(self) -> StoreResult<()> {
        self.closes.set(self.closes.get() + 1);
        if self.fail_close {
            return Err(StoreError::Backend {
                message: "connection reset".into(),
            });
        }
        Ok(())
    }
}

fn observed(obs: &Arc<RecordingObserver>, alert_at_or_above: LoadSeverity) -> LoadOptions {
    LoadOptions {
        observer: Some(obs.clone()),
        alert_at_or_above,
        ..Default::default()
    }
}

#[test]
fn observer_receives_failure_and_alert_on_critical_io_error() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = observed(&obs, LoadSeverity::Critical);

    let mut store = SqliteStore::open_in_memory().unwrap();
    run_batch(&mut store, &["tests/fixtures/does_not_exist.csv"], &opts);

    let failures = obs.failures.lock().unwrap().clone();
    let alerts = obs.alerts.lock().unwrap().clone();
    assert_eq!(failures, vec![(LoadSeverity::Critical, LoadErrorKind::SourceRead)]);
    assert_eq!(alerts, vec![(LoadSeverity::Critical, LoadErrorKind::SourceRead)]);
}

#[test]
fn observer_receives_failure_without_alert_for_empty_source() {
    let dir = tempfile::tempdir().unwrap();
    let empty = dir.path().join("empty.csv");
    std::fs::write(&empty, "").unwrap();

    let obs = Arc::new(RecordingObserver::default());
    let opts = observed(&obs, LoadSeverity::Critical);

    let mut store = SqliteStore::open_in_memory().unwrap();
    run_batch(&mut store, &[&empty], &opts);

    let failures = obs.failures.lock().unwrap().clone();
    assert_eq!(failures, vec![(LoadSeverity::Error, LoadErrorKind::EmptySource)]);
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn observer_sees_success_then_skip() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = observed(&obs, LoadSeverity::Critical);
    let files = ["tests/fixtures/tracks.csv"];

    let mut store = SqliteStore::open_in_memory().unwrap();
    run_batch(&mut store, &files, &opts);
    run_batch(&mut store, &files, &opts);

    let successes = obs.successes.lock().unwrap().clone();
    assert_eq!(successes.len(), 1);
    assert_eq!(successes[0].0, "tracks");
    assert_eq!(successes[0].1.rows_inserted, 2);

    assert_eq!(obs.skips.lock().unwrap().clone(), vec![("tracks".to_string(), 2)]);
    assert!(obs.failures.lock().unwrap().is_empty());
}

#[test]
fn failed_row_count_is_a_warning_and_rows_are_still_inserted() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = observed(&obs, LoadSeverity::Warning);
    let store = ScriptedStore {
        fail_count: true,
        ..Default::default()
    };
    let statements = store.statements.clone();

    let report = run_batch(store, &["tests/fixtures/tracks.csv"], &opts);

    assert!(report.is_success(), "{report:?}");
    assert_eq!(report.files[0].stats.rows_inserted, 2);

    let statements = statements.borrow();
    assert_eq!(statements.len(), 3);
    assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS \"tracks\""));
    assert!(statements[1].starts_with("INSERT INTO \"tracks\""));

    let expected = vec![(LoadSeverity::Warning, LoadErrorKind::Reconciliation)];
    assert_eq!(obs.failures.lock().unwrap().clone(), expected);
    assert_eq!(obs.alerts.lock().unwrap().clone(), expected);
}

#[test]
fn create_failure_abandons_file_but_not_the_batch() {
    let store = ScriptedStore {
        fail_create: true,
        ..Default::default()
    };
    let statements = store.statements.clone();
    let closes = store.closes.clone();

    let report = run_batch(
        store,
        &["tests/fixtures/tracks.csv", "tests/fixtures/artists.csv"],
        &LoadOptions::default(),
    );

    let kinds: Vec<_> = report.failures.iter().map(|f| f.kind).collect();
    assert_eq!(kinds, vec![LoadErrorKind::Schema, LoadErrorKind::Schema]);
    // One create attempt per file, no inserts.
    assert_eq!(statements.borrow().len(), 2);
    assert_eq!(closes.get(), 1);
}

#[test]
fn store_is_closed_once_and_close_failure_is_reported() {
    let store = ScriptedStore {
        fail_close: true,
        ..Default::default()
    };
    let closes = store.closes.clone();

    let report = run_batch(
        store,
        &["tests/fixtures/tracks.csv", "tests/fixtures/plays.csv"],
        &LoadOptions::default(),
    );

    assert_eq!(report.loaded_count(), 2);
    assert_eq!(closes.get(), 1);
    assert!(report.close_error.as_deref().unwrap().contains("connection reset"));
    assert!(!report.is_success());
}

#[test]
fn batch_without_files_still_closes_the_store() {
    let store = ScriptedStore::default();
    let closes = store.closes.clone();

    let files: [&str; 0] = [];
    let report = run_batch(store, &files, &LoadOptions::default());

    assert!(report.is_success());
    assert_eq!(closes.get(), 1);
}
