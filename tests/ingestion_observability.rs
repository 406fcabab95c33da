use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use tabular_stats::engine::{EngineKind, PolarsEngine, RowEngine};
use tabular_stats::ingestion::{
    load_from_path, EventLogObserver, LoadContext, LoadOptions, LoadObserver, LoadSeverity, LoadStats,
    ObserverSet,
};
use tabular_stats::StatsError;

#[derive(Default)]
struct RecordingObserver {
    successes: Mutex<Vec<(EngineKind, LoadStats)>>,
    failures: Mutex<Vec<LoadSeverity>>,
    alerts: Mutex<Vec<LoadSeverity>>,
}

impl LoadObserver for RecordingObserver {
    fn on_success(&self, ctx: &LoadContext, stats: LoadStats) {
        self.successes.lock().unwrap().push((ctx.engine, stats));
    }

    fn on_failure(&self, _ctx: &LoadContext, severity: LoadSeverity, _error: &StatsError) {
        self.failures.lock().unwrap().push(severity);
    }

    fn on_alert(&self, _ctx: &LoadContext, severity: LoadSeverity, _error: &StatsError) {
        self.alerts.lock().unwrap().push(severity);
    }
}

fn tmp_log(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("tabular_stats_{tag}_{nanos}.log"))
}

#[test]
fn observer_receives_success_with_stats() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = LoadOptions {
        observer: Some(obs.clone()),
        ..Default::default()
    };

    load_from_path(&PolarsEngine, "tests/fixtures/scenario.csv", &opts).unwrap();

    let successes = obs.successes.lock().unwrap().clone();
    assert_eq!(successes.len(), 1);
    let (engine, stats) = successes[0];
    assert_eq!(engine, EngineKind::Polars);
    assert_eq!((stats.rows, stats.columns), (3, 2));
    assert!(obs.failures.lock().unwrap().is_empty());
}

#[test]
fn observer_receives_failure_and_alert_on_critical_io_error() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = LoadOptions {
        observer: Some(obs.clone()),
        alert_at_or_above: LoadSeverity::Critical,
    };

    // Missing file -> Io error -> Critical
    let _ = load_from_path(&RowEngine, "tests/fixtures/does_not_exist.csv", &opts).unwrap_err();

    let failures = obs.failures.lock().unwrap().clone();
    let alerts = obs.alerts.lock().unwrap().clone();
    assert_eq!(failures, vec![LoadSeverity::Critical]);
    assert_eq!(alerts, vec![LoadSeverity::Critical]);
}

#[test]
fn observer_receives_failure_without_alert_for_non_critical_error() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = LoadOptions {
        observer: Some(obs.clone()),
        alert_at_or_above: LoadSeverity::Critical,
    };

    // Duplicate header -> Error severity (not Critical) -> should not alert
    let _ = load_from_path(&RowEngine, "tests/fixtures/duplicate_header.csv", &opts).unwrap_err();

    let failures = obs.failures.lock().unwrap().clone();
    assert_eq!(failures, vec![LoadSeverity::Error]);
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn observer_set_fans_out_and_event_log_appends() {
    let log = tmp_log("events");
    let recorder = Arc::new(RecordingObserver::default());
    let observers = ObserverSet::new()
        .with(recorder.clone())
        .with(Arc::new(EventLogObserver::open(&log).unwrap()));
    assert_eq!(observers.len(), 2);
    let opts = LoadOptions {
        observer: Some(Arc::new(observers)),
        alert_at_or_above: LoadSeverity::Error,
    };

    load_from_path(&RowEngine, "tests/fixtures/scenario.csv", &opts).unwrap();
    let _ = load_from_path(&RowEngine, "tests/fixtures/duplicate_header.csv", &opts).unwrap_err();

    assert_eq!(recorder.successes.lock().unwrap().len(), 1);
    assert_eq!(recorder.alerts.lock().unwrap().clone(), vec![LoadSeverity::Error]);

    let text = std::fs::read_to_string(&log).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains(" loaded rows:tests/fixtures/scenario.csv "));
    assert!(lines[0].ends_with("encoding=UTF-8 rows=3 columns=2"));
    assert!(lines[1].contains(" failed rows:tests/fixtures/duplicate_header.csv severity=error "));
    assert!(lines[1].contains("duplicate column 'a'"));
    assert!(lines[2].contains(" ALERT rows:"));

    let _ = std::fs::remove_file(&log);
}

#[test]
fn event_log_records_encoding_and_lossy_fallback() {
    let latin1 = tmp_log("latin1").with_extension("csv");
    std::fs::write(&latin1, b"name\ncaf\xe9\n").unwrap();

    // Valid UTF-8 for the whole sniffed prefix, invalid after it.
    let late_invalid = tmp_log("late_invalid").with_extension("csv");
    let mut bytes = b"name\n".to_vec();
    bytes.extend(b"a\n".repeat(5_000));
    bytes.extend(b"caf\xe9\n");
    std::fs::write(&late_invalid, &bytes).unwrap();

    let log = tmp_log("encodings");
    let opts = LoadOptions {
        observer: Some(Arc::new(EventLogObserver::open(&log).unwrap())),
        ..Default::default()
    };

    let (_, stats) = load_from_path(&PolarsEngine, &latin1, &opts).unwrap();
    assert_eq!((stats.encoding, stats.lossy), ("windows-1252", false));
    let (_, stats) = load_from_path(&RowEngine, &late_invalid, &opts).unwrap();
    assert_eq!((stats.encoding, stats.lossy), ("UTF-8", true));

    let text = std::fs::read_to_string(&log).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains(" loaded polars:"));
    assert!(lines[0].ends_with("encoding=windows-1252 rows=1 columns=1"));
    assert!(lines[1].contains(" loaded rows:"));
    assert!(lines[1].ends_with("encoding=UTF-8 (lossy) rows=5001 columns=1"));

    for path in [&latin1, &late_invalid, &log] {
        let _ = std::fs::remove_file(path);
    }
}
