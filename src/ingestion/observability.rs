use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::engine::EngineKind;
use crate::error::StatsError;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (load failed).
    Error,
    /// Critical error (typically I/O or other infrastructure failures).
    Critical,
}

impl LoadSeverity {
    /// Severity of a failed load.
    ///
    /// I/O problems (including I/O surfaced through the CSV reader) are `Critical`; malformed
    /// input is `Error`.
    pub fn for_error(e: &StatsError) -> Self {
        match e {
            StatsError::Io(_) => Self::Critical,
            StatsError::Csv(err) => match err.kind() {
                ::csv::ErrorKind::Io(_) => Self::Critical,
                _ => Self::Error,
            },
            StatsError::Polars(_)
            | StatsError::SchemaMismatch { .. }
            | StatsError::ColumnNotFound { .. } => Self::Error,
        }
    }
}

impl fmt::Display for LoadSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        })
    }
}

/// Context about a load attempt.
#[derive(Debug, Clone)]
pub struct LoadContext {
    /// The input path.
    pub path: PathBuf,
    /// Engine the table is loaded into.
    pub engine: EngineKind,
}

/// Stats reported on a successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    /// Rows after dropping entirely-empty ones.
    pub rows: usize,
    /// Columns in the header.
    pub columns: usize,
    /// Name of the encoding the text was decoded with.
    pub encoding: &'static str,
    /// `true` if undecodable bytes were replaced.
    pub lossy: bool,
}

/// Observer interface for load outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait LoadObserver: Send + Sync {
    /// Called when a load succeeds.
    fn on_success(&self, _ctx: &LoadContext, _stats: LoadStats) {}

    /// Called when a load fails.
    fn on_failure(&self, _ctx: &LoadContext, _severity: LoadSeverity, _error: &StatsError) {}

    /// Called when a load failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &LoadContext, severity: LoadSeverity, error: &StatsError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Several observers notified in insertion order.
///
/// ```
/// use std::sync::Arc;
/// use tabular_stats::ingestion::{ObserverSet, TracingObserver};
///
/// let observers = ObserverSet::new().with(Arc::new(TracingObserver));
/// assert_eq!(observers.len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn LoadObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `observer` after the ones already in the set.
    pub fn with(mut self, observer: Arc<dyn LoadObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverSet").field("len", &self.len()).finish()
    }
}

impl LoadObserver for ObserverSet {
    fn on_success(&self, ctx: &LoadContext, stats: LoadStats) {
        self.observers.iter().for_each(|o| o.on_success(ctx, stats));
    }

    fn on_failure(&self, ctx: &LoadContext, severity: LoadSeverity, error: &StatsError) {
        self.observers.iter().for_each(|o| o.on_failure(ctx, severity, error));
    }

    fn on_alert(&self, ctx: &LoadContext, severity: LoadSeverity, error: &StatsError) {
        self.observers.iter().for_each(|o| o.on_alert(ctx, severity, error));
    }
}

/// Emits load events as `tracing` events.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl LoadObserver for TracingObserver {
    fn on_success(&self, ctx: &LoadContext, stats: LoadStats) {
        tracing::info!(
            engine = ?ctx.engine,
            path = %ctx.path.display(),
            rows = stats.rows,
            columns = stats.columns,
            encoding = stats.encoding,
            "loaded input"
        );
        if stats.lossy {
            tracing::warn!(
                path = %ctx.path.display(),
                "input was not valid {}; undecodable bytes were replaced",
                stats.encoding
            );
        }
    }

    fn on_failure(&self, ctx: &LoadContext, severity: LoadSeverity, error: &StatsError) {
        tracing::error!(
            ?severity,
            engine = ?ctx.engine,
            path = %ctx.path.display(),
            %error,
            "load failed"
        );
    }

    fn on_alert(&self, ctx: &LoadContext, severity: LoadSeverity, error: &StatsError) {
        tracing::error!(
            alert = true,
            ?severity,
            engine = ?ctx.engine,
            path = %ctx.path.display(),
            %error,
            "load failed"
        );
    }
}

/// Appends one line per load event to an event log.
///
/// Lines look like:
///
/// ```text
/// 1760000000 loaded rows:data.csv encoding=windows-1252 (lossy) rows=120 columns=8
/// 1760000000 failed rows:missing.csv severity=critical error=io error: No such file or directory (os error 2)
/// 1760000000 ALERT rows:missing.csv severity=critical error=io error: No such file or directory (os error 2)
/// ```
///
/// Write failures are ignored; a load never fails because of its log.
#[derive(Debug)]
pub struct EventLogObserver {
    file: Mutex<File>,
}

impl EventLogObserver {
    /// Opens `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    fn write_event(&self, ctx: &LoadContext, event: &str, detail: fmt::Arguments<'_>) {
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(
                file,
                "{} {event} {}:{} {detail}",
                unix_ts(),
                ctx.engine,
                ctx.path.display()
            );
        }
    }
}

impl LoadObserver for EventLogObserver {
    fn on_success(&self, ctx: &LoadContext, stats: LoadStats) {
        let lossy = if stats.lossy { " (lossy)" } else { "" };
        self.write_event(
            ctx,
            "loaded",
            format_args!(
                "encoding={}{lossy} rows={} columns={}",
                stats.encoding, stats.rows, stats.columns
            ),
        );
    }

    fn on_failure(&self, ctx: &LoadContext, severity: LoadSeverity, error: &StatsError) {
        self.write_event(ctx, "failed", format_args!("severity={severity} error={error}"));
    }

    fn on_alert(&self, ctx: &LoadContext, severity: LoadSeverity, error: &StatsError) {
        self.write_event(ctx, "ALERT", format_args!("severity={severity} error={error}"));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
