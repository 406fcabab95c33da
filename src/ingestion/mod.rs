//! Loading CSV input into an engine's table.
//!
//! Most callers should use [`load_from_path`], which:
//!
//! - reads the whole file and decodes it with the detected encoding (see [`encoding`])
//! - parses and normalizes it with the chosen [`crate::engine::SummaryEngine`]
//! - optionally reports success/failure/alerts to a [`LoadObserver`]
//!
//! The row engine's CSV parser lives in [`csv`].

pub mod csv;
pub mod encoding;
pub mod observability;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::engine::SummaryEngine;
use crate::error::{StatsError, StatsResult};

pub use encoding::{decode, detect_encoding, DecodedText};
pub use observability::{
    EventLogObserver, LoadContext, LoadObserver, LoadSeverity, LoadStats, ObserverSet, TracingObserver,
};

/// Options controlling [`load_from_path`].
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct LoadOptions {
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn LoadObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: LoadSeverity,
}

impl fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadOptions")
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            observer: None,
            alert_at_or_above: LoadSeverity::Critical,
        }
    }
}

/// Reads the file at `path` and decodes it. Only I/O errors fail; undecodable bytes are replaced.
pub fn read_decoded(path: impl AsRef<Path>) -> StatsResult<DecodedText> {
    let bytes = std::fs::read(path.as_ref())?;
    Ok(decode(&bytes))
}

/// Loads the CSV file at `path` into `engine`'s table.
///
/// When an observer is configured, this function reports:
///
/// - `on_success` on success, with row/column counts and the encoding used
/// - `on_failure` on failure, with a computed severity
/// - `on_alert` on failure when the computed severity is >= `options.alert_at_or_above`
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use tabular_stats::engine::RowEngine;
/// use tabular_stats::ingestion::{load_from_path, LoadOptions, LoadSeverity, TracingObserver};
///
/// # fn main() -> Result<(), tabular_stats::StatsError> {
/// let opts = LoadOptions {
///     observer: Some(Arc::new(TracingObserver)),
///     alert_at_or_above: LoadSeverity::Critical,
/// };
/// let (ds, stats) = load_from_path(&RowEngine, "data.csv", &opts)?;
/// println!("rows={} encoding={}", ds.row_count(), stats.encoding);
/// # Ok(())
/// # }
/// ```
pub fn load_from_path<E: SummaryEngine>(
    engine: &E,
    path: impl AsRef<Path>,
    options: &LoadOptions,
) -> StatsResult<(E::Table, LoadStats)> {
    let path = path.as_ref();
    let ctx = LoadContext {
        path: path.to_path_buf(),
        engine: engine.kind(),
    };

    let result = load(engine, path);

    if let Some(obs) = options.observer.as_ref() {
        match &result {
            Ok((_, stats)) => obs.on_success(&ctx, *stats),
            Err(e) => report_failure(obs.as_ref(), &ctx, options.alert_at_or_above, e),
        }
    }

    result
}

fn load<E: SummaryEngine>(engine: &E, path: &Path) -> StatsResult<(E::Table, LoadStats)> {
    let decoded = read_decoded(path)?;
    let table = engine.load_str(&decoded.text)?;
    let stats = LoadStats {
        rows: engine.row_count(&table),
        columns: engine.column_names(&table).len(),
        encoding: decoded.encoding.name(),
        lossy: decoded.lossy,
    };
    Ok((table, stats))
}

fn report_failure(obs: &dyn LoadObserver, ctx: &LoadContext, threshold: LoadSeverity, e: &StatsError) {
    let sev = LoadSeverity::for_error(e);
    obs.on_failure(ctx, sev, e);
    if sev >= threshold {
        obs.on_alert(ctx, sev, e);
    }
}
