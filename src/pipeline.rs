//! End-to-end run: load, unpack, summarize, write.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::engine::{EngineKind, PolarsEngine, RowEngine, SummaryEngine};
use crate::error::{StatsError, StatsResult};
use crate::ingestion::{load_from_path, LoadOptions, LoadStats};
use crate::output::{output_path, write_summary};
use crate::summary::{SummaryRecord, FULL_DATASET_LABEL};
use crate::unpack::{column_prefix, DEFAULT_SAMPLE_SIZE};

/// Options controlling [`run`].
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct PipelineOptions {
    /// Engine backing the run.
    pub engine: EngineKind,
    /// Columns to group by. Empty means whole-table summary only.
    pub group_by: Vec<String>,
    /// Non-missing cells inspected per column when looking for nested mappings.
    pub sample_size: usize,
    /// Unpack detected nested-mapping columns before summarizing.
    pub unpack: bool,
    /// Keep only the first `n` loaded rows.
    pub row_limit: Option<usize>,
    /// Directory under which `<prefix>_summaries/` is created.
    pub output_dir: PathBuf,
    /// Loader options (observer, alert threshold).
    pub load: LoadOptions,
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("engine", &self.engine)
            .field("group_by", &self.group_by)
            .field("sample_size", &self.sample_size)
            .field("unpack", &self.unpack)
            .field("row_limit", &self.row_limit)
            .field("output_dir", &self.output_dir)
            .field("load", &self.load)
            .finish()
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            group_by: Vec::new(),
            sample_size: DEFAULT_SAMPLE_SIZE,
            unpack: true,
            row_limit: None,
            output_dir: PathBuf::from("."),
            load: LoadOptions::default(),
        }
    }
}

/// Outcome of a [`run`].
#[derive(Debug)]
pub struct RunReport {
    /// File written, or `None` when there was nothing to write.
    pub output: Option<PathBuf>,
    /// Whole-table records followed by grouped records.
    pub records: Vec<SummaryRecord>,
    /// Loader stats.
    pub load: LoadStats,
    /// Rows summarized (after truncation and unpacking).
    pub rows: usize,
    /// Columns that were unpacked, in order.
    pub unpacked: Vec<String>,
    /// Why grouped summaries are missing, if grouping was requested and failed.
    pub grouping_error: Option<StatsError>,
    pub elapsed: Duration,
}

/// Runs the whole pipeline on the CSV file at `path` with the engine chosen in `options`.
///
/// Fatal errors (I/O, malformed CSV, duplicate headers, output failures) are returned. A failed
/// grouping is logged, recorded in [`RunReport::grouping_error`] and the whole-table summary is
/// still written.
///
/// # Examples
///
/// ```no_run
/// use tabular_stats::engine::EngineKind;
/// use tabular_stats::pipeline::{run, PipelineOptions};
///
/// # fn main() -> Result<(), tabular_stats::StatsError> {
/// let opts = PipelineOptions {
///     engine: EngineKind::Rows,
///     group_by: vec!["region".to_string()],
///     ..Default::default()
/// };
/// let report = run("sales.csv", &opts)?;
/// if let Some(path) = report.output {
///     println!("Summary saved to {}", path.display());
/// }
/// # Ok(())
/// # }
/// ```
pub fn run(path: impl AsRef<Path>, options: &PipelineOptions) -> StatsResult<RunReport> {
    match options.engine {
        EngineKind::Polars => run_with(&PolarsEngine, path.as_ref(), options),
        EngineKind::Rows => run_with(&RowEngine, path.as_ref(), options),
    }
}

/// [`run`] with an explicit engine; `options.engine` is ignored.
pub fn run_with<E: SummaryEngine>(
    engine: &E,
    path: &Path,
    options: &PipelineOptions,
) -> StatsResult<RunReport> {
    let start = Instant::now();

    tracing::info!(engine = %engine.kind(), path = %path.display(), "loading data");
    let (mut table, load) = load_from_path(engine, path, &options.load)?;
    if engine.row_count(&table) == 0 {
        tracing::warn!(path = %path.display(), "no data rows loaded");
    }

    if let Some(n) = options.row_limit {
        table = engine.head(&table, n);
        tracing::info!(rows = engine.row_count(&table), "limited input to first {n} rows");
    }

    let unpacked = if options.unpack {
        tracing::info!("detecting unpackable columns");
        let (out, columns) = unpack_all(engine, table, options.sample_size)?;
        table = out;
        columns
    } else {
        Vec::new()
    };

    tracing::info!("summarizing");
    let (records, grouping_error) = summarize(engine, &table, &options.group_by)?;

    let target = output_path(&options.output_dir, engine.kind(), path);
    let output = write_summary(&records, &target)?;

    Ok(RunReport {
        output,
        records,
        load,
        rows: engine.row_count(&table),
        unpacked,
        grouping_error,
        elapsed: start.elapsed(),
    })
}

/// Detects nested-mapping columns on `table` and unpacks each in column order, using the column
/// name up to its first underscore as prefix.
pub fn unpack_all<E: SummaryEngine>(
    engine: &E,
    mut table: E::Table,
    sample_size: usize,
) -> StatsResult<(E::Table, Vec<String>)> {
    let columns = engine.detect_unpackable(&table, sample_size)?;
    for column in &columns {
        let prefix = column_prefix(column);
        tracing::info!(column = %column, prefix, "unpacking column");
        table = engine.unpack(&table, column, prefix)?;
    }
    Ok((table, columns))
}

/// Whole-table records followed by the grouped records for `group_by`.
///
/// A grouping error is not fatal: it is logged and returned next to the whole-table records.
pub fn summarize<E: SummaryEngine>(
    engine: &E,
    table: &E::Table,
    group_by: &[String],
) -> StatsResult<(Vec<SummaryRecord>, Option<StatsError>)> {
    let mut records = engine.summarize_table(table, FULL_DATASET_LABEL)?;
    if group_by.is_empty() {
        return Ok((records, None));
    }

    match engine.summarize_grouped(table, group_by) {
        Ok(grouped) => {
            records.extend(grouped);
            Ok((records, None))
        }
        Err(e) => {
            tracing::warn!(error = %e, "grouping failed; writing whole-table summary only");
            Ok((records, Some(e)))
        }
    }
}

/// Splits a comma-separated list of column names, dropping blanks.
pub fn parse_group_keys(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_owned)
        .collect()
}
