//! Summary CSV output.

use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::EngineKind;
use crate::error::StatsResult;
use crate::summary::SummaryRecord;

/// `<base_dir>/<prefix>_summaries/<prefix>_summary_<input stem>.csv`.
pub fn output_path(base_dir: impl AsRef<Path>, engine: EngineKind, input: impl AsRef<Path>) -> PathBuf {
    let prefix = engine.prefix();
    let stem = input
        .as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    base_dir
        .as_ref()
        .join(format!("{prefix}_summaries"))
        .join(format!("{prefix}_summary_{stem}.csv"))
}

/// Writes `records` to `path` as UTF-8 CSV, creating the parent directory.
///
/// The header is `group,column,count,unique,mean,min,max,std_dev,most_freq`. An empty slice writes
/// nothing and returns `Ok(None)`.
pub fn write_summary(records: &[SummaryRecord], path: impl AsRef<Path>) -> StatsResult<Option<PathBuf>> {
    let path = path.as_ref();
    if records.is_empty() {
        tracing::warn!(path = %path.display(), "no summary records; nothing written");
        return Ok(None);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path)?;
    for record in records {
        wtr.serialize(record.to_row())?;
    }
    wtr.flush()?;
    Ok(Some(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::{most_frequent, ColumnStats, NumericStats, FULL_DATASET_LABEL};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn tmp_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("tabular_stats_{tag}_{nanos}"))
    }

    #[test]
    fn output_path_uses_engine_prefix_and_stem() {
        let p = output_path("out", EngineKind::Rows, "data/people.csv");
        assert_eq!(p, Path::new("out/rows_summaries/rows_summary_people.csv"));
        let p = output_path("", EngineKind::Polars, "sales.v2.csv");
        assert_eq!(p, Path::new("polars_summaries/polars_summary_sales.v2.csv"));
    }

    #[test]
    fn writes_header_and_rows() {
        let dir = tmp_dir("write");
        let path = dir.join("nested").join("summary.csv");
        let records = vec![
            SummaryRecord {
                group: FULL_DATASET_LABEL.to_string(),
                column: "a".to_string(),
                count: 2,
                unique: 2,
                stats: ColumnStats::Numeric(NumericStats::from_integers(&[1, 2]).unwrap()),
            },
            SummaryRecord {
                group: "b=x, c=".to_string(),
                column: "b".to_string(),
                count: 1,
                unique: 1,
                stats: ColumnStats::Categorical(most_frequent(["x"])),
            },
        ];

        let written = write_summary(&records, &path).unwrap();
        assert_eq!(written.as_deref(), Some(path.as_path()));

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "group,column,count,unique,mean,min,max,std_dev,most_freq");
        assert_eq!(lines[1], "full_dataset,a,2,2,1.5,1,2,0.7071,NA");
        assert_eq!(lines[2], "\"b=x, c=\",b,1,1,NA,NA,NA,NA,x (1)");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_records_write_nothing() {
        let dir = tmp_dir("empty");
        let path = dir.join("summary.csv");
        assert_eq!(write_summary(&[], &path).unwrap(), None);
        assert!(!path.exists());
    }
}
