//! Polars engine over [`DataFrame`].
//!
//! CSV text is read with every column as `String` and then normalized with the shared inference
//! rules, so the frame's dtypes line up with the row engine's value types: `Int64`, `Float64`,
//! `Boolean` (unpacked columns only) and `String`.

use std::collections::HashSet;
use std::io::Cursor;

use polars::prelude::*;

use crate::error::{StatsError, StatsResult};
use crate::infer::{infer_text_column, InferredColumn};
use crate::ingestion::csv::checked_header_names;
use crate::literal::python_float_repr;
use crate::summary::{
    count_distinct_integers, count_distinct_numbers, group_label, most_frequent, Bound,
    ColumnStats, NumericStats, SummaryRecord,
};
use crate::unpack::{generated_column, plan_unpack, samples_qualify, UnpackPlan};

use super::{EngineKind, SummaryEngine};

/// Engine working on a Polars [`DataFrame`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PolarsEngine;

/// Reads decoded CSV text into a normalized [`DataFrame`].
///
/// Headers must be present and unique and every record must have one field per header, as in the
/// row engine. Cells are trimmed, blank cells become null, rows with no
/// values are dropped and numeric text columns become `Int64`/`Float64`.
pub fn frame_from_csv_str(text: &str) -> StatsResult<DataFrame> {
    let names = checked_header_names(text)?;
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(text.as_bytes().to_vec()))
        .finish()?;
    if df.width() != names.len() {
        return Err(StatsError::SchemaMismatch {
            message: format!("expected {} columns, read {}", names.len(), df.width()),
        });
    }
    normalize(df)
}

fn normalize(mut df: DataFrame) -> StatsResult<DataFrame> {
    let names = column_names(&df);
    let mut columns = Vec::with_capacity(names.len());
    for name in &names {
        columns.push(infer_text_column(text_cells(df.column(name)?.as_materialized_series())?));
    }

    let keep: Vec<bool> = (0..df.height())
        .map(|row| columns.iter().any(|c| c.is_present(row)))
        .collect();
    for (name, column) in names.iter().zip(columns) {
        df.with_column(column_from(name, column))?;
    }

    if keep.iter().all(|&k| k) {
        return Ok(df);
    }
    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    Ok(df.filter(&mask)?)
}

/// Display text of a cell, matching the row engine's rendering. `None` for null.
pub fn any_value_text(value: &AnyValue<'_>) -> Option<String> {
    match value {
        AnyValue::Null => None,
        AnyValue::String(s) => Some((*s).to_string()),
        AnyValue::StringOwned(s) => Some(s.to_string()),
        AnyValue::Boolean(b) => Some(b.to_string()),
        AnyValue::Int64(v) => Some(v.to_string()),
        AnyValue::Float64(v) => Some(python_float_repr(*v)),
        other => Some(other.to_string()),
    }
}

fn text_cells(s: &Series) -> StatsResult<Vec<Option<String>>> {
    (0..s.len())
        .map(|i| -> StatsResult<Option<String>> { Ok(any_value_text(&s.get(i)?)) })
        .collect()
}

fn column_from(name: &str, column: InferredColumn) -> Column {
    let series = match column {
        InferredColumn::Int64(cells) => Series::new(name.into(), cells),
        InferredColumn::Float64(cells) => Series::new(name.into(), cells),
        InferredColumn::Bool(cells) => Series::new(name.into(), cells),
        InferredColumn::Utf8(cells) => Series::new(name.into(), cells),
    };
    series.into_column()
}

fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|n| n.to_string()).collect()
}

fn require_column(df: &DataFrame, name: &str) -> StatsResult<()> {
    match df.get_column_index(name) {
        Some(_) => Ok(()),
        None => Err(StatsError::ColumnNotFound {
            name: name.to_string(),
        }),
    }
}

fn plan_for(s: &Series, prefix: &str) -> StatsResult<UnpackPlan> {
    if s.dtype() == &DataType::String {
        Ok(plan_unpack(s.str()?.into_iter(), prefix))
    } else {
        Ok(plan_unpack(std::iter::repeat_n(None::<&str>, s.len()), prefix))
    }
}

impl SummaryEngine for PolarsEngine {
    type Table = DataFrame;

    fn kind(&self) -> EngineKind {
        EngineKind::Polars
    }

    fn load_str(&self, text: &str) -> StatsResult<DataFrame> {
        frame_from_csv_str(text)
    }

    fn row_count(&self, table: &DataFrame) -> usize {
        table.height()
    }

    fn column_names(&self, table: &DataFrame) -> Vec<String> {
        column_names(table)
    }

    fn head(&self, table: &DataFrame, n: usize) -> DataFrame {
        table.head(Some(n))
    }

    fn detect_unpackable(&self, table: &DataFrame, sample_size: usize) -> StatsResult<Vec<String>> {
        let mut found = Vec::new();
        for name in column_names(table) {
            let s = table.column(&name)?.as_materialized_series();
            if s.dtype() == &DataType::String && samples_qualify(s.str()?.into_iter(), sample_size) {
                found.push(name);
            }
        }
        Ok(found)
    }

    fn unpack(&self, table: &DataFrame, column: &str, prefix: &str) -> StatsResult<DataFrame> {
        require_column(table, column)?;
        let plan = plan_for(table.column(column)?.as_materialized_series(), prefix)?;

        let sources: Vec<IdxSize> = plan.sources.iter().map(|&i| i as IdxSize).collect();
        let idx = IdxCa::from_vec("idx".into(), sources);
        let mut out = table.take(&idx)?.drop(column)?;

        for name in &plan.columns {
            let existing = match out.get_column_index(name) {
                Some(_) => Some(text_cells(table.column(name)?.as_materialized_series())?),
                None => None,
            };
            out.with_column(column_from(name, generated_column(&plan, name, existing.as_deref())))?;
        }
        Ok(out)
    }

    fn summarize_table(&self, table: &DataFrame, group_label: &str) -> StatsResult<Vec<SummaryRecord>> {
        column_names(table)
            .iter()
            .map(|name| -> StatsResult<SummaryRecord> {
                summarize_series(table.column(name)?.as_materialized_series(), group_label)
            })
            .collect()
    }

    fn summarize_grouped(
        &self,
        table: &DataFrame,
        group_columns: &[String],
    ) -> StatsResult<Vec<SummaryRecord>> {
        if group_columns.is_empty() {
            return Ok(Vec::new());
        }
        for name in group_columns {
            require_column(table, name)?;
        }

        let mut records = Vec::new();
        for part in table.partition_by_stable(group_columns.iter().cloned(), true)? {
            let mut values = Vec::with_capacity(group_columns.len());
            for name in group_columns {
                let first = part.column(name)?.as_materialized_series().get(0)?;
                values.push(any_value_text(&first).unwrap_or_default());
            }
            let label = group_label(group_columns, &values);
            records.extend(self.summarize_table(&part, &label)?);
        }
        Ok(records)
    }
}

/// Summarizes one column of a normalized frame.
///
/// `Int64` and `Float64` columns with at least one value are numeric, with exact bounds and
/// distinct counts for `Int64`; everything else is categorical over the cells' text.
pub fn summarize_series(s: &Series, group: &str) -> StatsResult<SummaryRecord> {
    let count = s.len() - s.null_count();

    let (unique, stats) = match s.dtype() {
        DataType::Int64 if count > 0 => {
            let ints: Vec<i64> = s.i64()?.into_iter().flatten().collect();
            let stats = NumericStats::from_integers(&ints)
                .map_or(ColumnStats::Categorical(None), ColumnStats::Numeric);
            (count_distinct_integers(&ints), stats)
        }
        DataType::Float64 if count > 0 => {
            let ca = s.f64()?;
            let numbers: Vec<f64> = ca.into_iter().flatten().collect();
            let stats = match (ca.mean(), ca.min(), ca.max()) {
                (Some(mean), Some(min), Some(max)) => {
                    let std_dev = ca.std(1).filter(|_| count > 1);
                    ColumnStats::Numeric(NumericStats::rounded(
                        mean,
                        Bound::Float(min),
                        Bound::Float(max),
                        std_dev,
                    ))
                }
                _ => ColumnStats::Categorical(None),
            };
            (count_distinct_numbers(&numbers), stats)
        }
        _ => {
            let text = s.cast(&DataType::String)?;
            let values: Vec<&str> = text.str()?.into_iter().flatten().collect();
            let unique = values.iter().collect::<HashSet<_>>().len();
            (unique, ColumnStats::Categorical(most_frequent(&values)))
        }
    };

    Ok(SummaryRecord {
        group: group.to_string(),
        column: s.name().to_string(),
        count,
        unique,
        stats,
    })
}
