//! Row engine over [`DataSet`].

use std::collections::HashSet;

use crate::error::{StatsError, StatsResult};
use crate::ingestion::csv::dataset_from_csv_str;
use crate::summary::{
    count_distinct_integers, count_distinct_numbers, group_label, most_frequent, ColumnStats,
    NumericStats, SummaryRecord,
};
use crate::types::{DataSet, Schema, Value};
use crate::unpack::{generated_column, plan_unpack, samples_qualify};

use super::{EngineKind, SummaryEngine};

/// Engine working on the crate's own row-major [`DataSet`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RowEngine;

impl SummaryEngine for RowEngine {
    type Table = DataSet;

    fn kind(&self) -> EngineKind {
        EngineKind::Rows
    }

    fn load_str(&self, text: &str) -> StatsResult<DataSet> {
        let mut ds = dataset_from_csv_str(text)?;
        ds.infer_types();
        Ok(ds)
    }

    fn row_count(&self, table: &DataSet) -> usize {
        table.row_count()
    }

    fn column_names(&self, table: &DataSet) -> Vec<String> {
        table.schema.field_names().map(str::to_owned).collect()
    }

    fn head(&self, table: &DataSet, n: usize) -> DataSet {
        table.head(n)
    }

    fn detect_unpackable(&self, table: &DataSet, sample_size: usize) -> StatsResult<Vec<String>> {
        Ok(table
            .schema
            .fields
            .iter()
            .enumerate()
            .filter(|(idx, _)| samples_qualify(table.column(*idx).map(text_cell), sample_size))
            .map(|(_, f)| f.name.clone())
            .collect())
    }

    fn unpack(&self, table: &DataSet, column: &str, prefix: &str) -> StatsResult<DataSet> {
        let source_idx = column_index(table, column)?;
        let plan = plan_unpack(table.column(source_idx).map(text_cell), prefix);

        let kept: Vec<usize> = (0..table.column_count()).filter(|&i| i != source_idx).collect();
        let schema = Schema::new(kept.iter().map(|&i| table.schema.fields[i].clone()).collect());
        let rows = plan
            .sources
            .iter()
            .map(|&src| {
                kept.iter()
                    .map(|&i| table.rows[src].get(i).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        let mut out = DataSet::new(schema, rows);

        for name in &plan.columns {
            match out.schema.index_of(name) {
                Some(idx) => {
                    let existing: Vec<Option<String>> =
                        table.column(column_index(table, name)?).map(Value::text).collect();
                    out.replace_column(idx, generated_column(&plan, name, Some(&existing)));
                }
                None => out.push_column(name.clone(), generated_column(&plan, name, None)),
            }
        }
        Ok(out)
    }

    fn summarize_table(&self, table: &DataSet, group_label: &str) -> StatsResult<Vec<SummaryRecord>> {
        Ok(table
            .schema
            .fields
            .iter()
            .enumerate()
            .map(|(idx, field)| summarize_column(table.column(idx), group_label, &field.name))
            .collect())
    }

    fn summarize_grouped(
        &self,
        table: &DataSet,
        group_columns: &[String],
    ) -> StatsResult<Vec<SummaryRecord>> {
        if group_columns.is_empty() {
            return Ok(Vec::new());
        }
        let key_idxs = group_columns
            .iter()
            .map(|name| column_index(table, name))
            .collect::<StatsResult<Vec<_>>>()?;

        let mut records = Vec::new();
        for (key, rows) in table.partition_by(&key_idxs) {
            let values: Vec<String> = key.iter().map(Value::to_string).collect();
            let label = group_label(group_columns, &values);
            records.extend(self.summarize_table(&table.take_rows(&rows), &label)?);
        }
        Ok(records)
    }
}

/// Summarizes one column's cells.
///
/// The column is numeric when it has at least one value and every value reads as a number.
/// Integer columns keep exact bounds and distinct counts.
pub fn summarize_column<'a, I>(cells: I, group: &str, column: &str) -> SummaryRecord
where
    I: IntoIterator<Item = &'a Value>,
{
    let present: Vec<&Value> = cells.into_iter().filter(|v| !v.is_missing()).collect();
    let integers: Option<Vec<i64>> = present.iter().map(|v| v.as_integer()).collect();

    let numeric = match integers {
        Some(ints) => NumericStats::from_integers(&ints)
            .map(|stats| (count_distinct_integers(&ints), stats)),
        None => present
            .iter()
            .map(|v| v.as_number())
            .collect::<Option<Vec<f64>>>()
            .and_then(|numbers| {
                NumericStats::from_values(&numbers)
                    .map(|stats| (count_distinct_numbers(&numbers), stats))
            }),
    };
    let (unique, stats) = match numeric {
        Some((unique, stats)) => (unique, ColumnStats::Numeric(stats)),
        None => {
            let texts: Vec<String> = present.iter().map(|v| v.to_string()).collect();
            let unique = texts.iter().collect::<HashSet<_>>().len();
            (unique, ColumnStats::Categorical(most_frequent(&texts)))
        }
    };

    SummaryRecord {
        group: group.to_string(),
        column: column.to_string(),
        count: present.len(),
        unique,
        stats,
    }
}

fn text_cell(value: &Value) -> Option<&str> {
    match value {
        Value::Utf8(s) if !s.trim().is_empty() => Some(s.as_str()),
        _ => None,
    }
}

fn column_index(table: &DataSet, name: &str) -> StatsResult<usize> {
    table
        .schema
        .index_of(name)
        .ok_or_else(|| StatsError::ColumnNotFound {
            name: name.to_string(),
        })
}
