//! Table engines.
//!
//! An engine owns a table representation and implements the table-shaped steps of the pipeline
//! (loading decoded text, unpacking, summarizing) on it. The decisions those steps make are shared:
//! [`crate::infer`] types columns, [`crate::unpack`] plans expansions and [`crate::summary`] builds
//! the records, so every engine produces the same summary for the same input.
//!
//! - [`frame::PolarsEngine`]: Polars `DataFrame`.
//! - [`rows::RowEngine`]: the crate's own row-major [`crate::types::DataSet`].

use std::fmt;

use crate::error::StatsResult;
use crate::summary::SummaryRecord;

pub mod frame;
pub mod rows;

pub use frame::PolarsEngine;
pub use rows::RowEngine;

/// Which engine backs a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum EngineKind {
    /// Polars `DataFrame`.
    #[default]
    Polars,
    /// Row-major [`crate::types::DataSet`].
    Rows,
}

impl EngineKind {
    /// Prefix of the output directory and file names.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Polars => "polars",
            Self::Rows => "rows",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Table-shaped pipeline steps, implemented once per table representation.
pub trait SummaryEngine {
    /// In-memory table type.
    type Table;

    fn kind(&self) -> EngineKind;

    /// Parses decoded CSV text (header first) and normalizes it: blank cells are missing, rows
    /// with no values are dropped, numeric text columns become numeric.
    fn load_str(&self, text: &str) -> StatsResult<Self::Table>;

    fn row_count(&self, table: &Self::Table) -> usize;

    /// Column names in table order.
    fn column_names(&self, table: &Self::Table) -> Vec<String>;

    /// The first `n` rows.
    fn head(&self, table: &Self::Table, n: usize) -> Self::Table;

    /// Columns whose first `sample_size` non-missing cells include a nested mapping, in column
    /// order.
    fn detect_unpackable(&self, table: &Self::Table, sample_size: usize) -> StatsResult<Vec<String>>;

    /// Expands `column` into one row per outer key, adding `<prefix>_key` and `<prefix>_<field>`
    /// columns and removing `column`.
    fn unpack(&self, table: &Self::Table, column: &str, prefix: &str) -> StatsResult<Self::Table>;

    /// One record per column, in column order, all labelled `group_label`.
    fn summarize_table(&self, table: &Self::Table, group_label: &str) -> StatsResult<Vec<SummaryRecord>>;

    /// [`Self::summarize_table`] for every group of rows sharing the values of `group_columns`.
    ///
    /// Groups appear in order of first occurrence; missing key values form their own group.
    /// Empty `group_columns` yields no records. A group column that is not in the table is
    /// [`crate::StatsError::ColumnNotFound`].
    fn summarize_grouped(
        &self,
        table: &Self::Table,
        group_columns: &[String],
    ) -> StatsResult<Vec<SummaryRecord>>;
}
