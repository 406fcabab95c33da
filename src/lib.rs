//! `tabular-stats` computes descriptive statistics for a CSV file.
//!
//! A run loads the file (detecting its text encoding), flattens columns whose cells hold a nested
//! mapping such as `{'A': {'x': 1}, 'B': {'x': 3}}`, summarizes every column of the whole table and
//! optionally of every group of rows, and writes the summary as CSV.
//!
//! The primary entrypoint is [`pipeline::run`]. Two engines back the same steps and produce the
//! same summary for the same input:
//!
//! - [`engine::PolarsEngine`] (default) on a Polars `DataFrame`
//! - [`engine::RowEngine`] on the crate's own [`types::DataSet`]
//!
//! ## Quick example: summarize a file
//!
//! ```no_run
//! use tabular_stats::pipeline::{run, PipelineOptions};
//!
//! # fn main() -> Result<(), tabular_stats::StatsError> {
//! let opts = PipelineOptions {
//!     group_by: vec!["region".to_string()],
//!     ..Default::default()
//! };
//! // Writes ./polars_summaries/polars_summary_sales.csv
//! let report = run("sales.csv", &opts)?;
//! println!("records={} elapsed={:?}", report.records.len(), report.elapsed);
//! # Ok(())
//! # }
//! ```
//!
//! ## What a summary contains
//!
//! One record per (group, column) with `count` (non-missing cells) and `unique` (distinct values),
//! plus either numeric aggregates or the most frequent value:
//!
//! - **Numeric** columns (every non-missing cell is a number, `1,500` included): `mean` and
//!   `std_dev` (sample, N-1) rounded to 4 places, `min`, `max`. `std_dev` is `NA` below two values.
//! - **Categorical** columns: `most_freq` as `"<value> (<count>)"`, ties going to the value seen
//!   first.
//!
//! Statistics that do not apply are written as `NA`.
//!
//! ```rust
//! use tabular_stats::engine::{RowEngine, SummaryEngine};
//! use tabular_stats::summary::FULL_DATASET_LABEL;
//!
//! let table = RowEngine.load_str("a,b\n1,x\n2,x\n3,y\n").unwrap();
//! let records = RowEngine.summarize_table(&table, FULL_DATASET_LABEL).unwrap();
//!
//! let a = records[0].to_row();
//! assert_eq!((a.mean.as_str(), a.min.as_str(), a.max.as_str()), ("2.0", "1", "3"));
//! assert_eq!(records[1].to_row().most_freq, "x (2)");
//! ```
//!
//! ## Nested columns
//!
//! A column qualifies for unpacking when one of its first five non-missing cells parses (with
//! [`literal::parse`], a strict literal parser that never evaluates code) as a mapping whose values
//! are all mappings. Every outer entry becomes its own row with `<prefix>_key` and
//! `<prefix>_<field>` columns, where the prefix is the column name up to its first underscore.
//! Rows that cannot be expanded are kept once, without the new fields.
//!
//! ## Modules
//!
//! - [`pipeline`]: end-to-end runs and their options
//! - [`engine`]: the engine trait and its Polars and row implementations
//! - [`ingestion`]: file reading, encoding detection, CSV parsing and load observers
//! - [`unpack`] / [`literal`]: nested-column detection and expansion
//! - [`infer`]: column type inference shared by both engines
//! - [`summary`]: summary records and their text form
//! - [`output`]: output paths and the summary CSV writer
//! - [`types`]: the row engine's schema and dataset types
//! - [`error`]: error types

pub mod engine;
pub mod error;
pub mod infer;
pub mod ingestion;
pub mod literal;
pub mod output;
pub mod pipeline;
pub mod summary;
pub mod types;
pub mod unpack;

pub use error::{StatsError, StatsResult};
