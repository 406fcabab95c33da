use thiserror::Error;

/// Convenience result type used across loading, unpacking, summarizing and writing.
pub type StatsResult<T> = Result<T, StatsError>;

/// Error type returned by the pipeline and both engines.
///
/// Recoverable conditions (malformed nested literals, undecodable bytes) never surface here; they
/// are absorbed where they happen. Everything in this enum is fatal for the run except
/// [`StatsError::ColumnNotFound`] raised while grouping, which the pipeline downgrades to a warning.
#[derive(Debug, Error)]
pub enum StatsError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Structural CSV error (ragged rows, unreadable header) or CSV write failure.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Error raised by the Polars engine.
    #[error("polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// The input does not have a usable shape (duplicate headers, empty header row, etc.).
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A requested column (e.g. a group key) is not present in the table.
    #[error("column '{name}' not found")]
    ColumnNotFound { name: String },
}
