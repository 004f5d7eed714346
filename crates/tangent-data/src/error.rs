//! Error types for price ingestion and preprocessing.

use tangent_portfolio::PortfolioError;
use thiserror::Error;

/// Result type for data operations.
pub type DataResult<T> = Result<T, DataError>;

/// Errors raised while loading prices or deriving return series.
#[derive(Error, Debug, Clone)]
pub enum DataError {
    /// File could not be opened or read.
    #[error("io error: {0}")]
    IoError(String),

    /// Malformed CSV structure.
    #[error("csv error: {0}")]
    CsvError(String),

    /// A cell could not be parsed.
    #[error("parse error at line {line}, column '{column}': {reason}")]
    ParseError {
        /// 1-based line in the source, header included.
        line: u64,
        /// Column header.
        column: String,
        /// What went wrong.
        reason: String,
    },

    /// A required column is absent.
    #[error("missing column: {0}")]
    MissingColumn(String),

    /// Rolling window of zero periods.
    #[error("rolling window must be at least 1, got {0}")]
    InvalidWindow(usize),

    /// Structural problem with a price table.
    #[error("invalid price table: {0}")]
    InvalidTable(String),

    /// Failure building portfolio types.
    #[error(transparent)]
    Portfolio(#[from] PortfolioError),
}

impl From<csv::Error> for DataError {
    fn from(err: csv::Error) -> Self {
        Self::CsvError(err.to_string())
    }
}
