//! Error types for exports.

use fxo_data::FilingsError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, OutputError>;

/// Errors that can occur while exporting filings.
#[derive(Debug, Error)]
pub enum OutputError {
    /// Database file exists and updating was not requested
    #[error("Database file already exists: {}", path.display())]
    DatabaseFileExists {
        /// Database path
        path: PathBuf,
    },

    /// Database path is taken by something other than a file
    #[error("Database path is reserved by a non-file object: {}", path.display())]
    DatabasePathIsReserved {
        /// Database path
        path: PathBuf,
    },

    /// Existing database does not have the expected tables or columns
    #[error("Database schema does not match the expected tables: {}", path.display())]
    DatabaseSchemaUnmatch {
        /// Database path
        path: PathBuf,
    },

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// CSV serialization error
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// DataFrame construction error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Query or data access error
    #[error(transparent)]
    Filings(#[from] FilingsError),
}
