//! Error types for filing queries.

use crate::resource::ApiError;
use fxo_download::DownloadError;
use thiserror::Error;

/// Result type for filing operations.
pub type Result<T> = std::result::Result<T, FilingsError>;

/// Errors that can occur while querying the filings API.
#[derive(Debug, Error)]
pub enum FilingsError {
    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The API returned a JSON:API `errors` array
    #[error("The filings API returned errors. Status {status} {status_text}: {}", join_errors(.errors))]
    Api {
        /// HTTP status code
        status: u16,
        /// HTTP reason phrase
        status_text: String,
        /// All errors of the response
        errors: Vec<ApiError>,
    },

    /// Non-success HTTP status without JSON:API errors
    #[error("HTTP status {status_code} {status_text}")]
    HttpStatus {
        /// HTTP status code
        status_code: u16,
        /// HTTP reason phrase
        status_text: String,
        /// Response body
        body: String,
    },

    /// Response body was not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filter could not be turned into query parameters
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Option value is out of range
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// Data attribute does not exist for the resource type
    #[error("Unknown attribute {attribute:?} for {table}")]
    UnknownAttribute {
        /// Table name of the resource type
        table: &'static str,
        /// Requested attribute name
        attribute: String,
    },

    /// First failed download of a filing
    #[error("Download failed: {0}")]
    Download(#[from] DownloadError),

    /// All failed downloads of a filing set
    #[error("{} downloads failed, first: {}", .0.len(), first_error(.0))]
    Downloads(Vec<DownloadError>),
}

fn join_errors(errors: &[ApiError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn first_error(errors: &[DownloadError]) -> String {
    errors.first().map(ToString::to_string).unwrap_or_default()
}
