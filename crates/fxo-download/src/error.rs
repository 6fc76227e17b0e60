//! Error types for downloads.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for download operations.
pub type Result<T> = std::result::Result<T, DownloadError>;

/// Errors that can occur while downloading a file.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("HTTP status {status} for {url}")]
    HttpStatus {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// SHA-256 hash of the downloaded file does not match the expected one
    #[error("Corrupt download from {url}: expected {expected_hash}, got {calculated_hash}")]
    CorruptDownload {
        /// Path where the corrupt file was left
        path: PathBuf,
        /// URL the file was downloaded from
        url: String,
        /// Hash of the received bytes in lowercase hex
        calculated_hash: String,
        /// Expected hash in lowercase hex
        expected_hash: String,
    },

    /// Stem pattern lacks the `/name/` placeholder
    #[error("Placeholder '/name/' missing in stem pattern {0:?}")]
    InvalidStemPattern(String),

    /// URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}
