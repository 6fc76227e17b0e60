//! Download instructions and results.

use crate::error::{DownloadError, Result};
use std::path::{Path, PathBuf};

/// Instructions for downloading a single file.
///
/// `info` is carried through unchanged into the matching
/// [`DownloadResult`] so that callers can tie results back to their own
/// objects when downloads finish out of order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSpecs<T = ()> {
    /// URL to download
    pub url: String,
    /// Directory where the file is saved
    pub to_dir: PathBuf,
    /// Pattern for the file stem, must contain `/name/`
    pub stem_pattern: Option<String>,
    /// File name overriding the one derived from the URL
    pub filename: Option<String>,
    /// Expected SHA-256 hash as hex, case-insensitive
    pub sha256: Option<String>,
    /// Caller data returned with the result
    pub info: T,
}

impl DownloadSpecs<()> {
    /// Create download instructions for `url` saved into `to_dir`.
    pub fn new(url: impl Into<String>, to_dir: impl AsRef<Path>) -> Self {
        Self {
            url: url.into(),
            to_dir: to_dir.as_ref().to_path_buf(),
            stem_pattern: None,
            filename: None,
            sha256: None,
            info: (),
        }
    }
}

impl<T> DownloadSpecs<T> {
    /// Attach caller data to the instructions.
    pub fn with_info<U>(self, info: U) -> DownloadSpecs<U> {
        DownloadSpecs {
            url: self.url,
            to_dir: self.to_dir,
            stem_pattern: self.stem_pattern,
            filename: self.filename,
            sha256: self.sha256,
            info,
        }
    }

    /// Set the stem pattern, e.g. `"/name/_2023"`.
    pub fn with_stem_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.stem_pattern = Some(pattern.into());
        self
    }

    /// Set the file name explicitly.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Set the expected SHA-256 hash.
    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }
}

/// Outcome of one download in a parallel batch.
#[derive(Debug)]
pub struct DownloadResult<T = ()> {
    /// URL that was requested
    pub url: String,
    /// Saved path or the error that stopped the download
    pub result: Result<PathBuf>,
    /// Caller data from [`DownloadSpecs::info`]
    pub info: T,
}

impl<T> DownloadResult<T> {
    /// Path of the saved file when the download succeeded.
    pub fn path(&self) -> Option<&Path> {
        self.result.as_deref().ok()
    }

    /// Error when the download failed.
    pub fn err(&self) -> Option<&DownloadError> {
        self.result.as_ref().err()
    }
}
