#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fxo/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod api;

// Re-export main types from sub-crates
pub use fxo_data as data;
pub use fxo_download as download;
pub use fxo_output as output;

pub use api::{filing_page_iter, get_filings, to_sqlite};
pub use fxo_data::{
    DownloadOptions, Entity, FileKind, Files, Filing, FilingSet, FilingsClient, FilingsError,
    FilingsPage, NO_LIMIT, Options, Query, ScopeFlags, ValidationMessage,
};
pub use fxo_output::{OutputError, SqliteExportOptions};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
