#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fxo/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod processor;
pub mod specs;
pub mod stats;

pub use error::{DownloadError, Result};
pub use processor::{
    download, download_parallel, download_parallel_stream, validate_stem_pattern,
};
pub use specs::{DownloadResult, DownloadSpecs};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
