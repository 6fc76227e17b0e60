#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fxo/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod client;
pub mod debug;
pub mod download;
pub mod error;
pub mod filing_set;
pub mod json_tree;
pub mod options;
pub mod page;
pub mod query;
pub mod request;
pub mod resource;
pub mod resource_collection;
pub mod scope;
pub mod stats;

pub use client::FilingsClient;
pub use download::{DownloadInfo, DownloadItem, DownloadOptions, FileKind, Files};
pub use error::{FilingsError, Result};
pub use filing_set::FilingSet;
pub use options::{Options, TimeAccuracy, YearFilterMonths};
pub use page::FilingsPage;
pub use query::{FilterValue, Filters, NO_LIMIT, Query};
pub use request::ApiRequest;
pub use resource::{
    ApiError, ApiResource, DataValue, Entity, Filing, ValidationMessage, order_columns,
};
pub use resource_collection::{ColumnData, ResourceCollection};
pub use scope::ScopeFlags;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
