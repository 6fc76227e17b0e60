#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fxo/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod export;
pub mod sqlite;
pub mod views;

pub use error::{OutputError, Result};
pub use export::{save_csv, to_dataframe, write_csv};
pub use sqlite::{
    SqliteExportOptions, SqliteExporter, TableSchema, filing_set_to_sqlite, pages_to_sqlite,
};
pub use views::{SqliteView, default_views};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
