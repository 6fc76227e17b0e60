//! Request metadata attached to pages and resources.

use chrono::{DateTime, FixedOffset};

/// URL and query time of the request that returned a page.
///
/// All pages of one query share the same `query_time`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// Full URL of the request including query parameters
    pub url: String,
    /// Time when the query was started
    pub query_time: DateTime<FixedOffset>,
}

impl ApiRequest {
    /// Create request metadata.
    pub fn new(url: impl Into<String>, query_time: DateTime<FixedOffset>) -> Self {
        Self {
            url: url.into(),
            query_time,
        }
    }
}
