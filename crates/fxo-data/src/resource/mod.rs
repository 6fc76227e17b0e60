//! JSON:API resources and their data columns.

mod api_error;
mod entity;
mod filing;
mod lang;
mod validation_message;

pub use api_error::ApiError;
pub use entity::Entity;
pub use filing::Filing;
pub use lang::{LANG_CODE_TRANSFORM, correct_language_code, transform_language_code};
pub use validation_message::ValidationMessage;

use crate::options::TimeAccuracy;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::fmt;

/// A single value of a resource data column.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    /// Text value
    Text(String),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Real(f64),
    /// Calendar date
    Date(NaiveDate),
    /// Timezone-aware datetime
    DateTime(DateTime<FixedOffset>),
    /// List of strings
    List(Vec<String>),
}

impl DataValue {
    /// Text form used in databases and CSV files.
    ///
    /// Datetimes use `accuracy` and lists are joined with newlines.
    pub fn to_text(&self, accuracy: TimeAccuracy) -> String {
        match self {
            Self::DateTime(dt) => accuracy.format(dt),
            Self::List(items) => items.join("\n"),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Self::List(items) => f.write_str(&items.join("\n")),
        }
    }
}

impl From<String> for DataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for DataValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for DataValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<NaiveDate> for DataValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<DateTime<FixedOffset>> for DataValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self::DateTime(value)
    }
}

impl From<DateTime<Utc>> for DataValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::DateTime(value.fixed_offset())
    }
}

impl From<Vec<String>> for DataValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// A resource that can be flattened into a table row.
pub trait ApiResource {
    /// JSON:API type name
    const TYPE: &'static str;

    /// Table name used in exports
    const TABLE: &'static str;

    /// JSON:API `id`
    fn api_id(&self) -> &str;

    /// Time when the query returning this resource was started
    fn query_time(&self) -> DateTime<FixedOffset>;

    /// URL of the request returning this resource
    fn request_url(&self) -> &str;

    /// Every data attribute of the type, unordered.
    fn data_attributes() -> &'static [&'static str];

    /// Value of a data column, `None` for null or unknown columns.
    fn value(&self, column: &str) -> Option<DataValue>;

    /// Data columns in display order.
    fn columns() -> Vec<String> {
        order_columns(Self::data_attributes().iter().copied())
    }
}

/// Sort columns for display.
///
/// `api_id` comes first, then plain attributes, counts and sums,
/// derived calculation and duplicate fields, times, related ids, URLs,
/// local paths and hashes, and finally the request metadata.
pub fn order_columns<I, S>(columns: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut ranked: Vec<(u8, String)> = columns
        .into_iter()
        .map(Into::into)
        .map(|col| (column_rank(&col), col))
        .collect();
    ranked.sort();
    ranked.into_iter().map(|(_, col)| col).collect()
}

fn column_rank(col: &str) -> u8 {
    let mut rank = if col == "api_id" {
        0
    } else if col.ends_with("_time") {
        10
    } else if col.ends_with("_api_id") {
        20
    } else if col.ends_with("_url") {
        22
    } else {
        1
    };
    if col == "query_time" {
        rank = 40;
    }
    if col == "request_url" {
        rank = 41;
    }

    if col.ends_with("_count") {
        rank = 2;
    } else if col.ends_with("_path") {
        rank = 30;
    } else if col.ends_with("_sha256") {
        rank = 31;
    }

    if col.starts_with("calc_") {
        rank = if col.ends_with("_sum") { 2 } else { 3 };
    } else if col.starts_with("duplicate_") {
        rank = 4;
    }
    rank
}
