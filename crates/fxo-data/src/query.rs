//! Query builder for the filings endpoint.
//!
//! A [`Query`] names filters, sorting, a size limit and the related
//! resources to include. [`Query::request_params`] turns it into one or
//! more sets of JSON:API request parameters. Filters with several values
//! (multifilters) cannot be expressed by the API, so every combination of
//! their values becomes its own parameter set.

use crate::error::{FilingsError, Result};
use crate::json_tree::parse_date;
use crate::options::{Options, YearMonth};
use crate::scope::ScopeFlags;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike, Utc};
use indexmap::IndexMap;
use tracing::warn;

/// Size limit that fetches every matching filing.
pub const NO_LIMIT: usize = 0;

/// Default number of filings fetched by a query.
pub const DEFAULT_MAX_SIZE: usize = 100;

/// A single filter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    /// Text, also `YYYY` and `YYYY-MM` for date attributes
    Text(String),
    /// Integer, a year for date attributes
    Integer(i64),
    /// Calendar date
    Date(NaiveDate),
    /// Datetime, sent in UTC
    DateTime(DateTime<Utc>),
}

impl FilterValue {
    /// Parameter value sent to the API.
    ///
    /// Datetimes are written as `YYYY-MM-DD HH:MM:SS` in UTC with
    /// microseconds appended only when they are non-zero.
    pub fn to_param(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::DateTime(dt) => {
                if dt.nanosecond() / 1_000 == 0 {
                    dt.format("%Y-%m-%d %H:%M:%S").to_string()
                } else {
                    dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
                }
            }
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<NaiveDate> for FilterValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::DateTime(value)
    }
}

impl From<DateTime<FixedOffset>> for FilterValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self::DateTime(value.with_timezone(&Utc))
    }
}

/// Filters by attribute name, in insertion order.
pub type Filters = IndexMap<String, Vec<FilterValue>>;

/// A filings query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Filters by library attribute name
    pub filters: Filters,
    /// Sort attributes, `-` prefix for descending
    pub sort: Vec<String>,
    /// Largest number of filings returned, [`NO_LIMIT`] for all
    pub max_size: usize,
    /// Related resources to include
    pub flags: ScopeFlags,
    /// Raw API parameters added last
    pub add_api_params: IndexMap<String, String>,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            filters: Filters::new(),
            sort: Vec::new(),
            max_size: DEFAULT_MAX_SIZE,
            flags: ScopeFlags::default(),
            add_api_params: IndexMap::new(),
        }
    }
}

impl Query {
    /// Query for the first 100 filings without related resources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter value. Repeating an attribute makes a multifilter.
    pub fn filter(mut self, attr: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.filters.entry(attr.into()).or_default().push(value.into());
        self
    }

    /// Add several values for one attribute.
    pub fn filter_any<I, V>(mut self, attr: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FilterValue>,
    {
        self.filters
            .entry(attr.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// Sort by an attribute. Prefix with `-` for descending order.
    pub fn sort(mut self, attr: impl Into<String>) -> Self {
        self.sort.push(attr.into());
        self
    }

    /// Limit the number of filings.
    pub const fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the related resources to include.
    pub const fn flags(mut self, flags: ScopeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Add a raw API parameter, overriding generated ones.
    pub fn api_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_api_params.insert(key.into(), value.into());
        self
    }

    /// Page size requested from the API.
    pub fn page_size(&self, options: &Options) -> usize {
        if self.max_size == NO_LIMIT {
            options.max_page_size
        } else {
            options.max_page_size.min(self.max_size)
        }
    }

    /// Parameter sets of the query, one per combination of multifilter
    /// values.
    ///
    /// # Errors
    /// Returns [`FilingsError::InvalidFilter`] for a filter without
    /// values or an impossible date, and [`FilingsError::InvalidOption`]
    /// for an invalid year filter window.
    pub fn request_params(&self, options: &Options) -> Result<Vec<Vec<(String, String)>>> {
        options.validate()?;
        let mut common = vec![("page[size]".to_string(), self.page_size(options).to_string())];
        if let Some(include) = self.flags.include_param() {
            common.push(("include".to_string(), include));
        }
        if !self.sort.is_empty() {
            let sort: Vec<String> = self.sort.iter().map(|s| api_sort_name(s)).collect();
            common.push(("sort".to_string(), sort.join(",")));
        }

        let mut multifilters = Vec::new();
        for (attr, values) in &self.filters {
            if is_derived_attribute(attr) {
                warn!("Filtering on derived attribute {attr:?} is not supported by the API");
            }
            let resolved = if attr.ends_with("_date") {
                let mut dates = Vec::new();
                for value in values {
                    dates.extend(resolve_date_value(attr, value, options)?);
                }
                dates
            } else {
                values.iter().map(FilterValue::to_param).collect()
            };
            let key = format!("filter[{}]", api_attribute_name(attr));
            match resolved.len() {
                0 => {
                    return Err(FilingsError::InvalidFilter(format!("filter {attr:?} has no values")));
                }
                1 => common.extend(resolved.into_iter().map(|value| (key.clone(), value))),
                _ => multifilters.push((key, resolved)),
            }
        }

        let mut sets = vec![common];
        for (key, values) in &multifilters {
            sets = sets
                .into_iter()
                .flat_map(|set| {
                    values.iter().map(move |value| {
                        let mut set = set.clone();
                        set.push((key.clone(), value.clone()));
                        set
                    })
                })
                .collect();
        }

        for set in &mut sets {
            for (key, value) in &self.add_api_params {
                set.retain(|(k, _)| k != key);
                set.push((key.clone(), value.clone()));
            }
        }
        Ok(sets)
    }
}

/// API name of a library attribute. Unknown names pass through.
pub fn api_attribute_name(attr: &str) -> String {
    if let Some(sub) = attr.strip_prefix("entity.") {
        let mapped = match sub {
            "api_id" => "id",
            other => other,
        };
        return format!("entity.{mapped}");
    }
    if let Some(sub) = attr.strip_prefix("validation_messages.") {
        let mapped = match sub {
            "api_id" => "id",
            "text" => "message",
            other => other,
        };
        return format!("validation_messages.{mapped}");
    }
    match attr {
        "api_id" => "id",
        "filing_index" => "fxo_id",
        "last_end_date" => "period_end",
        "added_time" => "date_added",
        "processed_time" => "processed",
        "xhtml_url" => "report_url",
        "package_sha256" => "sha256",
        other => other,
    }
    .to_string()
}

fn api_sort_name(attr: &str) -> String {
    match attr.strip_prefix('-') {
        Some(name) => format!("-{}", api_attribute_name(name)),
        None => api_attribute_name(attr),
    }
}

fn is_derived_attribute(attr: &str) -> bool {
    matches!(attr, "language" | "reporting_date" | "entity_api_id")
        || attr.ends_with("_download_path")
        || attr.ends_with("_time_str")
}

fn resolve_date_value(attr: &str, value: &FilterValue, options: &Options) -> Result<Vec<String>> {
    let invalid = || FilingsError::InvalidFilter(format!("{attr}={value:?} is not a year, month or date"));
    match value {
        FilterValue::Integer(year) => {
            let year = i32::try_from(*year).map_err(|_| invalid())?;
            year_month_ends(year, options)
        }
        FilterValue::Text(text) => {
            let text = text.trim();
            let is_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
            match text.split('-').collect::<Vec<_>>().as_slice() {
                [y] if y.len() == 4 && is_digits(y) => {
                    year_month_ends(y.parse().map_err(|_| invalid())?, options)
                }
                [y, m] if y.len() == 4 && is_digits(y) && is_digits(m) => {
                    let year = y.parse().map_err(|_| invalid())?;
                    let month = m.parse().map_err(|_| invalid())?;
                    let end = month_end(year, month).ok_or_else(invalid)?;
                    Ok(vec![end.format("%Y-%m-%d").to_string()])
                }
                [_, _, _] => {
                    let date = parse_date(text).ok_or_else(invalid)?;
                    Ok(vec![date.format("%Y-%m-%d").to_string()])
                }
                _ => Err(invalid()),
            }
        }
        other => Ok(vec![other.to_param()]),
    }
}

/// Month ends of the year filter window for `year`.
fn year_month_ends(year: i32, options: &Options) -> Result<Vec<String>> {
    let window = options.year_filter_months;
    let absolute = |ym: YearMonth| (year + ym.year_offset) * 12 + ym.month as i32 - 1;
    let (start, stop) = (absolute(window.start), absolute(window.stop));
    if stop <= start {
        return Err(FilingsError::InvalidOption(
            "year_filter_months stop is before or equal to start".to_string(),
        ));
    }
    (start..stop)
        .map(|index| {
            let (y, m) = (index.div_euclid(12), index.rem_euclid(12) as u32 + 1);
            month_end(y, m)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .ok_or_else(|| FilingsError::InvalidFilter(format!("no month end for {y}-{m:02}")))
        })
        .collect()
}

/// Last day of a month.
pub fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?
        .pred_opt()
        .filter(|d| d.month() == month)
}
