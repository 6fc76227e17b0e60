//! Filings, the main resource of the API.

use super::lang::{correct_language_code, transform_language_code};
use super::{ApiResource, DataValue, Entity, ValidationMessage};
use crate::json_tree::JsonTree;
use crate::request::ApiRequest;
use crate::scope::ScopeFlags;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};
use tracing::warn;
use url::Url;

static DATE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4})-(0[1-9]|1[012])-(0[1-9]|[12]\d|3[01])\b").ok()
});

const DOWNLOAD_PATH_COLUMNS: [&str; 3] = [
    "json_download_path",
    "package_download_path",
    "xhtml_download_path",
];

/// An XBRL filing, usually an ESEF annual report.
///
/// `entity` and `validation_messages` are attached when the query asked
/// for them with [`ScopeFlags`].
#[derive(Debug, Clone, PartialEq)]
pub struct Filing {
    /// JSON:API `id`
    pub api_id: String,
    /// Two-letter country code of the filer
    pub country: Option<String>,
    /// Identifier of the filing in the filings.xbrl.org index
    pub filing_index: Option<String>,
    /// Language derived from the package or report file name
    pub language: Option<String>,
    /// End date of the last reporting period
    pub last_end_date: Option<NaiveDate>,
    /// Reporting date derived from the package file name
    pub reporting_date: Option<NaiveDate>,
    /// Number of validation errors
    pub error_count: Option<i64>,
    /// Number of calculation inconsistencies
    pub inconsistency_count: Option<i64>,
    /// Number of validation warnings
    pub warning_count: Option<i64>,
    /// Time the filing was added to the index
    pub added_time: Option<DateTime<Utc>>,
    /// `added_time` as sent by the API
    pub added_time_str: Option<String>,
    /// Time the filing was processed
    pub processed_time: Option<DateTime<Utc>>,
    /// `processed_time` as sent by the API
    pub processed_time_str: Option<String>,
    /// `api_id` of the filing entity
    pub entity_api_id: Option<String>,
    /// URL of the xBRL-JSON file
    pub json_url: Option<String>,
    /// URL of the report package
    pub package_url: Option<String>,
    /// URL of the inline XBRL viewer
    pub viewer_url: Option<String>,
    /// URL of the inline XBRL report
    pub xhtml_url: Option<String>,
    /// Local path of the downloaded xBRL-JSON file
    pub json_download_path: Option<PathBuf>,
    /// Local path of the downloaded report package
    pub package_download_path: Option<PathBuf>,
    /// Local path of the downloaded inline XBRL report
    pub xhtml_download_path: Option<PathBuf>,
    /// SHA-256 hash of the report package
    pub package_sha256: Option<String>,
    /// Entity of the filing
    pub entity: Option<Arc<Entity>>,
    /// Validation messages, `None` unless requested
    pub validation_messages: Option<Vec<Arc<ValidationMessage>>>,
    /// Start time of the query
    pub query_time: DateTime<FixedOffset>,
    /// URL of the request
    pub request_url: String,
    pub(crate) validation_message_ids: Vec<String>,
}

impl Filing {
    pub(crate) fn from_json(frag: &Value, request: &ApiRequest, entry_point: &Url) -> Option<Self> {
        let tree = JsonTree::new("Filing", frag, entry_point);
        let Some(api_id) = tree.get_str("id") else {
            warn!("Filing resource without id skipped");
            return None;
        };
        let validation_message_ids = tree
            .get_value("relationships.validation_messages.data")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| match item.get("id") {
                        Some(Value::String(id)) => Some(id.clone()),
                        Some(Value::Number(id)) => Some(id.to_string()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut filing = Self {
            api_id,
            country: tree.get_str("attributes.country"),
            filing_index: tree.get_str("attributes.fxo_id"),
            language: None,
            last_end_date: tree.get_date("attributes.period_end"),
            reporting_date: None,
            error_count: tree.get_i64("attributes.error_count"),
            inconsistency_count: tree.get_i64("attributes.inconsistency_count"),
            warning_count: tree.get_i64("attributes.warning_count"),
            added_time: tree.get_datetime("attributes.date_added"),
            added_time_str: tree.get_str("attributes.date_added"),
            processed_time: tree.get_datetime("attributes.processed"),
            processed_time_str: tree.get_str("attributes.processed"),
            entity_api_id: tree.get_str("relationships.entity.data.id"),
            json_url: tree.get_url("attributes.json_url"),
            package_url: tree.get_url("attributes.package_url"),
            viewer_url: tree.get_url("attributes.viewer_url"),
            xhtml_url: tree.get_url("attributes.report_url"),
            json_download_path: None,
            package_download_path: None,
            xhtml_download_path: None,
            package_sha256: tree.get_str("attributes.sha256"),
            entity: None,
            validation_messages: None,
            query_time: request.query_time,
            request_url: request.url.clone(),
            validation_message_ids,
        };
        tree.close();

        filing.language = correct_language_code(filing.derive_language(), filing.country.as_deref());
        filing.reporting_date = filing.derive_reporting_date();
        Some(filing)
    }

    /// Ids of the validation messages listed in the relationships.
    pub fn validation_message_ids(&self) -> &[String] {
        &self.validation_message_ids
    }

    /// Python-style representation used in log messages.
    ///
    /// `Filing(entity.name='Kesko Oyj', reporting_date=date(2022, 12, 31), language='fi')`
    /// when an entity is attached, `Filing(filing_index='...')` otherwise.
    pub fn repr(&self) -> String {
        match &self.entity {
            Some(entity) => format!(
                "Filing(entity.name={}, reporting_date={}, language={})",
                quoted(entity.name.as_deref()),
                self.reporting_date.map_or_else(
                    || "None".to_string(),
                    |d| format!("date({}, {}, {})", d.year(), d.month(), d.day())
                ),
                quoted(self.language.as_deref()),
            ),
            None => format!("Filing(filing_index={})", quoted(self.filing_index.as_deref())),
        }
    }

    /// Data columns for a group of filings.
    ///
    /// `entity_api_id` is left out unless entities were requested or
    /// attached, and download path columns unless some filing has one.
    pub fn columns_for<'a, I>(flags: ScopeFlags, filings: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a Self>,
    {
        let mut has_entity = flags.wants_entity();
        let mut used_paths = [false; 3];
        for filing in filings {
            has_entity |= filing.entity.is_some();
            used_paths[0] |= filing.json_download_path.is_some();
            used_paths[1] |= filing.package_download_path.is_some();
            used_paths[2] |= filing.xhtml_download_path.is_some();
        }
        let excluded: Vec<&str> = DOWNLOAD_PATH_COLUMNS
            .iter()
            .zip(used_paths)
            .filter(|(_, used)| !used)
            .map(|(col, _)| *col)
            .chain((!has_entity).then_some("entity_api_id"))
            .collect();
        Self::columns()
            .into_iter()
            .filter(|col| !excluded.contains(&col.as_str()))
            .collect()
    }

    /// Data columns of filings streamed page by page, without local paths.
    pub fn streamed_columns(flags: ScopeFlags) -> Vec<String> {
        Self::columns()
            .into_iter()
            .filter(|col| !DOWNLOAD_PATH_COLUMNS.contains(&col.as_str()))
            .filter(|col| flags.wants_entity() || col != "entity_api_id")
            .collect()
    }

    fn derive_language(&self) -> Option<String> {
        for url in [self.package_url.as_deref(), self.xhtml_url.as_deref()]
            .into_iter()
            .flatten()
        {
            let Some(stem) = url_stem(url) else {
                continue;
            };
            let stem = stem.replace('_', "-");
            let Some(part) = stem.rsplit('-').next() else {
                continue;
            };
            if part.is_empty() || !part.chars().all(char::is_alphabetic) {
                continue;
            }
            match part.chars().count() {
                2 => return Some(part.to_lowercase()),
                3 => {
                    if let Some(code) = transform_language_code(&part.to_lowercase()) {
                        return Some(code.to_string());
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn derive_reporting_date(&self) -> Option<NaiveDate> {
        let from_name = self
            .package_url
            .as_deref()
            .and_then(url_stem)
            .and_then(|stem| {
                let normalized: String = stem
                    .chars()
                    .map(|c| if c.is_ascii_digit() { c } else { '-' })
                    .collect();
                let caps = DATE_RE.as_ref()?.captures_iter(&normalized).last()?;
                let year = caps.get(1)?.as_str().parse().ok()?;
                let month = caps.get(2)?.as_str().parse().ok()?;
                let day = caps.get(3)?.as_str().parse().ok()?;
                NaiveDate::from_ymd_opt(year, month, day)
            });
        from_name.or(self.last_end_date)
    }
}

/// Stem of the last path segment of a URL, percent-decoded.
fn url_stem(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let path = urlencoding::decode(parsed.path()).ok()?;
    let name = path.trim_end_matches('/').rsplit('/').next()?;
    let stem = match name.rfind('.') {
        Some(pos) if pos > 0 => &name[..pos],
        _ => name,
    };
    (!stem.is_empty()).then(|| stem.to_string())
}

fn quoted(value: Option<&str>) -> String {
    value.map_or_else(|| "None".to_string(), |v| format!("'{v}'"))
}

fn simple_date(date: NaiveDate) -> String {
    let is_month_end = date.succ_opt().is_none_or(|next| next.month() != date.month());
    if date.month() == 12 && date.day() == 31 {
        date.year().to_string()
    } else if is_month_end {
        date.format("%b-%Y").to_string()
    } else {
        date.format("%Y-%m-%d").to_string()
    }
}

impl ApiResource for Filing {
    const TYPE: &'static str = "filing";
    const TABLE: &'static str = "Filing";

    fn api_id(&self) -> &str {
        &self.api_id
    }

    fn query_time(&self) -> DateTime<FixedOffset> {
        self.query_time
    }

    fn request_url(&self) -> &str {
        &self.request_url
    }

    fn data_attributes() -> &'static [&'static str] {
        &[
            "api_id",
            "country",
            "filing_index",
            "language",
            "last_end_date",
            "reporting_date",
            "error_count",
            "inconsistency_count",
            "warning_count",
            "added_time",
            "processed_time",
            "entity_api_id",
            "json_url",
            "package_url",
            "viewer_url",
            "xhtml_url",
            "json_download_path",
            "package_download_path",
            "xhtml_download_path",
            "package_sha256",
            "query_time",
            "request_url",
        ]
    }

    fn value(&self, column: &str) -> Option<DataValue> {
        let path = |p: &Option<PathBuf>| p.as_ref().map(|p| DataValue::Text(p.display().to_string()));
        match column {
            "api_id" => Some(self.api_id.clone().into()),
            "country" => self.country.clone().map(Into::into),
            "filing_index" => self.filing_index.clone().map(Into::into),
            "language" => self.language.clone().map(Into::into),
            "last_end_date" => self.last_end_date.map(Into::into),
            "reporting_date" => self.reporting_date.map(Into::into),
            "error_count" => self.error_count.map(Into::into),
            "inconsistency_count" => self.inconsistency_count.map(Into::into),
            "warning_count" => self.warning_count.map(Into::into),
            "added_time" => self.added_time.map(Into::into),
            "processed_time" => self.processed_time.map(Into::into),
            "entity_api_id" => self.entity_api_id.clone().map(Into::into),
            "json_url" => self.json_url.clone().map(Into::into),
            "package_url" => self.package_url.clone().map(Into::into),
            "viewer_url" => self.viewer_url.clone().map(Into::into),
            "xhtml_url" => self.xhtml_url.clone().map(Into::into),
            "json_download_path" => path(&self.json_download_path),
            "package_download_path" => path(&self.package_download_path),
            "xhtml_download_path" => path(&self.xhtml_download_path),
            "package_sha256" => self.package_sha256.clone().map(Into::into),
            "query_time" => Some(self.query_time.into()),
            "request_url" => Some(self.request_url.clone().into()),
            _ => None,
        }
    }
}

impl fmt::Display for Filing {
    /// `Kesko Oyj 2022 [fi]`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .entity
            .as_ref()
            .and_then(|e| e.name.clone())
            .or_else(|| self.filing_index.clone());
        let parts: Vec<String> = [
            name,
            self.reporting_date.map(simple_date),
            self.language.as_ref().map(|lang| format!("[{lang}]")),
        ]
        .into_iter()
        .flatten()
        .collect();
        f.write_str(&parts.join(" "))
    }
}
