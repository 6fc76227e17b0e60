//! Library options.
//!
//! [`Options`] holds the settings shared by queries, parsing and export.
//! Defaults match the public filings.xbrl.org service. [`Options::from_env`]
//! overlays `FXO_*` environment variables on the defaults.

use crate::error::{FilingsError, Result};
use chrono::{DateTime, FixedOffset, Local, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Entry point of the filings.xbrl.org JSON:API.
pub const DEFAULT_ENTRY_POINT_URL: &str = "https://filings.xbrl.org/api/filings";

/// Largest page size accepted by the API.
pub const DEFAULT_MAX_PAGE_SIZE: usize = 200;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SEC: u64 = 30;

/// User agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("fxo/", env!("CARGO_PKG_VERSION"));

/// Precision used when datetimes are written as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeAccuracy {
    /// `2023-05-09`
    Day,
    /// `2023-05-09 10:51`
    #[default]
    Min,
    /// `2023-05-09 10:51:50`
    Sec,
    /// `2023-05-09 10:51:50.382633`
    Max,
}

impl TimeAccuracy {
    /// chrono format string for this accuracy.
    pub const fn format_str(&self) -> &'static str {
        match self {
            Self::Day => "%Y-%m-%d",
            Self::Min => "%Y-%m-%d %H:%M",
            Self::Sec => "%Y-%m-%d %H:%M:%S",
            Self::Max => "%Y-%m-%d %H:%M:%S%.6f",
        }
    }

    /// Format a datetime in its own offset.
    pub fn format(&self, dt: &DateTime<FixedOffset>) -> String {
        dt.format(self.format_str()).to_string()
    }
}

impl FromStr for TimeAccuracy {
    type Err = FilingsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "min" => Ok(Self::Min),
            "sec" => Ok(Self::Sec),
            "max" => Ok(Self::Max),
            other => Err(FilingsError::InvalidOption(format!(
                "time accuracy must be one of day, min, sec, max, got {other:?}"
            ))),
        }
    }
}

/// A month relative to the year given in a date filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    /// Years added to the filter year
    pub year_offset: i32,
    /// Month number 1-12
    pub month: u32,
}

impl YearMonth {
    /// Create a relative month.
    pub const fn new(year_offset: i32, month: u32) -> Self {
        Self { year_offset, month }
    }
}

/// Months queried when a date filter only names a year.
///
/// `start` is inclusive and `stop` exclusive. The default covers August
/// of the given year through July of the next, which catches reports
/// whose financial year does not follow the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearFilterMonths {
    /// First month queried
    pub start: YearMonth,
    /// First month not queried
    pub stop: YearMonth,
}

impl Default for YearFilterMonths {
    fn default() -> Self {
        Self {
            start: YearMonth::new(0, 8),
            stop: YearMonth::new(1, 8),
        }
    }
}

/// Settings for queries, parsing and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// URL of the filings endpoint
    pub entry_point_url: String,
    /// Largest page size requested from the API
    pub max_page_size: usize,
    /// Precision of datetimes written as text
    pub time_accuracy: TimeAccuracy,
    /// Record query times in UTC instead of local time
    pub utc_time: bool,
    /// Months queried for year-only date filters
    pub year_filter_months: YearFilterMonths,
    /// Request timeout in seconds
    pub timeout_sec: u64,
    /// User agent header
    pub user_agent: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            entry_point_url: DEFAULT_ENTRY_POINT_URL.to_string(),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            time_accuracy: TimeAccuracy::default(),
            utc_time: false,
            year_filter_months: YearFilterMonths::default(),
            timeout_sec: DEFAULT_TIMEOUT_SEC,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Options {
    /// Defaults overlaid with `FXO_ENTRY_POINT_URL`, `FXO_MAX_PAGE_SIZE`,
    /// `FXO_TIME_ACCURACY`, `FXO_UTC_TIME` and `FXO_TIMEOUT_SEC`.
    ///
    /// # Errors
    /// Returns [`FilingsError::InvalidOption`] when a variable cannot be
    /// parsed or the result fails [`Options::validate`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut options = Self::default();
        if let Some(url) = lookup("FXO_ENTRY_POINT_URL") {
            options.entry_point_url = url;
        }
        if let Some(size) = lookup("FXO_MAX_PAGE_SIZE") {
            options.max_page_size = parse_env("FXO_MAX_PAGE_SIZE", &size)?;
        }
        if let Some(accuracy) = lookup("FXO_TIME_ACCURACY") {
            options.time_accuracy = accuracy.parse()?;
        }
        if let Some(utc) = lookup("FXO_UTC_TIME") {
            options.utc_time = matches!(utc.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(timeout) = lookup("FXO_TIMEOUT_SEC") {
            options.timeout_sec = parse_env("FXO_TIMEOUT_SEC", &timeout)?;
        }
        options.validate()?;
        Ok(options)
    }

    /// Check option values for consistency.
    ///
    /// # Errors
    /// Returns [`FilingsError::InvalidOption`] for a zero page size, an
    /// unparseable entry point URL, a month outside 1-12 or a year filter
    /// window whose stop is not after its start.
    pub fn validate(&self) -> Result<()> {
        if self.max_page_size == 0 {
            return Err(FilingsError::InvalidOption(
                "max_page_size must be greater than zero".to_string(),
            ));
        }
        self.entry_point()?;
        let months = self.year_filter_months;
        for ym in [months.start, months.stop] {
            if !(1..=12).contains(&ym.month) {
                return Err(FilingsError::InvalidOption(format!(
                    "year_filter_months month {} is not in 1-12",
                    ym.month
                )));
            }
        }
        if months.stop <= months.start {
            return Err(FilingsError::InvalidOption(
                "year_filter_months stop is before or equal to start".to_string(),
            ));
        }
        Ok(())
    }

    /// Parsed entry point URL.
    ///
    /// # Errors
    /// Returns [`FilingsError::InvalidOption`] when the URL is invalid.
    pub fn entry_point(&self) -> Result<Url> {
        Url::parse(&self.entry_point_url).map_err(|e| {
            FilingsError::InvalidOption(format!(
                "entry_point_url {:?}: {e}",
                self.entry_point_url
            ))
        })
    }

    /// Request timeout.
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_sec)
    }

    /// Current time in UTC or local time according to `utc_time`.
    pub fn now(&self) -> DateTime<FixedOffset> {
        if self.utc_time {
            Utc::now().fixed_offset()
        } else {
            Local::now().fixed_offset()
        }
    }

    /// Format a datetime with `time_accuracy`.
    pub fn format_datetime(&self, dt: &DateTime<FixedOffset>) -> String {
        self.time_accuracy.format(dt)
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| FilingsError::InvalidOption(format!("{key}={value:?} is not a number")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.entry_point_url, "https://filings.xbrl.org/api/filings");
        assert_eq!(options.max_page_size, 200);
        assert_eq!(options.time_accuracy, TimeAccuracy::Min);
        assert!(!options.utc_time);
        assert_eq!(options.timeout(), Duration::from_secs(30));
        assert!(options.validate().is_ok());
    }

    #[rstest]
    #[case(TimeAccuracy::Day, "2023-05-09")]
    #[case(TimeAccuracy::Min, "2023-05-09 10:51")]
    #[case(TimeAccuracy::Sec, "2023-05-09 10:51:50")]
    #[case(TimeAccuracy::Max, "2023-05-09 10:51:50.382633")]
    fn test_time_accuracy_format(#[case] accuracy: TimeAccuracy, #[case] expected: &str) {
        let dt = Utc
            .with_ymd_and_hms(2023, 5, 9, 10, 51, 50)
            .unwrap()
            .checked_add_signed(chrono::Duration::microseconds(382_633))
            .unwrap()
            .fixed_offset();
        assert_eq!(accuracy.format(&dt), expected);
    }

    #[test]
    fn test_time_accuracy_from_str() {
        assert_eq!("SEC".parse::<TimeAccuracy>().unwrap(), TimeAccuracy::Sec);
        assert!("hour".parse::<TimeAccuracy>().is_err());
    }

    #[test]
    fn test_year_filter_stop_before_start_is_invalid() {
        let options = Options {
            year_filter_months: YearFilterMonths {
                start: YearMonth::new(0, 8),
                stop: YearMonth::new(0, 8),
            },
            ..Options::default()
        };
        assert!(matches!(options.validate(), Err(FilingsError::InvalidOption(_))));
    }

    #[test]
    fn test_invalid_entry_point() {
        let options = Options {
            entry_point_url: "not a url".to_string(),
            ..Options::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_from_lookup_overlays_defaults() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("FXO_MAX_PAGE_SIZE", "50"),
            ("FXO_TIME_ACCURACY", "day"),
            ("FXO_UTC_TIME", "true"),
        ]);
        let options = Options::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(options.max_page_size, 50);
        assert_eq!(options.time_accuracy, TimeAccuracy::Day);
        assert!(options.utc_time);
        assert_eq!(options.now().offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_from_lookup_rejects_bad_number() {
        let result = Options::from_lookup(|k| (k == "FXO_TIMEOUT_SEC").then(|| "soon".to_string()));
        assert!(matches!(result, Err(FilingsError::InvalidOption(_))));
    }

    #[test]
    fn test_options_deserialize_partial() {
        let options: Options = serde_json::from_str(r#"{"max_page_size": 10, "time_accuracy": "sec"}"#).unwrap();
        assert_eq!(options.max_page_size, 10);
        assert_eq!(options.time_accuracy, TimeAccuracy::Sec);
        assert_eq!(options.entry_point_url, DEFAULT_ENTRY_POINT_URL);
    }
}
