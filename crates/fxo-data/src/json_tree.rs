//! Reader for nested JSON:API fragments with key path tracking.
//!
//! Every read through a tracked [`JsonTree`] is counted per object type
//! and key path. When the tree is closed, leaf key paths that were never
//! read are remembered. The records are exposed by [`crate::debug`] and
//! help to notice fields the API has added or renamed.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};
use tracing::warn;
use url::Url;

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct RetrieveCounter {
    pub(crate) success_count: u64,
    pub(crate) total_count: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Registry {
    pub(crate) counters: BTreeMap<(String, String), RetrieveCounter>,
    pub(crate) unaccessed: BTreeSet<(String, String)>,
    pub(crate) unexpected_types: BTreeSet<(String, String)>,
}

static REGISTRY: LazyLock<Mutex<Registry>> = LazyLock::new(|| Mutex::new(Registry::default()));

pub(crate) fn registry() -> MutexGuard<'static, Registry> {
    REGISTRY.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Record a resource type that the library does not know.
pub(crate) fn record_unexpected_type(type_name: &str, origin: &str) {
    registry()
        .unexpected_types
        .insert((type_name.to_string(), origin.to_string()));
}

/// Read-only view of a JSON object.
#[derive(Debug)]
pub struct JsonTree<'a> {
    class_name: &'static str,
    tree: &'a Value,
    entry_point: &'a Url,
    track: bool,
}

impl<'a> JsonTree<'a> {
    /// Tracked tree for object type `class_name`.
    pub fn new(class_name: &'static str, tree: &'a Value, entry_point: &'a Url) -> Self {
        Self {
            class_name,
            tree,
            entry_point,
            track: true,
        }
    }

    /// Tree whose reads are not recorded.
    pub fn untracked(class_name: &'static str, tree: &'a Value, entry_point: &'a Url) -> Self {
        Self {
            track: false,
            ..Self::new(class_name, tree, entry_point)
        }
    }

    /// Value at dot-delimited `key_path`, `None` for missing or null.
    pub fn get_value(&self, key_path: &str) -> Option<&'a Value> {
        let value = self.navigate(key_path);
        self.record(key_path, value.is_some());
        value
    }

    /// String value.
    pub fn get_str(&self, key_path: &str) -> Option<String> {
        let value = self.navigate(key_path).and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        self.record(key_path, value.is_some());
        value
    }

    /// Integer value, numeric strings are accepted.
    pub fn get_i64(&self, key_path: &str) -> Option<i64> {
        let value = self.navigate(key_path).and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });
        self.record(key_path, value.is_some());
        value
    }

    /// ISO date such as `2022-12-31`.
    pub fn get_date(&self, key_path: &str) -> Option<NaiveDate> {
        let value = self
            .navigate(key_path)
            .and_then(Value::as_str)
            .and_then(|s| self.parse_or_warn(key_path, s, "ISO date", parse_date));
        self.record(key_path, value.is_some());
        value
    }

    /// ISO datetime. Values without an offset are taken as UTC.
    pub fn get_datetime(&self, key_path: &str) -> Option<DateTime<Utc>> {
        let value = self
            .navigate(key_path)
            .and_then(Value::as_str)
            .and_then(|s| self.parse_or_warn(key_path, s, "ISO datetime", parse_datetime));
        self.record(key_path, value.is_some());
        value
    }

    /// URL resolved against the entry point.
    pub fn get_url(&self, key_path: &str) -> Option<String> {
        let value = self.navigate(key_path).and_then(Value::as_str).and_then(|s| {
            self.parse_or_warn(key_path, s, "absolute URL", |s| {
                self.entry_point.join(s).ok().map(String::from)
            })
        });
        self.record(key_path, value.is_some());
        value
    }

    /// Remember the leaf key paths of this tree that no object of the
    /// same type has read. Lists are treated as leaves.
    pub fn close(self) {
        if !self.track {
            return;
        }
        let Value::Object(map) = self.tree else {
            return;
        };
        let mut leaves = Vec::new();
        collect_leaf_paths(map, String::new(), &mut leaves);

        let mut registry = registry();
        for path in leaves {
            let key = (self.class_name.to_string(), path);
            if !registry.counters.contains_key(&key) {
                registry.unaccessed.insert(key);
            }
        }
    }

    fn navigate(&self, key_path: &str) -> Option<&'a Value> {
        let mut current = self.tree;
        for comp in key_path.split('.') {
            current = current.as_object()?.get(comp)?;
        }
        (!current.is_null()).then_some(current)
    }

    fn record(&self, key_path: &str, success: bool) {
        if !self.track {
            return;
        }
        let mut registry = registry();
        let counter = registry
            .counters
            .entry((self.class_name.to_string(), key_path.to_string()))
            .or_default();
        counter.total_count += 1;
        if success {
            counter.success_count += 1;
        }
    }

    fn parse_or_warn<T>(
        &self,
        key_path: &str,
        raw: &str,
        what: &str,
        parse: impl FnOnce(&str) -> Option<T>,
    ) -> Option<T> {
        let parsed = parse(raw);
        if parsed.is_none() {
            warn!(
                "Could not parse {what} string {raw:?} for object {} JSON fragment path {key_path:?}",
                self.class_name
            );
        }
        parsed
    }
}

fn collect_leaf_paths(map: &serde_json::Map<String, Value>, prefix: String, out: &mut Vec<String>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(child) => collect_leaf_paths(child, path, out),
            _ => out.push(path),
        }
    }
}

/// Parse `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Parse an ISO 8601 datetime with a space or `T` separator, optional
/// fraction and optional offset. Naive values are taken as UTC and a
/// plain date is midnight UTC.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    parse_date(s).and_then(|d| d.and_hms_opt(0, 0, 0)).map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use rstest::rstest;
    use serde_json::json;

    fn entry() -> Url {
        Url::parse("https://filings.xbrl.org/api/filings").unwrap()
    }

    #[rstest]
    #[case("2023-05-09 10:51:50.382633", 382_633_000)]
    #[case("2023-05-09T10:51:50", 0)]
    #[case("2023-05-09T10:51:50Z", 0)]
    #[case("2023-05-09 13:51:50+03:00", 0)]
    fn test_parse_datetime_variants(#[case] raw: &str, #[case] nanos: u32) {
        let dt = parse_datetime(raw).unwrap();
        assert_eq!(dt.date_naive(), NaiveDate::from_ymd_opt(2023, 5, 9).unwrap());
        assert_eq!(dt.hour(), 10);
        assert_eq!(dt.nanosecond(), nanos);
    }

    #[test]
    fn test_parse_datetime_plain_date_is_midnight() {
        assert_eq!(
            parse_datetime("2023-05-09"),
            Some(Utc.with_ymd_and_hms(2023, 5, 9, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_datetime("yesterday"), None);
    }

    #[rstest]
    #[case("2022-12-31", NaiveDate::from_ymd_opt(2022, 12, 31))]
    #[case("2022-02-30", None)]
    #[case("31.12.2022", None)]
    fn test_parse_date(#[case] raw: &str, #[case] expected: Option<NaiveDate>) {
        assert_eq!(parse_date(raw), expected);
    }

    #[test]
    fn test_get_navigates_and_parses() {
        let entry = entry();
        let value = json!({
            "id": "1",
            "attributes": {
                "period_end": "2022-12-31",
                "processed": "2023-01-02 03:04:05",
                "error_count": 3,
                "report_url": "/a/b/report.xhtml",
                "nothing": null
            },
            "relationships": {"entity": {"data": {"id": "e1"}}}
        });
        let tree = JsonTree::new("TestNavigate", &value, &entry);

        assert_eq!(tree.get_str("id").as_deref(), Some("1"));
        assert_eq!(
            tree.get_date("attributes.period_end"),
            NaiveDate::from_ymd_opt(2022, 12, 31)
        );
        assert_eq!(
            tree.get_datetime("attributes.processed"),
            Some(Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap())
        );
        assert_eq!(tree.get_i64("attributes.error_count"), Some(3));
        assert_eq!(
            tree.get_url("attributes.report_url").as_deref(),
            Some("https://filings.xbrl.org/a/b/report.xhtml")
        );
        assert_eq!(tree.get_str("relationships.entity.data.id").as_deref(), Some("e1"));
        assert_eq!(tree.get_str("attributes.nothing"), None);
        assert_eq!(tree.get_str("attributes.error_count.deeper"), None);
    }

    #[test]
    fn test_close_records_unaccessed_paths_and_counts() {
        let entry = entry();
        let first = json!({"id": "1", "attributes": {"name": "A", "new_field": "x"}, "tags": [1, 2]});
        let second = json!({"id": "2", "attributes": {"name": null}});

        let tree = JsonTree::new("TestClose", &first, &entry);
        tree.get_str("id");
        tree.get_str("attributes.name");
        tree.close();

        let tree = JsonTree::new("TestClose", &second, &entry);
        tree.get_str("id");
        tree.get_str("attributes.name");
        tree.close();

        let registry = registry();
        let unaccessed: Vec<_> = registry
            .unaccessed
            .iter()
            .filter(|(class, _)| class == "TestClose")
            .map(|(_, path)| path.as_str())
            .collect();
        assert_eq!(unaccessed, vec!["attributes.new_field", "tags"]);

        let name = registry.counters[&("TestClose".to_string(), "attributes.name".to_string())];
        assert_eq!(name.success_count, 1);
        assert_eq!(name.total_count, 2);
    }

    #[test]
    fn test_untracked_records_nothing() {
        let entry = entry();
        let value = json!({"id": "1", "extra": true});
        let tree = JsonTree::untracked("TestUntracked", &value, &entry);
        tree.get_str("id");
        tree.close();

        let registry = registry();
        assert!(!registry.counters.keys().any(|(class, _)| class == "TestUntracked"));
        assert!(!registry.unaccessed.iter().any(|(class, _)| class == "TestUntracked"));
    }
}
