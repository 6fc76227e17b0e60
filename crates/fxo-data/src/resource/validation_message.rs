//! Validation messages of filings.

use super::{ApiResource, DataValue};
use crate::json_tree::JsonTree;
use crate::request::ApiRequest;
use chrono::{DateTime, FixedOffset};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;
use tracing::warn;
use url::Url;

const CALC_INCONSISTENCY_CODE: &str = "xbrl.5.2.5.2:calcInconsistency";
const DUPLICATED_FACTS_CODE: &str = "message:tech_duplicated_facts1";

static LINE_ITEM_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\bfrom (\S+)").ok());
static SHORT_ROLE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\blink role (\S+)").ok());
static REPORTED_SUM_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\breported sum (\S+)").ok());
static COMPUTED_SUM_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\bcomputed sum (\S+)").ok());
static CONTEXT_ID_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\bcontext (\S+)").ok());
static UNREPORTED_ITEMS_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\bunreportedContributingItems (.+)").ok());
static COMMA_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s*,\s*").ok());
static DUPLICATE_1_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\bvalue:\s*(\S+)").ok());
static DUPLICATE_2_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"!=\s+(\S+)").ok());

/// A single validation message of any severity.
///
/// Messages with code `xbrl.5.2.5.2:calcInconsistency` get the `calc_*`
/// fields derived from their text, and messages with code
/// `message:tech_duplicated_facts1` get the `duplicate_*` fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationMessage {
    /// JSON:API `id`
    pub api_id: String,
    /// `ERROR`, `WARNING` or `INCONSISTENCY`
    pub severity: Option<String>,
    /// Message text, trimmed
    pub text: Option<String>,
    /// Code of the broken rule
    pub code: Option<String>,
    /// `api_id` of the filing this message belongs to
    pub filing_api_id: Option<String>,
    /// Computed sum of a calculation inconsistency
    pub calc_computed_sum: Option<f64>,
    /// Reported sum of a calculation inconsistency
    pub calc_reported_sum: Option<f64>,
    /// XBRL context id of a calculation inconsistency
    pub calc_context_id: Option<String>,
    /// Qualified name of the summed line item, e.g. `ifrs-full:Assets`
    pub calc_line_item: Option<String>,
    /// Last segment of the link role URI
    pub calc_short_role: Option<String>,
    /// Contributing items not reported in the same context
    pub calc_unreported_items: Option<Vec<String>>,
    /// Greater value of a duplicated fact pair
    pub duplicate_greater: Option<f64>,
    /// Lesser value of a duplicated fact pair
    pub duplicate_lesser: Option<f64>,
    /// Start time of the query
    pub query_time: DateTime<FixedOffset>,
    /// URL of the request
    pub request_url: String,
}

impl ValidationMessage {
    pub(crate) fn from_json(frag: &Value, request: &ApiRequest, entry_point: &Url) -> Option<Self> {
        let tree = JsonTree::new("ValidationMessage", frag, entry_point);
        let Some(api_id) = tree.get_str("id") else {
            warn!("ValidationMessage resource without id skipped");
            return None;
        };
        let mut message = Self {
            api_id,
            severity: tree.get_str("attributes.severity"),
            text: tree.get_str("attributes.message").map(|s| s.trim().to_string()),
            code: tree.get_str("attributes.code"),
            filing_api_id: None,
            calc_computed_sum: None,
            calc_reported_sum: None,
            calc_context_id: None,
            calc_line_item: None,
            calc_short_role: None,
            calc_unreported_items: None,
            duplicate_greater: None,
            duplicate_lesser: None,
            query_time: request.query_time,
            request_url: request.url.clone(),
        };
        tree.close();
        message.derive_fields();
        Some(message)
    }

    fn derive_fields(&mut self) {
        let Some(text) = self.text.clone() else {
            return;
        };
        match self.code.as_deref() {
            Some(CALC_INCONSISTENCY_CODE) => {
                self.calc_computed_sum = capture_float(&COMPUTED_SUM_RE, &text, "calc_computed_sum");
                self.calc_reported_sum = capture_float(&REPORTED_SUM_RE, &text, "calc_reported_sum");
                self.calc_context_id = capture(&CONTEXT_ID_RE, &text);
                self.calc_line_item = capture(&LINE_ITEM_RE, &text);
                self.calc_short_role = capture(&SHORT_ROLE_RE, &text).map(|role| short_role(&role));
                self.calc_unreported_items = capture(&UNREPORTED_ITEMS_RE, &text)
                    .filter(|items| !items.eq_ignore_ascii_case("none"))
                    .and_then(|items| {
                        let comma = COMMA_RE.as_ref()?;
                        Some(comma.split(&items).map(str::to_string).collect())
                    });
            }
            Some(DUPLICATED_FACTS_CODE) => {
                let first = capture_float(&DUPLICATE_1_RE, &text, "duplicate_*");
                let second = capture_float(&DUPLICATE_2_RE, &text, "duplicate_*");
                if let (Some(a), Some(b)) = (first, second) {
                    self.duplicate_greater = Some(a.max(b));
                    self.duplicate_lesser = Some(a.min(b));
                }
            }
            _ => {}
        }
    }
}

fn capture(re: &LazyLock<Option<Regex>>, text: &str) -> Option<String> {
    let caps = re.as_ref()?.captures(text)?;
    caps.get(1).map(|m| m.as_str().to_string())
}

fn capture_float(re: &LazyLock<Option<Regex>>, text: &str, attr_name: &str) -> Option<f64> {
    let raw = capture(re, text)?;
    match raw.replace(',', "").parse::<f64>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("String {raw:?} of attribute {attr_name:?} could not be parsed into float.");
            None
        }
    }
}

/// Last path segment of a link role URI, or the role unchanged.
fn short_role(role: &str) -> String {
    let path = Url::parse(role).map_or_else(|_| role.to_string(), |url| url.path().to_string());
    match path.trim_end_matches('/').rsplit('/').next() {
        Some(last) if !last.trim().is_empty() => last.to_string(),
        _ => role.to_string(),
    }
}

impl ApiResource for ValidationMessage {
    const TYPE: &'static str = "validation_message";
    const TABLE: &'static str = "ValidationMessage";

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
            "severity",
            "text",
            "code",
            "filing_api_id",
            "calc_computed_sum",
            "calc_reported_sum",
            "calc_context_id",
            "calc_line_item",
            "calc_short_role",
            "calc_unreported_items",
            "duplicate_greater",
            "duplicate_lesser",
            "query_time",
            "request_url",
        ]
    }

    fn value(&self, column: &str) -> Option<DataValue> {
        match column {
            "api_id" => Some(self.api_id.clone().into()),
            "severity" => self.severity.clone().map(Into::into),
            "text" => self.text.clone().map(Into::into),
            "code" => self.code.clone().map(Into::into),
            "filing_api_id" => self.filing_api_id.clone().map(Into::into),
            "calc_computed_sum" => self.calc_computed_sum.map(Into::into),
            "calc_reported_sum" => self.calc_reported_sum.map(Into::into),
            "calc_context_id" => self.calc_context_id.clone().map(Into::into),
            "calc_line_item" => self.calc_line_item.clone().map(Into::into),
            "calc_short_role" => self.calc_short_role.clone().map(Into::into),
            "calc_unreported_items" => self.calc_unreported_items.clone().map(Into::into),
            "duplicate_greater" => self.duplicate_greater.map(Into::into),
            "duplicate_lesser" => self.duplicate_lesser.map(Into::into),
            "query_time" => Some(self.query_time.into()),
            "request_url" => Some(self.request_url.clone().into()),
            _ => None,
        }
    }
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text.as_deref().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Utc;
    use serde_json::json;

    fn parse(code: &str, text: &str) -> ValidationMessage {
        let entry = Url::parse("https://filings.xbrl.org/api/filings").unwrap();
        let request = ApiRequest::new("https://filings.xbrl.org/api/filings", Utc::now().fixed_offset());
        let frag = json!({
            "type": "validation_message",
            "id": "99",
            "attributes": {"severity": "INCONSISTENCY", "code": code, "message": text}
        });
        ValidationMessage::from_json(&frag, &request, &entry).unwrap()
    }

    #[test]
    fn test_calc_inconsistency_fields() {
        let msg = parse(
            CALC_INCONSISTENCY_CODE,
            "  Calculation inconsistency from ifrs-full:Assets in link role \
             http://www.example.com/esef/role/FinancialPositionConsolidated reported sum 1,234,500 \
             computed sum 1,234,000 context c-12 unreportedContributingItems \
             ifrs-full:Cash, ifrs-full:Inventories  ",
        );
        assert_eq!(msg.text.as_deref().map(|t| t.starts_with("Calculation")), Some(true));
        assert_relative_eq!(msg.calc_reported_sum.unwrap(), 1_234_500.0);
        assert_relative_eq!(msg.calc_computed_sum.unwrap(), 1_234_000.0);
        assert_eq!(msg.calc_line_item.as_deref(), Some("ifrs-full:Assets"));
        assert_eq!(msg.calc_short_role.as_deref(), Some("FinancialPositionConsolidated"));
        assert_eq!(msg.calc_context_id.as_deref(), Some("c-12"));
        assert_eq!(
            msg.calc_unreported_items,
            Some(vec!["ifrs-full:Cash".to_string(), "ifrs-full:Inventories".to_string()])
        );
        assert!(msg.duplicate_greater.is_none());
    }

    #[test]
    fn test_calc_inconsistency_without_unreported_items() {
        let msg = parse(
            CALC_INCONSISTENCY_CODE,
            "Calculation inconsistency from a:B in link role role-1 reported sum 5 computed sum x7 \
             context c1 unreportedContributingItems none",
        );
        assert_eq!(msg.calc_unreported_items, None);
        assert_eq!(msg.calc_computed_sum, None);
        assert_eq!(msg.calc_short_role.as_deref(), Some("role-1"));
    }

    #[test]
    fn test_duplicate_fields() {
        let msg = parse(
            DUPLICATED_FACTS_CODE,
            "Inconsistent duplicate numeric facts: value: 2,000 != 1,500.5",
        );
        assert_relative_eq!(msg.duplicate_greater.unwrap(), 2000.0);
        assert_relative_eq!(msg.duplicate_lesser.unwrap(), 1500.5);
        assert!(msg.calc_reported_sum.is_none());
    }

    #[test]
    fn test_other_codes_derive_nothing() {
        let msg = parse("ESEF.2.2.1.precisionAttributeUsed", "reported sum 5 value: 3 != 4");
        assert!(msg.calc_reported_sum.is_none());
        assert!(msg.duplicate_greater.is_none());
        assert_eq!(msg.to_string(), "reported sum 5 value: 3 != 4");
    }

    #[test]
    fn test_columns_order() {
        let cols = ValidationMessage::columns();
        assert_eq!(cols.first().map(String::as_str), Some("api_id"));
        assert_eq!(cols[cols.len() - 2..], ["query_time", "request_url"]);
        let pos = |name: &str| cols.iter().position(|c| c == name).unwrap();
        assert!(pos("calc_reported_sum") < pos("calc_line_item"));
        assert!(pos("calc_line_item") < pos("duplicate_greater"));
        assert!(pos("duplicate_greater") < pos("filing_api_id"));
    }
}
