//! Errors reported by the API inside a JSON:API document.

use crate::json_tree::JsonTree;
use serde_json::Value;
use std::fmt;
use url::Url;

/// One entry of the JSON:API `errors` array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiError {
    /// Title of the error
    pub title: Option<String>,
    /// Details of the error
    pub detail: Option<String>,
    /// Code of the error
    pub code: Option<String>,
    /// `status` member of the error object
    pub api_status: Option<String>,
    /// HTTP status code of the response
    pub status: u16,
    /// HTTP reason phrase of the response
    pub status_text: String,
}

impl ApiError {
    pub(crate) fn from_json(frag: &Value, entry_point: &Url, status: u16, status_text: &str) -> Self {
        let tree = JsonTree::new("ApiError", frag, entry_point);
        let error = Self {
            title: tree.get_str("title"),
            detail: tree.get_str("detail"),
            code: tree.get_str("code"),
            api_status: tree.get_str("status"),
            status,
            status_text: status_text.to_string(),
        };
        tree.close();
        error
    }
}

impl fmt::Display for ApiError {
    /// `title | detail (code)`, leaving out missing parts.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = self.title.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let detail = self.detail.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let mut parts = Vec::new();
        if let Some(title) = title {
            parts.push(title.to_string());
        }
        if let Some(detail) = detail {
            if title.is_some() {
                parts.push("|".to_string());
            }
            parts.push(detail.to_string());
        }
        if let Some(code) = self.code.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("({})", code.trim()));
        }
        f.write_str(&parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json() {
        let entry = Url::parse("https://filings.xbrl.org/api/filings").unwrap();
        let frag = json!({"title": "Bad filter", "detail": "Unknown field", "code": "E1", "status": "400"});
        let err = ApiError::from_json(&frag, &entry, 400, "Bad Request");
        assert_eq!(err.api_status.as_deref(), Some("400"));
        assert_eq!(err.status, 400);
        assert_eq!(err.to_string(), "Bad filter | Unknown field (E1)");
    }

    #[test]
    fn test_display_partial() {
        let only_detail = ApiError {
            detail: Some("oops".to_string()),
            ..ApiError::default()
        };
        assert_eq!(only_detail.to_string(), "oops");
        assert_eq!(ApiError::default().to_string(), "");
    }
}
