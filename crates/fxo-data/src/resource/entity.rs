//! Filers of reports.

use super::{ApiResource, DataValue};
use crate::json_tree::JsonTree;
use crate::request::ApiRequest;
use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use std::fmt;
use tracing::warn;
use url::Url;

/// An entity, e.g. a group, which has filed reports.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// JSON:API `id`
    pub api_id: String,
    /// Identifier of the entity, the LEI code for ESEF filers
    pub identifier: Option<String>,
    /// Name of the entity
    pub name: Option<String>,
    /// URL of the full list of filings by this entity
    pub api_entity_filings_url: Option<String>,
    /// Start time of the query
    pub query_time: DateTime<FixedOffset>,
    /// URL of the request
    pub request_url: String,
}

impl Entity {
    pub(crate) fn from_json(frag: &Value, request: &ApiRequest, entry_point: &Url) -> Option<Self> {
        let tree = JsonTree::new("Entity", frag, entry_point);
        let Some(api_id) = tree.get_str("id") else {
            warn!("Entity resource without id skipped");
            return None;
        };
        let entity = Self {
            api_id,
            identifier: tree.get_str("attributes.identifier"),
            name: tree.get_str("attributes.name"),
            api_entity_filings_url: tree.get_url("relationships.filings.links.related"),
            query_time: request.query_time,
            request_url: request.url.clone(),
        };
        tree.close();
        Some(entity)
    }
}

impl ApiResource for Entity {
    const TYPE: &'static str = "entity";
    const TABLE: &'static str = "Entity";

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
            "identifier",
            "name",
            "api_entity_filings_url",
            "query_time",
            "request_url",
        ]
    }

    fn value(&self, column: &str) -> Option<DataValue> {
        match column {
            "api_id" => Some(self.api_id.clone().into()),
            "identifier" => self.identifier.clone().map(Into::into),
            "name" => self.name.clone().map(Into::into),
            "api_entity_filings_url" => self.api_entity_filings_url.clone().map(Into::into),
            "query_time" => Some(self.query_time.into()),
            "request_url" => Some(self.request_url.clone().into()),
            _ => None,
        }
    }
}

impl fmt::Display for Entity {
    /// `name (identifier)`, or whichever exists.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.name.as_deref(), self.identifier.as_deref()) {
            (Some(name), Some(identifier)) => write!(f, "{name} ({identifier})"),
            (Some(name), None) => f.write_str(name),
            (None, Some(identifier)) => f.write_str(identifier),
            (None, None) => Ok(()),
        }
    }
}
