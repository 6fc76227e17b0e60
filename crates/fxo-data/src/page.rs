//! A single page of filings returned by the API.

use crate::json_tree::{JsonTree, record_unexpected_type};
use crate::request::ApiRequest;
use crate::resource::{ApiResource, Entity, Filing, ValidationMessage};
use crate::scope::ScopeFlags;
use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;
use url::Url;

/// Resources already received by a running query.
#[derive(Debug, Default)]
pub(crate) struct QueryState {
    pub(crate) received_filings: HashSet<String>,
    pub(crate) entities: HashMap<String, Arc<Entity>>,
    pub(crate) filing_count: usize,
}

/// One page of the filings endpoint with its included resources.
#[derive(Debug, Clone, PartialEq)]
pub struct FilingsPage {
    /// Number of filings matching the request, from `meta.count`
    pub query_filing_count: Option<i64>,
    /// JSON:API version of the response
    pub jsonapi_version: Option<String>,
    /// URL of this page
    pub api_self_url: Option<String>,
    /// URL of the previous page
    pub api_prev_page_url: Option<String>,
    /// URL of the next page
    pub api_next_page_url: Option<String>,
    /// URL of the first page
    pub api_first_page_url: Option<String>,
    /// URL of the last page
    pub api_last_page_url: Option<String>,
    /// Filings of the page not returned earlier in the query
    pub filing_list: Vec<Filing>,
    /// Entities first seen on this page, `None` unless requested
    pub entity_list: Option<Vec<Arc<Entity>>>,
    /// Validation messages of this page, `None` unless requested
    pub validation_message_list: Option<Vec<Arc<ValidationMessage>>>,
    /// Start time of the query
    pub query_time: DateTime<FixedOffset>,
    /// URL of the request
    pub request_url: String,
}

/// An `included` resource split by type.
struct Included<'a> {
    type_name: String,
    api_id: String,
    frag: &'a Value,
}

impl FilingsPage {
    pub(crate) fn from_json(
        json: &Value,
        request: &ApiRequest,
        entry_point: &Url,
        flags: ScopeFlags,
        state: &mut QueryState,
    ) -> Self {
        let tree = JsonTree::new("FilingsPage", json, entry_point);
        let mut page = Self {
            query_filing_count: tree.get_i64("meta.count"),
            jsonapi_version: tree.get_str("jsonapi.version"),
            api_self_url: tree.get_url("links.self"),
            api_prev_page_url: tree.get_url("links.prev"),
            api_next_page_url: tree.get_url("links.next"),
            api_first_page_url: tree.get_url("links.first"),
            api_last_page_url: tree.get_url("links.last"),
            filing_list: Vec::new(),
            entity_list: None,
            validation_message_list: None,
            query_time: request.query_time,
            request_url: request.url.clone(),
        };
        let data = tree.get_value("data").and_then(Value::as_array);
        let included = tree.get_value("included").and_then(Value::as_array);
        tree.close();

        let mut entity_frags = Vec::new();
        let mut message_frags = Vec::new();
        for item in split_included(included.map(Vec::as_slice).unwrap_or_default()) {
            match item.type_name.as_str() {
                t if t == Entity::TYPE => entity_frags.push(item),
                t if t == ValidationMessage::TYPE => message_frags.push(item),
                other => record_unexpected_type(other, "included"),
            }
        }

        for frag in data.map(Vec::as_slice).unwrap_or_default() {
            let type_name = frag
                .get("type")
                .and_then(Value::as_str)
                .map(str::to_lowercase)
                .unwrap_or_default();
            if type_name != Filing::TYPE {
                record_unexpected_type(&type_name, "data");
                continue;
            }
            let Some(filing) = Filing::from_json(frag, request, entry_point) else {
                continue;
            };
            if !state.received_filings.insert(filing.api_id.clone()) {
                warn!("Same filing returned again, {}", filing.repr());
                continue;
            }
            page.filing_list.push(filing);
        }

        if flags.wants_entity() {
            page.entity_list = Some(page.attach_entities(&entity_frags, request, entry_point, state));
        }
        if flags.wants_validation_messages() {
            page.validation_message_list = Some(page.attach_validation_messages(&message_frags, request, entry_point));
        }
        page
    }

    /// Map a stored response body outside of a running query.
    ///
    /// Relative links resolve against `entry_point`.
    pub fn parse(json: &Value, request: &ApiRequest, entry_point: &Url, flags: ScopeFlags) -> Self {
        Self::from_json(json, request, entry_point, flags, &mut QueryState::default())
    }

    /// Number of filings on the page.
    pub const fn len(&self) -> usize {
        self.filing_list.len()
    }

    /// Page has no new filings.
    pub const fn is_empty(&self) -> bool {
        self.filing_list.is_empty()
    }

    /// Keep only the first `n` filings and the resources they refer to.
    pub(crate) fn truncate(&mut self, n: usize) {
        if n >= self.filing_list.len() {
            return;
        }
        self.filing_list.truncate(n);
        let filing_ids: HashSet<&str> = self.filing_list.iter().map(|f| f.api_id.as_str()).collect();
        let entity_ids: HashSet<&str> = self
            .filing_list
            .iter()
            .filter_map(|f| f.entity_api_id.as_deref())
            .collect();
        if let Some(entities) = &mut self.entity_list {
            entities.retain(|e| entity_ids.contains(e.api_id.as_str()));
        }
        if let Some(messages) = &mut self.validation_message_list {
            messages.retain(|m| {
                m.filing_api_id
                    .as_deref()
                    .is_some_and(|id| filing_ids.contains(id))
            });
        }
    }

    fn attach_entities(
        &mut self,
        frags: &[Included<'_>],
        request: &ApiRequest,
        entry_point: &Url,
        state: &mut QueryState,
    ) -> Vec<Arc<Entity>> {
        let mut new_entities = Vec::new();
        for item in frags {
            if state.entities.contains_key(&item.api_id) {
                continue;
            }
            if let Some(entity) = Entity::from_json(item.frag, request, entry_point) {
                let entity = Arc::new(entity);
                state.entities.insert(item.api_id.clone(), Arc::clone(&entity));
                new_entities.push(entity);
            }
        }

        for filing in &mut self.filing_list {
            let Some(entity_api_id) = filing.entity_api_id.as_deref() else {
                warn!("No entity defined for {}", filing.repr());
                continue;
            };
            match state.entities.get(entity_api_id) {
                Some(entity) => filing.entity = Some(Arc::clone(entity)),
                None => warn!("Entity with api_id={entity_api_id} not found"),
            }
        }
        new_entities
    }

    fn attach_validation_messages(
        &mut self,
        frags: &[Included<'_>],
        request: &ApiRequest,
        entry_point: &Url,
    ) -> Vec<Arc<ValidationMessage>> {
        let mut messages: IndexMap<String, ValidationMessage> = IndexMap::new();
        for item in frags {
            if messages.contains_key(&item.api_id) {
                continue;
            }
            if let Some(msg) = ValidationMessage::from_json(item.frag, request, entry_point) {
                messages.insert(item.api_id.clone(), msg);
            }
        }

        for filing in &self.filing_list {
            for msg_id in filing.validation_message_ids() {
                match messages.get_mut(msg_id) {
                    Some(msg) => msg.filing_api_id = Some(filing.api_id.clone()),
                    None => warn!("Validation message with api_id={msg_id} not found"),
                }
            }
        }

        let messages: IndexMap<String, Arc<ValidationMessage>> = messages
            .into_iter()
            .map(|(api_id, msg)| {
                if msg.filing_api_id.is_none() {
                    warn!("No filing defined for validation message api_id={api_id}: {msg}");
                }
                (api_id, Arc::new(msg))
            })
            .collect();

        for filing in &mut self.filing_list {
            let attached = filing
                .validation_message_ids()
                .iter()
                .filter_map(|id| messages.get(id).cloned())
                .collect();
            filing.validation_messages = Some(attached);
        }
        messages.into_values().collect()
    }
}

fn split_included(items: &[Value]) -> Vec<Included<'_>> {
    items
        .iter()
        .filter_map(|frag| {
            let type_name = frag.get("type").and_then(Value::as_str)?.to_lowercase();
            let Some(Value::String(api_id)) = frag.get("id") else {
                warn!("Included {type_name} resource without string id skipped");
                return None;
            };
            Some(Included {
                type_name,
                api_id: api_id.clone(),
                frag,
            })
        })
        .collect()
}
