//! Local JSON:API fixture server for client tests.

#![allow(dead_code, unreachable_pub)]

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header::ACCEPT};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use fxo_data::{FilingsClient, Options};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const BODY: &[u8] = b"filing package contents";
pub const BODY_SHA256: &str = "6723c27fc29dbb31bfb8e6f1c033896b288de6b244c19c46a0a2fd76fd53a83d";

/// `(filing id, entity id, validation message ids)`
type FixtureFiling = (&'static str, &'static str, &'static [&'static str]);

const FI_FILINGS: [FixtureFiling; 5] = [
    ("1", "e1", &["m1", "m2"]),
    ("2", "e2", &[]),
    ("3", "e1", &["m3"]),
    ("4", "e3", &[]),
    ("5", "e2", &[]),
];

const SE_FILINGS: [FixtureFiling; 2] = [("3", "e1", &["m3"]), ("6", "e4", &[])];

#[derive(Clone, Default)]
struct AppState {
    requests: Arc<AtomicUsize>,
}

/// Running fixture server.
pub struct Fixture {
    pub addr: SocketAddr,
    requests: Arc<AtomicUsize>,
}

impl Fixture {
    /// Number of `/api/filings` requests received.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn options(&self, max_page_size: usize) -> Options {
        Options {
            entry_point_url: format!("http://{}/api/filings", self.addr),
            max_page_size,
            ..Options::default()
        }
    }

    pub fn client(&self, max_page_size: usize) -> FilingsClient {
        FilingsClient::with_options(self.options(max_page_size)).unwrap()
    }
}

pub async fn serve() -> Fixture {
    let state = AppState::default();
    let requests = Arc::clone(&state.requests);
    let app = Router::new()
        .route("/api/filings", get(filings))
        .route("/files/{name}", get(|| async { BODY }))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Fixture { addr, requests }
}

async fn filings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    let accept = headers.get(ACCEPT).and_then(|v| v.to_str().ok());
    if accept != Some("application/vnd.api+json") {
        return (StatusCode::NOT_ACCEPTABLE, "JSON:API media type required").into_response();
    }

    let country = params.get("filter[country]").map(String::as_str);
    let all: &[FixtureFiling] = match country {
        Some("XX") => {
            let errors = json!({"errors": [
                {"status": "400", "title": "Invalid filter", "detail": "Unknown country XX", "code": "invalid"},
                {"title": "Second problem"}
            ]});
            return (StatusCode::BAD_REQUEST, Json(errors)).into_response();
        }
        Some("ZZ") => return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response(),
        Some("SE") => &SE_FILINGS,
        Some("FI") | None => &FI_FILINGS,
        Some(_) => &[],
    };

    let size: usize = params.get("page[size]").and_then(|s| s.parse().ok()).unwrap_or(10);
    let number: usize = params.get("page[number]").and_then(|s| s.parse().ok()).unwrap_or(1);
    let chunk: Vec<&FixtureFiling> = all.iter().skip((number - 1) * size).take(size).collect();
    let include = params.get("include").cloned().unwrap_or_default();

    let data: Vec<Value> = chunk.iter().map(|f| filing_json(f)).collect();
    let mut included = Vec::new();
    if include.contains("entity") {
        let mut seen = Vec::new();
        for (_, entity, _) in &chunk {
            if !seen.contains(&entity) {
                seen.push(entity);
                included.push(json!({
                    "type": "entity",
                    "id": entity,
                    "attributes": {"name": format!("Entity {entity}"), "identifier": format!("LEI-{entity}")}
                }));
            }
        }
    }
    if include.contains("validation_messages") {
        for (_, _, messages) in &chunk {
            for id in messages.iter() {
                included.push(json!({
                    "type": "validation_message",
                    "id": id,
                    "attributes": {"severity": "WARNING", "code": "test", "message": format!("Message {id}")}
                }));
            }
        }
    }

    let page_link = |n: usize| {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query.append_pair("page[number]", &n.to_string());
        query.append_pair("page[size]", &size.to_string());
        if let Some(country) = country {
            query.append_pair("filter[country]", country);
        }
        if !include.is_empty() {
            query.append_pair("include", &include);
        }
        format!("/api/filings?{}", query.finish())
    };
    let mut links = json!({"self": page_link(number)});
    if number * size < all.len() {
        links["next"] = json!(page_link(number + 1));
    }

    Json(json!({
        "data": data,
        "included": included,
        "meta": {"count": all.len()},
        "links": links,
        "jsonapi": {"version": "1.0"}
    }))
    .into_response()
}

fn filing_json((id, entity, messages): &FixtureFiling) -> Value {
    let sha256 = if *id == "2" { "0000" } else { BODY_SHA256 };
    let messages: Vec<Value> = messages
        .iter()
        .map(|m| json!({"type": "validation_message", "id": m}))
        .collect();
    json!({
        "type": "filing",
        "id": id,
        "attributes": {
            "country": "FI",
            "fxo_id": format!("fxo-{id}"),
            "period_end": "2022-12-31",
            "error_count": 0,
            "date_added": "2023-03-06 14:41:14",
            "package_url": format!("/files/report{id}-2022-12-31-fi.zip"),
            "report_url": format!("/files/report{id}-2022-12-31-fi.xhtml"),
            "sha256": sha256
        },
        "relationships": {
            "entity": {"data": {"type": "entity", "id": entity}},
            "validation_messages": {"data": messages}
        }
    })
}
