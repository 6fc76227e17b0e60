//! Paged JSON:API fixture with one entity and three filings.

#![allow(dead_code, unreachable_pub)]

use axum::extract::Query;
use axum::routing::get;
use axum::{Json, Router};
use fxo::{FilingsClient, Options};
use serde_json::{Value, json};
use std::collections::HashMap;

const FILINGS: [(&str, &str); 3] = [("11", "fi"), ("12", "en"), ("13", "sv")];

pub async fn client(max_page_size: usize) -> FilingsClient {
    let app = Router::new().route("/api/filings", get(filings));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    FilingsClient::with_options(Options {
        entry_point_url: format!("http://{addr}/api/filings"),
        max_page_size,
        ..Options::default()
    })
    .unwrap()
}

async fn filings(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let size: usize = params.get("page[size]").and_then(|s| s.parse().ok()).unwrap_or(10);
    let number: usize = params.get("page[number]").and_then(|s| s.parse().ok()).unwrap_or(1);
    let include = params.get("include").cloned().unwrap_or_default();

    let data: Vec<Value> = FILINGS
        .iter()
        .skip((number - 1) * size)
        .take(size)
        .map(|(id, lang)| {
            json!({
                "type": "filing",
                "id": id,
                "attributes": {
                    "country": "FI",
                    "period_end": "2023-12-31",
                    "error_count": 1,
                    "package_url": format!("/2138003SM8GV6TPOLL33-2023-12-31-{lang}.zip")
                },
                "relationships": {"entity": {"data": {"type": "entity", "id": "7"}}}
            })
        })
        .collect();
    let included = if include.contains("entity") && !data.is_empty() {
        json!([{"type": "entity", "id": "7", "attributes": {"name": "Nokian Renkaat Oyj"}}])
    } else {
        json!([])
    };

    let mut links = json!({});
    if number * size < FILINGS.len() {
        let mut next = format!("/api/filings?page%5Bnumber%5D={}&page%5Bsize%5D={size}", number + 1);
        if !include.is_empty() {
            next.push_str("&include=entity");
        }
        links["next"] = json!(next);
    }
    Json(json!({
        "data": data,
        "included": included,
        "meta": {"count": FILINGS.len()},
        "links": links
    }))
}
