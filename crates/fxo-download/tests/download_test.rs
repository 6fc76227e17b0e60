//! Download tests against a local fixture server.

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use futures::StreamExt;
use fxo_download::{DownloadError, DownloadSpecs, download, download_parallel, download_parallel_stream, stats};
use sha2::{Digest, Sha256};
use std::net::SocketAddr;

const BODY: &[u8] = b"filing package contents";

async fn serve() -> SocketAddr {
    let app = Router::new()
        .route("/files/{name}", get(|| async { BODY }))
        .route("/files/", get(|| async { BODY }))
        .route("/missing/{name}", get(|| async { StatusCode::NOT_FOUND }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn body_sha256() -> String {
    hex::encode(Sha256::digest(BODY))
}

#[tokio::test]
async fn test_download_names_file_from_url() {
    let addr = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let client = reqwest::Client::new();

    let spec = DownloadSpecs::new(format!("http://{addr}/files/report.zip"), dir.path().join("nested"));
    let path = download(&client, &spec).await.unwrap();

    assert_eq!(path, dir.path().join("nested").join("report.zip"));
    assert_eq!(std::fs::read(&path).unwrap(), BODY);
    assert!(!dir.path().join("nested").join("report.zip.unfinished").exists());
}

#[tokio::test]
async fn test_download_with_stem_pattern_and_overwrite() {
    let addr = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let client = reqwest::Client::new();
    std::fs::write(dir.path().join("report_v2.zip"), b"old").unwrap();

    let spec = DownloadSpecs::new(format!("http://{addr}/files/report.zip"), dir.path())
        .with_stem_pattern("/name/_v2");
    let path = download(&client, &spec).await.unwrap();

    assert_eq!(path.file_name().unwrap(), "report_v2.zip");
    assert_eq!(std::fs::read(&path).unwrap(), BODY);
}

#[tokio::test]
async fn test_download_without_name_uses_numbered_files() {
    let addr = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let client = reqwest::Client::new();

    let spec = DownloadSpecs::new(format!("http://{addr}/files/"), dir.path());
    let first = download(&client, &spec).await.unwrap();
    let second = download(&client, &spec).await.unwrap();

    assert_eq!(first.file_name().unwrap(), "file0001");
    assert_eq!(second.file_name().unwrap(), "file0002");
}

#[tokio::test]
async fn test_download_hash_match_is_case_insensitive() {
    let addr = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let client = reqwest::Client::new();

    let spec = DownloadSpecs::new(format!("http://{addr}/files/ok.zip"), dir.path())
        .with_sha256(body_sha256().to_uppercase());
    let path = download(&client, &spec).await.unwrap();
    assert!(path.is_file());
}

#[tokio::test]
async fn test_download_corrupt_file_is_renamed() {
    let addr = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let client = reqwest::Client::new();
    let wrong = "AB".repeat(32);

    let spec = DownloadSpecs::new(format!("http://{addr}/files/bad.zip"), dir.path()).with_sha256(&wrong);
    let err = download(&client, &spec).await.unwrap_err();

    match err {
        DownloadError::CorruptDownload {
            path,
            calculated_hash,
            expected_hash,
            ..
        } => {
            assert_eq!(path, dir.path().join("bad.zip.corrupt"));
            assert!(path.is_file());
            assert_eq!(calculated_hash, body_sha256());
            assert_eq!(expected_hash, wrong.to_lowercase());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join("bad.zip").exists());
}

#[tokio::test]
async fn test_download_http_status_error() {
    let addr = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let client = reqwest::Client::new();

    let spec = DownloadSpecs::new(format!("http://{addr}/missing/x.zip"), dir.path());
    let err = download(&client, &spec).await.unwrap_err();
    assert!(matches!(err, DownloadError::HttpStatus { status: 404, .. }));
}

#[tokio::test]
async fn test_download_invalid_stem_pattern_fails_before_request() {
    let dir = tempfile::tempdir().unwrap();
    let client = reqwest::Client::new();

    let spec = DownloadSpecs::new("http://127.0.0.1:9/files/a.zip", dir.path()).with_stem_pattern("no_placeholder");
    let err = download(&client, &spec).await.unwrap_err();
    assert!(matches!(err, DownloadError::InvalidStemPattern(_)));
}

#[tokio::test]
async fn test_download_parallel_returns_every_item() {
    let addr = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let client = reqwest::Client::new();

    let items: Vec<_> = (0..6)
        .map(|i| {
            let url = if i == 3 {
                format!("http://{addr}/missing/{i}.zip")
            } else {
                format!("http://{addr}/files/{i}.zip")
            };
            DownloadSpecs::new(url, dir.path()).with_info(i)
        })
        .collect();

    let mut results = download_parallel(&client, items, 2).await;
    results.sort_by_key(|r| r.info);

    assert_eq!(results.len(), 6);
    for result in &results {
        if result.info == 3 {
            assert!(result.err().is_some());
        } else {
            assert_eq!(
                result.path().unwrap(),
                dir.path().join(format!("{}.zip", result.info))
            );
        }
    }
}

#[tokio::test]
async fn test_download_parallel_stream_updates_stats() {
    let addr = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let client = reqwest::Client::new();
    let items_before = stats::item_count();
    let bytes_before = stats::byte_count();

    let items = vec![
        DownloadSpecs::new(format!("http://{addr}/files/a.zip"), dir.path()),
        DownloadSpecs::new(format!("http://{addr}/files/b.zip"), dir.path()),
    ];
    let count = download_parallel_stream(&client, items, 0)
        .filter(|r| futures::future::ready(r.result.is_ok()))
        .count()
        .await;

    assert_eq!(count, 2);
    assert!(stats::item_count() >= items_before + 2);
    assert!(stats::byte_count() >= bytes_before + 2 * BODY.len() as u64);
}
