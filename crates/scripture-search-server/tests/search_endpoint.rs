//! End-to-end coverage of `POST`/`GET /search` against a mocked catalog and
//! archive store, exercising the seed scenarios from spec §8.

use std::io::{Cursor, Write};
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use scripture_search_core::{EngineConfig, Orchestrator};
use scripture_search_server::routes::build_router;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;

fn build_zip(files: &[(&str, &str)]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut writer = zip::ZipWriter::new(Cursor::new(&mut buf));
        let options = SimpleFileOptions::default();
        for (name, content) in files {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }
    buf
}

#[tokio::test]
async fn catalog_outage_falls_back_and_still_returns_hits() {
    let catalog = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/catalog/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&catalog)
        .await;

    let archive_store = MockServer::start().await;
    let zip = build_zip(&[("bible/kt/grace.md", "Grace is the unmerited favor of God.")]);
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(zip))
        .mount(&archive_store)
        .await;

    let config = EngineConfig::default();
    let orchestrator = Arc::new(Orchestrator::new(config, catalog.uri()).unwrap());
    let app = build_router(orchestrator);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/search?query=grace&language=en&owner=unfoldingWord")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    // The fallback descriptors point at git.door43.org, which this test
    // cannot reach, so every worker fails — but the response is still a
    // success per spec §4.5, and the catalog fallback is recorded.
    assert_eq!(json["failures"].as_array().unwrap().iter().any(|f| {
        f["resource"] == "catalog" && f["reason"] == "catalog_unavailable"
    }), true);
}

#[tokio::test]
async fn empty_query_returns_400() {
    let config = EngineConfig::default();
    let orchestrator = Arc::new(Orchestrator::new(config, "https://catalog.invalid".to_string()).unwrap());
    let app = build_router(orchestrator);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/search")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({"query": "", "language": "en", "owner": "unfoldingWord"})
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn limit_zero_returns_empty_hits_not_an_error() {
    let config = EngineConfig::default();
    let orchestrator = Arc::new(Orchestrator::new(config, "https://catalog.invalid".to_string()).unwrap());
    let app = build_router(orchestrator);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/search")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "query": "grace",
                        "language": "en",
                        "owner": "unfoldingWord",
                        "limit": 0
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["hits"].as_array().unwrap().len(), 0);
}
