//! HTTP surface: `POST`/`GET /search` over the orchestrator (spec §6).
//!
//! The core crate's [`SearchResponse`](scripture_search_core::SearchResponse)
//! uses richer internal field names (`resource_id`, `resource_kind`) for
//! Rust-side ergonomics; this module maps it to the wire shape spec §6
//! actually specifies (`resource`, `type`). Everything else passes through
//! unchanged.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use scripture_search_core::{Orchestrator, SearchRequest, SearchResponse};

use crate::error::ApiError;

/// Shared application state: the stateless orchestrator, held behind an
/// `Arc` so axum can clone it cheaply per request.
pub type AppState = Arc<Orchestrator>;

/// Build the router exposing `GET`/`POST /search` and a liveness probe.
///
/// Other tools in the repo (chat relay, tool/RPC surface — both out of
/// scope per spec §1) invoke the orchestrator over this same JSON
/// contract, some from browser-resident clients, so CORS is left
/// permissive rather than locked to a single origin.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/search", post(search_post).get(search_get))
        .route("/healthz", get(healthz))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn search_post(
    State(orchestrator): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<WireResponse>, ApiError> {
    handle_search(&orchestrator, &request).await
}

async fn search_get(
    State(orchestrator): State<AppState>,
    Query(request): Query<SearchRequest>,
) -> Result<Json<WireResponse>, ApiError> {
    handle_search(&orchestrator, &request).await
}

async fn handle_search(
    orchestrator: &Orchestrator,
    request: &SearchRequest,
) -> Result<Json<WireResponse>, ApiError> {
    info!(query = request.query, language = request.language, owner = request.owner, "search request received");
    match orchestrator.search(request).await {
        Ok(response) => Ok(Json(WireResponse::from(response))),
        Err(err) => {
            error!(error = %err, "search request failed");
            Err(ApiError::from(err))
        }
    }
}

/// The `/search` response body exactly as spec §6 describes it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireResponse {
    took_ms: u64,
    query: String,
    language: String,
    owner: String,
    resource_count: usize,
    hits: Vec<WireHit>,
    failures: Vec<WireFailure>,
}

#[derive(Debug, Serialize)]
pub struct WireHit {
    resource: String,
    #[serde(rename = "type")]
    kind: String,
    path: String,
    score: f32,
    preview: String,
}

#[derive(Debug, Serialize)]
pub struct WireFailure {
    resource: String,
    reason: String,
}

impl From<SearchResponse> for WireResponse {
    fn from(response: SearchResponse) -> Self {
        Self {
            took_ms: response.took_ms,
            query: response.query,
            language: response.language,
            owner: response.owner,
            resource_count: response.resource_count,
            hits: response
                .hits
                .into_iter()
                .map(|hit| WireHit {
                    resource: hit.resource_id,
                    kind: hit.resource_kind.as_str().to_string(),
                    path: hit.path,
                    score: hit.score,
                    preview: hit.preview,
                })
                .collect(),
            failures: response
                .failures
                .into_iter()
                .map(|failure| WireFailure {
                    resource: failure.resource,
                    reason: failure.reason,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use scripture_search_core::EngineConfig;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        Arc::new(Orchestrator::new(EngineConfig::default(), "https://catalog.invalid".to_string()).unwrap())
    }

    #[tokio::test]
    async fn empty_query_is_bad_request() {
        let app = build_router(test_state());
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
    async fn healthz_returns_ok() {
        let app = build_router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn get_search_uses_fallback_descriptors_and_succeeds() {
        let app = build_router(test_state());
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
    }
}
