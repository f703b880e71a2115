use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::storage::StorageError;

/// Create the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts))
        .route("/posts/:id", get(post_by_id))
        .route("/categories", get(categories))
        .route("/stats", get(stats))
        .route("/search", get(search))
        .route("/healthz", get(health))
}

// Pagination params arrive as strings and are parsed leniently: garbage like
// `limit=abc` falls through to the service defaults instead of a 400.
#[derive(Debug, Deserialize)]
struct ListParams {
    category: Option<String>,
    limit: Option<String>,
    offset: Option<String>,
}

impl ListParams {
    fn limit(&self) -> Option<i64> {
        self.limit.as_deref().and_then(|v| v.parse().ok())
    }

    fn offset(&self) -> Option<i64> {
        self.offset.as_deref().and_then(|v| v.parse().ok())
    }
}

async fn list_posts(State(state): State<AppState>, Query(params): Query<ListParams>) -> Response {
    match state
        .query
        .get_posts(params.category.as_deref(), params.limit(), params.offset())
        .await
    {
        Ok(page) => Json(page).into_response(),
        Err(e) => internal_error(&e),
    }
}

async fn post_by_id(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.query.get_post(id).await {
        Ok(Some(post)) => Json(post).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "post not found" })),
        )
            .into_response(),
        Err(e) => internal_error(&e),
    }
}

async fn categories(State(state): State<AppState>) -> Response {
    match state.query.get_categories().await {
        Ok(categories) => Json(categories).into_response(),
        Err(e) => internal_error(&e),
    }
}

async fn stats(State(state): State<AppState>) -> Response {
    match state.query.get_stats().await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => internal_error(&e),
    }
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
    category: Option<String>,
}

async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    let query = params.q.unwrap_or_default();
    match state
        .query
        .search(&query, params.category.as_deref())
        .await
    {
        Ok(results) => Json(results).into_response(),
        Err(e) => internal_error(&e),
    }
}

async fn health() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

/// Map any storage failure to a generic 500; internal detail stays in the
/// logs, never in the response body.
fn internal_error(e: &StorageError) -> Response {
    tracing::error!("Query failed: {e}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal server error" })),
    )
        .into_response()
}
