// src/api.rs
//! HTTP surface: fetch-cycle triggers (one per source type), feed
//! discovery, and new-source lookup. The cycle endpoints return the
//! aggregated report — callers never see raw errors from inside a cycle.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::channel;
use crate::discover;
use crate::ingest::{run_cycle, IngestDeps};
use crate::model::{CycleReport, DiscoveredFeed, SourceType};
use crate::topics;

#[derive(Clone)]
pub struct AppState {
    pub deps: IngestDeps,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/fetch/rss", post(fetch_rss))
        .route("/fetch/youtube", post(fetch_youtube))
        .route("/fetch/polymarket", post(fetch_polymarket))
        .route("/rss/discover", post(discover_feeds))
        .route("/sources/lookup", post(lookup_source))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn bad_request(message: impl AsRef<str>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message.as_ref() })),
    )
}

fn not_found(message: impl AsRef<str>) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": message.as_ref() })),
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CycleRequest {
    /// Required: there is no implicit default tenant.
    account_id: Option<String>,
    /// Present ⇒ process only this source; absent ⇒ all active of the type.
    source_id: Option<String>,
}

async fn run_cycle_endpoint(
    state: AppState,
    source_type: SourceType,
    body: CycleRequest,
) -> Result<Json<CycleReport>, ApiError> {
    let Some(account_id) = body.account_id.filter(|a| !a.trim().is_empty()) else {
        return Err(bad_request("accountId is required"));
    };
    let report = run_cycle(
        &state.deps,
        source_type,
        &account_id,
        body.source_id.as_deref(),
    )
    .await
    .map_err(|e| bad_request(format!("{e:#}")))?;
    Ok(Json(report))
}

async fn fetch_rss(
    State(state): State<AppState>,
    Json(body): Json<CycleRequest>,
) -> Result<Json<CycleReport>, ApiError> {
    run_cycle_endpoint(state, SourceType::Rss, body).await
}

async fn fetch_youtube(
    State(state): State<AppState>,
    Json(body): Json<CycleRequest>,
) -> Result<Json<CycleReport>, ApiError> {
    run_cycle_endpoint(state, SourceType::Youtube, body).await
}

async fn fetch_polymarket(
    State(state): State<AppState>,
    Json(body): Json<CycleRequest>,
) -> Result<Json<CycleReport>, ApiError> {
    run_cycle_endpoint(state, SourceType::Polymarket, body).await
}

#[derive(Deserialize)]
struct DiscoverRequest {
    url: String,
}

async fn discover_feeds(
    State(state): State<AppState>,
    Json(body): Json<DiscoverRequest>,
) -> Result<Json<discover::Discovery>, ApiError> {
    let result = discover::discover(state.deps.fetcher.as_ref(), &body.url).await;
    if result.feeds.is_empty() {
        return Err(not_found("no feeds found for that url"));
    }
    Ok(Json(result))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest {
    account_id: Option<String>,
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggested_topic_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    feeds: Vec<DiscoveredFeed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_title: Option<String>,
}

fn is_youtube_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.contains("youtube.com") || lower.contains("youtu.be")
}

/// Pre-creation helper for the "add source" flow: resolve a YouTube channel
/// ID, or discover feeds for a plain site, and suggest a topic from whatever
/// text we have.
async fn lookup_source(
    State(state): State<AppState>,
    Json(body): Json<LookupRequest>,
) -> Result<Json<LookupResponse>, ApiError> {
    let Some(account_id) = body.account_id.filter(|a| !a.trim().is_empty()) else {
        return Err(bad_request("accountId is required"));
    };

    let mut channel_id = None;
    let mut feeds = Vec::new();
    let mut page_title = None;

    if is_youtube_url(&body.url) {
        channel_id = channel::resolve_channel_id(
            state.deps.fetcher.as_ref(),
            state.deps.youtube_api_key.as_deref(),
            &body.url,
        )
        .await;
    } else {
        let found = discover::discover(state.deps.fetcher.as_ref(), &body.url).await;
        feeds = found.feeds;
        page_title = found.page_title;
    }

    let suggested_topic_id = {
        let title = body.title.as_deref().or(page_title.as_deref()).unwrap_or("");
        let description = body.description.as_deref().unwrap_or("");
        match state.deps.store.list_topics(&account_id).await {
            Ok(existing) => topics::suggest_topic(title, description, &existing),
            Err(_) => None,
        }
    };

    if channel_id.is_none() && feeds.is_empty() && suggested_topic_id.is_none() {
        return Err(not_found("nothing found for that url"));
    }

    Ok(Json(LookupResponse {
        channel_id,
        suggested_topic_id,
        feeds,
        page_title,
    }))
}
