//! HTTP request handlers.

use super::rss::render_feed;
use super::AppState;
use crate::heartbeat::{get_aggregated_heartbeat, HeartbeatError};

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;

/// Number of records listed in the RSS feed.
const RSS_LIMIT: usize = 100;

fn error_response(status: StatusCode, detail: String) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

// ============================================================================
// Health
// ============================================================================

pub async fn handle_health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn handle_version() -> impl IntoResponse {
    Json(json!({
        "api_version": env!("CARGO_PKG_VERSION"),
        "status": "ok",
    }))
}

// ============================================================================
// API: Configuration
// ============================================================================

pub async fn handle_get_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "configuration": state.config.configuration }))
}

// ============================================================================
// API: Heartbeat
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct HeartbeatQuery {
    pub monitor_name: String,
    #[serde(default = "default_interval")]
    pub interval: String,
    #[serde(default = "default_hours")]
    pub hours: i64,
}

fn default_interval() -> String {
    "all".to_string()
}

fn default_hours() -> i64 {
    24
}

pub async fn handle_get_heartbeat(
    State(state): State<AppState>,
    Query(query): Query<HeartbeatQuery>,
) -> Response {
    let result = get_aggregated_heartbeat(
        state.store.as_ref(),
        &state.config.configuration,
        &query.monitor_name,
        &query.interval,
        query.hours,
    );

    match result {
        Ok(summary) => Json(summary).into_response(),
        Err(e @ (HeartbeatError::InvalidInterval(_) | HeartbeatError::InvalidWindow(_))) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e @ HeartbeatError::NotFound(_)) => error_response(StatusCode::NOT_FOUND, e.to_string()),
        Err(e @ HeartbeatError::Storage(_)) => {
            tracing::error!("Heartbeat query failed for {}: {}", query.monitor_name, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

// ============================================================================
// RSS
// ============================================================================

pub async fn handle_rss(State(state): State<AppState>) -> Response {
    let records = match state.store.query_recent(RSS_LIMIT) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to load records for RSS feed: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    let feed = render_feed(&records, &state.config.monitors);

    (
        [(header::CONTENT_TYPE, "application/rss+xml; charset=utf-8")],
        feed,
    )
        .into_response()
}
