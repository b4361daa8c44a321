// HTTP request handlers
use crate::infrastructure::event_stream::dashboard_sse;
use crate::infrastructure::http_response::json_error;
use crate::infrastructure::json_mapper::dashboard_to_view;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Full record log, oldest first. The client does its own filtering.
pub async fn live_data(State(state): State<Arc<AppState>>) -> Response {
    match state.store.all_samples().await {
        Ok(samples) => Json(samples).into_response(),
        Err(e) => {
            tracing::error!("Error fetching samples: {}", e);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch data")
        }
    }
}

/// Most recent dashboard cycle
pub async fn dashboard(State(state): State<Arc<AppState>>) -> Response {
    let latest = state.latest.borrow().clone();
    match latest {
        Some(update) => Json(dashboard_to_view(&update)).into_response(),
        None => json_error(StatusCode::SERVICE_UNAVAILABLE, "Dashboard not ready"),
    }
}

/// Push every dashboard cycle as it completes
pub async fn stream_dashboard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    dashboard_sse(state.updates.subscribe())
}
