use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, info, warn};

use super::render::NO_DATA_MESSAGE;
use super::state::AppState;
use crate::domain::Snapshot;

/// Current snapshot, kicking off a background refresh when it is getting old.
///
/// With nothing cached, the first caller after startup refreshes inline; everyone else
/// gets `None` and a background refresh is requested.
async fn current_snapshot(state: &AppState) -> Option<Snapshot> {
    if let Some(snapshot) = state.cache.read() {
        if state.cache.needs_refresh() && state.refresher.trigger() {
            debug!("Snapshot nearing expiry; background refresh started");
        }
        return Some(snapshot);
    }

    if !state.refresher.is_running() && state.take_startup_fallback() {
        info!("No cached rankings yet; refreshing inline");
        match state.refresher.refresh().await {
            Ok(snapshot) => return Some(snapshot),
            Err(e) => warn!("Inline refresh failed: {}", e),
        }
    } else if state.refresher.trigger() {
        debug!("No cached rankings; background refresh started");
    }

    None
}

/// GET / -- ranking page
pub async fn index(State(state): State<AppState>) -> Response {
    match current_snapshot(&state).await {
        Some(snapshot) => Html(state.presenter.render(&snapshot)).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, NO_DATA_MESSAGE).into_response(),
    }
}

/// GET /rankings.json -- the snapshot as JSON
pub async fn rankings_json(State(state): State<AppState>) -> Response {
    match current_snapshot(&state).await {
        Some(snapshot) => Json(snapshot).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": NO_DATA_MESSAGE })),
        )
            .into_response(),
    }
}

/// GET /health -- liveness probe, independent of scrape state
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
