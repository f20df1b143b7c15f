//! Upstream proxy and synchronization endpoints.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use super::routes::AppState;
use super::types::MessageResponse;
use crate::sync::SyncStatus;

/// GET /spacex-launches/ - Live launch list, or the last synced copy.
pub(super) async fn spacex_launches(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let upstream = &state.config.upstream;
    if let Some(launches) = state
        .upstream
        .fetch_json(&upstream.spacex_url, upstream.spacex_api_key.as_deref())
        .await
    {
        return Ok(Json(launches));
    }

    if let Some(cached) = state.sync.last_payload().await {
        tracing::debug!("SpaceX API unavailable, serving launches from the last sync");
        return Ok(Json(cached.as_ref().clone()));
    }

    Err((
        StatusCode::NOT_FOUND,
        "SpaceX launches not found!".to_string(),
    ))
}

/// GET /nasa-apod/ - NASA Astronomy Picture of the Day.
pub(super) async fn nasa_apod(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let upstream = &state.config.upstream;
    state
        .upstream
        .fetch_json(&upstream.nasa_url, upstream.nasa_api_key.as_deref())
        .await
        .map(Json)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                "NASA picture of the day not found!".to_string(),
            )
        })
}

/// POST /update-missions/ - Start a sync pass without waiting for it.
pub(super) async fn update_missions(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    let _ = state.sync.trigger();
    Json(MessageResponse::new(
        "Mission update started in the background.",
    ))
}

/// GET /sync-status/ - Current phase and the last pass report.
pub(super) async fn sync_status(State(state): State<Arc<AppState>>) -> Json<SyncStatus> {
    Json(state.sync.status().await)
}
