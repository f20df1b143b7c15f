//! Mission catalogue endpoints.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

use super::mission_store::{Mission, MissionFilter, MissionStore, MissionStoreError, NewMission};
use super::routes::AppState;
use super::types::*;

fn internal_error(e: MissionStoreError) -> (StatusCode, String) {
    tracing::error!("Mission store error: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// Parse a date filter bound.
///
/// A bare date covers the start of the day, or its last second when
/// `end_of_day` is set.
fn parse_date_bound(
    name: &str,
    raw: &str,
    end_of_day: bool,
) -> Result<DateTime<Utc>, (StatusCode, String)> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    let invalid = || {
        (
            StatusCode::BAD_REQUEST,
            format!("Invalid {}: expected YYYY-MM-DD or an RFC 3339 timestamp", name),
        )
    };
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| invalid())?;
    let (h, m, s) = if end_of_day { (23, 59, 59) } else { (0, 0, 0) };
    date.and_hms_opt(h, m, s)
        .map(|dt| dt.and_utc())
        .ok_or_else(invalid)
}

fn optional_bound(
    name: &str,
    raw: Option<&str>,
    end_of_day: bool,
) -> Result<Option<DateTime<Utc>>, (StatusCode, String)> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => parse_date_bound(name, value, end_of_day).map(Some),
        None => Ok(None),
    }
}

/// GET /missions/ - List missions, plain or paged/filtered.
pub(super) async fn list_missions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListMissionsQuery>,
) -> Result<Json<MissionListResponse>, (StatusCode, String)> {
    if !query.is_paged() {
        let skip = query.skip.unwrap_or(0);
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
        let missions = state
            .missions
            .list_missions(limit, skip)
            .await
            .map_err(internal_error)?;
        return Ok(Json(MissionListResponse::Plain(missions)));
    }

    let page = query.page.unwrap_or(1);
    if page == 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "page must be at least 1".to_string(),
        ));
    }
    let size = query.size.unwrap_or(DEFAULT_PAGE_SIZE);
    if size == 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "size must be at least 1".to_string(),
        ));
    }
    let size = size.min(MAX_PAGE_SIZE);

    let filter = MissionFilter {
        start_date: optional_bound("start_date", query.start_date.as_deref(), false)?,
        end_date: optional_bound("end_date", query.end_date.as_deref(), true)?,
        keyword: None,
    }
    .with_keyword(query.keyword.as_deref());

    if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
        if start > end {
            return Err((
                StatusCode::BAD_REQUEST,
                "start_date must not be after end_date".to_string(),
            ));
        }
    }

    let missions = state
        .missions
        .list_page(page, size, &filter)
        .await
        .map_err(internal_error)?;

    Ok(Json(MissionListResponse::Paged(MissionPage {
        missions,
        page,
        size,
    })))
}

/// POST /missions/ - Create a mission, rejecting names already in use.
pub(super) async fn create_mission(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMissionRequest>,
) -> Result<Json<Mission>, (StatusCode, String)> {
    let mission = NewMission::from(req);
    if !mission.is_complete() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Mission name and status must not be empty".to_string(),
        ));
    }

    let existing = state
        .missions
        .find_by_name(&mission.name)
        .await
        .map_err(internal_error)?;
    if existing.is_some() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Mission already exists".to_string(),
        ));
    }

    match state.missions.create_mission(&mission).await {
        Ok(created) => {
            tracing::info!("Created mission {} (id {})", created.name, created.id);
            Ok(Json(created))
        }
        // Lost a race with another create or a sync pass.
        Err(MissionStoreError::Duplicate(_)) => Err((
            StatusCode::BAD_REQUEST,
            "Mission already exists".to_string(),
        )),
        Err(e) => Err(internal_error(e)),
    }
}
