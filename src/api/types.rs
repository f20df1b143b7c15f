//! API request and response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::mission_store::{Mission, NewMission, DEFAULT_DESCRIPTION};

/// Default number of missions per page / list call.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Upper bound on missions returned by a single call.
pub const MAX_PAGE_SIZE: usize = 100;

/// Simple `{"message": ...}` body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Request to create a mission.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMissionRequest {
    pub name: String,

    pub status: String,

    /// Defaults to the placeholder description when omitted or null
    pub description: Option<String>,

    pub launch_date: Option<DateTime<Utc>>,
}

impl From<CreateMissionRequest> for NewMission {
    fn from(req: CreateMissionRequest) -> Self {
        NewMission {
            name: req.name,
            status: req.status,
            description: req
                .description
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            launch_date: req.launch_date,
        }
    }
}

/// Query parameters accepted by `GET /missions/`.
///
/// `skip`/`limit` select the plain listing. Any of `page`, `size`,
/// `start_date`, `end_date` or `keyword` switches to the paged listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListMissionsQuery {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
    /// 1-based page number
    pub page: Option<usize>,
    pub size: Option<usize>,
    /// `YYYY-MM-DD` or RFC 3339, inclusive
    pub start_date: Option<String>,
    /// `YYYY-MM-DD` (whole day) or RFC 3339, inclusive
    pub end_date: Option<String>,
    pub keyword: Option<String>,
}

impl ListMissionsQuery {
    pub fn is_paged(&self) -> bool {
        self.page.is_some()
            || self.size.is_some()
            || self.start_date.is_some()
            || self.end_date.is_some()
            || self.keyword.is_some()
    }
}

/// One page of a filtered listing.
#[derive(Debug, Clone, Serialize)]
pub struct MissionPage {
    pub missions: Vec<Mission>,
    pub page: usize,
    pub size: usize,
}

/// Body of `GET /missions/`: a bare list or a page object.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MissionListResponse {
    Plain(Vec<Mission>),
    Paged(MissionPage),
}
