//! Mission storage module with pluggable backends.
//!
//! Supports:
//! - `memory`: In-memory storage (non-persistent, for testing)
//! - `sqlite`: SQLite database (default)

mod memory;
mod sqlite;

pub use memory::InMemoryMissionStore;
pub use sqlite::SqliteMissionStore;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Placeholder stored when a mission has no description.
pub const DEFAULT_DESCRIPTION: &str = "No description available.";

/// A persisted mission record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mission {
    /// Store-assigned identifier, immutable once created
    pub id: i64,
    /// Natural key used for upserts
    pub name: String,
    pub status: String,
    pub description: String,
    pub launch_date: Option<DateTime<Utc>>,
}

/// Payload for inserting or upserting a mission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMission {
    pub name: String,
    pub status: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default)]
    pub launch_date: Option<DateTime<Utc>>,
}

fn default_description() -> String {
    DEFAULT_DESCRIPTION.to_string()
}

impl NewMission {
    pub fn new(name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: status.into(),
            description: default_description(),
            launch_date: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_launch_date(mut self, launch_date: DateTime<Utc>) -> Self {
        self.launch_date = Some(launch_date);
        self
    }

    /// Whether both required fields carry a non-blank value.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.status.trim().is_empty()
    }

    fn into_mission(self, id: i64) -> Mission {
        Mission {
            id,
            name: self.name,
            status: self.status,
            description: self.description,
            launch_date: self.launch_date.as_ref().map(truncate_timestamp),
        }
    }
}

/// Optional constraints applied when listing missions.
///
/// Date bounds are inclusive and only match missions that have a launch
/// date. The keyword is a case-insensitive substring match against the
/// name or the description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissionFilter {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub keyword: Option<String>,
}

impl MissionFilter {
    /// Set the keyword, ignoring blank input.
    pub fn with_keyword(mut self, keyword: Option<&str>) -> Self {
        self.keyword = keyword
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none() && self.keyword.is_none()
    }

    pub fn matches(&self, mission: &Mission) -> bool {
        if self.start_date.is_some() || self.end_date.is_some() {
            let Some(launch_date) = mission.launch_date else {
                return false;
            };
            let launch_date = truncate_timestamp(&launch_date);
            if self
                .start_date
                .is_some_and(|start| launch_date < truncate_timestamp(&start))
            {
                return false;
            }
            if self
                .end_date
                .is_some_and(|end| launch_date > truncate_timestamp(&end))
            {
                return false;
            }
        }

        if let Some(keyword) = &self.keyword {
            let needle = keyword.to_lowercase();
            return mission.name.to_lowercase().contains(&needle)
                || mission.description.to_lowercase().contains(&needle);
        }

        true
    }
}

/// Errors surfaced by mission stores.
#[derive(Debug, Error)]
pub enum MissionStoreError {
    #[error("Mission already exists: {0}")]
    Duplicate(String),

    #[error("Mission store failure: {0}")]
    Backend(String),
}

/// Format a timestamp the way stores persist it.
///
/// Second precision with a `Z` suffix keeps lexical and chronological order
/// identical, which the SQLite date filters rely on.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Drop sub-second precision, matching what [`format_timestamp`] persists.
pub fn truncate_timestamp(value: &DateTime<Utc>) -> DateTime<Utc> {
    value.with_nanosecond(0).unwrap_or(*value)
}

/// Translate a 1-based page number and page size into `(limit, offset)`.
pub fn page_bounds(page: usize, size: usize) -> (usize, usize) {
    (size, page.saturating_sub(1).saturating_mul(size))
}

/// Mission store trait - implemented by all storage backends.
#[async_trait]
pub trait MissionStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// Insert a new mission. No duplicate pre-check is done here; a name
    /// collision surfaces as [`MissionStoreError::Duplicate`].
    async fn create_mission(&self, mission: &NewMission) -> Result<Mission, MissionStoreError>;

    /// List missions in insertion order.
    async fn list_missions(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Mission>, MissionStoreError>;

    /// List missions in insertion order, restricted by `filter`.
    async fn list_filtered(
        &self,
        filter: &MissionFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Mission>, MissionStoreError>;

    /// Exact-match lookup by name.
    async fn find_by_name(&self, name: &str) -> Result<Option<Mission>, MissionStoreError>;

    /// Insert the mission, or overwrite the mutable fields of the row that
    /// already carries its name. A missing launch date keeps the stored one.
    async fn upsert_by_name(&self, mission: &NewMission) -> Result<Mission, MissionStoreError>;

    /// List one page (1-based) of missions matching `filter`.
    async fn list_page(
        &self,
        page: usize,
        size: usize,
        filter: &MissionFilter,
    ) -> Result<Vec<Mission>, MissionStoreError> {
        let (limit, offset) = page_bounds(page, size);
        self.list_filtered(filter, limit, offset).await
    }
}

pub type SharedMissionStore = Arc<dyn MissionStore>;

/// Mission store type selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissionStoreType {
    Memory,
    #[default]
    Sqlite,
}

impl MissionStoreType {
    /// Parse from environment variable value.
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "memory" | "mem" => Self::Memory,
            "sqlite" | "db" => Self::Sqlite,
            _ => Self::default(),
        }
    }
}

/// Create a mission store based on type and configuration.
pub async fn create_mission_store(
    store_type: MissionStoreType,
    database_path: PathBuf,
) -> Result<SharedMissionStore, MissionStoreError> {
    match store_type {
        MissionStoreType::Memory => Ok(Arc::new(InMemoryMissionStore::new())),
        MissionStoreType::Sqlite => {
            let store = SqliteMissionStore::new(database_path).await?;
            Ok(Arc::new(store))
        }
    }
}
