//! Periodic and on-demand mirroring of upstream launches into the mission store.
//!
//! A pass walks `Idle → Fetching → Normalizing → Upserting → Idle`. Passes
//! are started once at startup, on a fixed interval, and whenever
//! [`MissionSync::trigger`] is called. Passes are not serialized against
//! each other; the store's upsert is atomic per row, so overlapping passes
//! resolve as last-writer-wins.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::mission_store::{MissionStore, SharedMissionStore};
use crate::upstream::{normalize_launches, ApiClient};

/// Where the most recently advanced pass currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    #[default]
    Idle,
    Fetching,
    Normalizing,
    Upserting,
}

/// Outcome of a single synchronization pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// False when the upstream returned nothing usable this pass
    pub upstream_available: bool,
    /// Raw records received
    pub fetched: usize,
    /// Records rejected by normalization
    pub dropped: usize,
    /// Normalized records skipped for a blank name or status
    pub skipped: usize,
    pub upserted: usize,
    /// Records whose upsert failed
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SyncReport {
    fn started() -> Self {
        Self {
            upstream_available: false,
            fetched: 0,
            dropped: 0,
            skipped: 0,
            upserted: 0,
            failed: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }
}

/// Snapshot of the synchronizer for status endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub phase: SyncPhase,
    pub completed_passes: u64,
    pub last_report: Option<SyncReport>,
}

/// Mirrors the upstream launch list into the mission store.
pub struct MissionSync {
    client: ApiClient,
    store: SharedMissionStore,
    launches_url: String,
    api_key: Option<String>,
    phase: RwLock<SyncPhase>,
    completed_passes: AtomicU64,
    last_report: RwLock<Option<SyncReport>>,
    /// Raw body of the last successful fetch, served by the launches proxy
    /// when the upstream is down.
    last_payload: RwLock<Option<Arc<Value>>>,
}

impl MissionSync {
    pub fn new(
        client: ApiClient,
        store: SharedMissionStore,
        launches_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            store,
            launches_url: launches_url.into(),
            api_key,
            phase: RwLock::new(SyncPhase::Idle),
            completed_passes: AtomicU64::new(0),
            last_report: RwLock::new(None),
            last_payload: RwLock::new(None),
        }
    }

    /// Run one full pass. Never fails: upstream and store problems are
    /// logged and reflected in the returned report.
    pub async fn run_once(&self) -> SyncReport {
        let mut report = SyncReport::started();

        self.set_phase(SyncPhase::Fetching).await;
        let fetched = self
            .client
            .fetch_json(&self.launches_url, self.api_key.as_deref())
            .await;

        match fetched {
            Some(payload) => {
                report.upstream_available = true;
                self.apply(payload, &mut report).await;
            }
            None => {
                tracing::warn!(
                    "No launch data from {}; skipping this sync cycle",
                    self.launches_url
                );
            }
        }

        report.finished_at = Some(Utc::now());
        self.set_phase(SyncPhase::Idle).await;
        *self.last_report.write().await = Some(report.clone());
        self.completed_passes.fetch_add(1, Ordering::SeqCst);

        tracing::info!(
            "Mission sync finished: fetched={} upserted={} dropped={} skipped={} failed={}",
            report.fetched,
            report.upserted,
            report.dropped,
            report.skipped,
            report.failed
        );
        report
    }

    /// Keep an array `payload` as the last launch list, then normalize it and
    /// upsert every usable record, one at a time.
    async fn apply(&self, payload: Value, report: &mut SyncReport) {
        let payload = Arc::new(payload);
        let Some(raw) = payload.as_array() else {
            tracing::warn!("Expected a JSON array of launches, ignoring payload");
            return;
        };
        *self.last_payload.write().await = Some(Arc::clone(&payload));
        report.fetched = raw.len();

        self.set_phase(SyncPhase::Normalizing).await;
        let missions = normalize_launches(raw);
        report.dropped = raw.len() - missions.len();
        if report.dropped > 0 {
            tracing::info!(
                "Dropped {} launch records missing a name or success flag",
                report.dropped
            );
        }

        self.set_phase(SyncPhase::Upserting).await;
        for mission in missions {
            if !mission.is_complete() {
                tracing::warn!(
                    "Skipping launch record with blank name or status: {:?}",
                    mission.name
                );
                report.skipped += 1;
                continue;
            }

            match self.store.upsert_by_name(&mission).await {
                Ok(stored) => {
                    tracing::debug!("Upserted mission {} (id {})", stored.name, stored.id);
                    report.upserted += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to upsert mission {}: {}", mission.name, e);
                    report.failed += 1;
                }
            }
        }
    }

    /// Start a pass in the background and return immediately.
    pub fn trigger(self: &Arc<Self>) -> JoinHandle<SyncReport> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run_once().await })
    }

    /// Spawn the recurring loop. With `run_immediately` the first pass
    /// starts right away, otherwise after one full `interval`.
    ///
    /// The loop runs for the lifetime of the runtime.
    pub fn spawn_periodic(
        self: &Arc<Self>,
        interval: Duration,
        run_immediately: bool,
    ) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            if !run_immediately {
                // The first tick completes immediately.
                ticker.tick().await;
            }
            loop {
                ticker.tick().await;
                this.run_once().await;
            }
        })
    }

    pub async fn status(&self) -> SyncStatus {
        SyncStatus {
            phase: *self.phase.read().await,
            completed_passes: self.completed_passes.load(Ordering::SeqCst),
            last_report: self.last_report.read().await.clone(),
        }
    }

    pub async fn last_payload(&self) -> Option<Arc<Value>> {
        self.last_payload.read().await.clone()
    }

    async fn set_phase(&self, phase: SyncPhase) {
        *self.phase.write().await = phase;
    }
}
