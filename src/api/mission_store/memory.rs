//! In-memory mission store (non-persistent).

use super::{
    truncate_timestamp, Mission, MissionFilter, MissionStore, MissionStoreError, NewMission,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    /// Kept in insertion order; ids only ever increase.
    missions: Vec<Mission>,
    next_id: i64,
}

impl Inner {
    fn insert(&mut self, mission: &NewMission) -> Mission {
        self.next_id += 1;
        let stored = mission.clone().into_mission(self.next_id);
        self.missions.push(stored.clone());
        stored
    }
}

#[derive(Clone)]
pub struct InMemoryMissionStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryMissionStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }
}

impl Default for InMemoryMissionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MissionStore for InMemoryMissionStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn create_mission(&self, mission: &NewMission) -> Result<Mission, MissionStoreError> {
        let mut inner = self.inner.write().await;
        if inner.missions.iter().any(|m| m.name == mission.name) {
            return Err(MissionStoreError::Duplicate(mission.name.clone()));
        }
        Ok(inner.insert(mission))
    }

    async fn list_missions(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Mission>, MissionStoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .missions
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_filtered(
        &self,
        filter: &MissionFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Mission>, MissionStoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .missions
            .iter()
            .filter(|m| filter.matches(m))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Mission>, MissionStoreError> {
        let inner = self.inner.read().await;
        Ok(inner.missions.iter().find(|m| m.name == name).cloned())
    }

    async fn upsert_by_name(&self, mission: &NewMission) -> Result<Mission, MissionStoreError> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.missions.iter_mut().find(|m| m.name == mission.name) {
            existing.status = mission.status.clone();
            existing.description = mission.description.clone();
            if let Some(launch_date) = &mission.launch_date {
                existing.launch_date = Some(truncate_timestamp(launch_date));
            }
            return Ok(existing.clone());
        }
        Ok(inner.insert(mission))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_create_assigns_increasing_ids() {
        let store = InMemoryMissionStore::new();
        let a = store
            .create_mission(&NewMission::new("A", "Success"))
            .await
            .expect("create A");
        let b = store
            .create_mission(&NewMission::new("B", "Failure"))
            .await
            .expect("create B");
        assert!(b.id > a.id);
        assert!(!store.is_persistent());
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_name() {
        let store = InMemoryMissionStore::new();
        store
            .create_mission(&NewMission::new("A", "Success"))
            .await
            .expect("create A");

        let err = store
            .create_mission(&NewMission::new("A", "Failure"))
            .await
            .unwrap_err();
        assert!(matches!(err, MissionStoreError::Duplicate(name) if name == "A"));

        let stored = store.find_by_name("A").await.unwrap().unwrap();
        assert_eq!(stored.status, "Success");
    }

    #[tokio::test]
    async fn test_upsert_updates_in_place() {
        let store = InMemoryMissionStore::new();
        let launched = Utc.with_ymd_and_hms(2008, 9, 28, 23, 15, 0).unwrap();
        let first = store
            .upsert_by_name(&NewMission::new("RatSat", "Failure").with_launch_date(launched))
            .await
            .unwrap();
        let second = store
            .upsert_by_name(&NewMission::new("RatSat", "Success").with_description("orbit"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.status, "Success");
        assert_eq!(second.description, "orbit");
        assert_eq!(second.launch_date, Some(launched));
        assert_eq!(store.list_missions(100, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_filtered_pages_after_filtering() {
        let store = InMemoryMissionStore::new();
        for i in 0..6 {
            let name = if i % 2 == 0 {
                format!("Starlink-{}", i)
            } else {
                format!("CRS-{}", i)
            };
            store.create_mission(&NewMission::new(name, "Success")).await.unwrap();
        }

        let filter = MissionFilter::default().with_keyword(Some("starlink"));
        let page = store.list_page(2, 2, &filter).await.unwrap();
        let names: Vec<_> = page.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Starlink-4"]);
    }

    #[tokio::test]
    async fn test_offset_past_the_end_is_empty() {
        let store = InMemoryMissionStore::new();
        for i in 0..3 {
            store
                .create_mission(&NewMission::new(format!("m{}", i), "Success"))
                .await
                .unwrap();
        }

        assert!(store.list_missions(10, usize::MAX).await.unwrap().is_empty());
        let filter = MissionFilter::default();
        assert!(store
            .list_page(usize::MAX / 2, 2, &filter)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_launch_dates_are_stored_at_second_precision() {
        let store = InMemoryMissionStore::new();
        let launched = Utc.timestamp_millis_opt(1_577_836_800_500).unwrap();
        let whole = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();

        let created = store
            .create_mission(&NewMission::new("Tintin A", "Success").with_launch_date(launched))
            .await
            .unwrap();
        assert_eq!(created.launch_date, Some(whole));

        let updated = store
            .upsert_by_name(&NewMission::new("Tintin A", "Success").with_launch_date(launched))
            .await
            .unwrap();
        assert_eq!(updated.launch_date, Some(whole));
        assert_eq!(store.find_by_name("Tintin A").await.unwrap(), Some(created));
    }
}
