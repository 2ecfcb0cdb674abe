//! In-process store for dev mode and tests
//!
//! Not durable. Used when MongoDB is unreachable in dev mode.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::ledger::{ActionKind, ClientId, StoreError, UsageRecord, UsageStore};
use crate::reports::{ReportStore, StoredReport};
use crate::waitlist::{EarlyAdopterEntry, WaitlistError, WaitlistStore};

#[derive(Default)]
pub struct MemoryStore {
    /// Usage records keyed by client id
    usage: DashMap<ClientId, Vec<UsageRecord>>,
    /// Waitlist entries in position order
    adopters: RwLock<Vec<EarlyAdopterEntry>>,
    /// Reports keyed by report id
    reports: DashMap<String, StoredReport>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UsageStore for MemoryStore {
    async fn append(&self, record: &UsageRecord) -> Result<(), StoreError> {
        self.usage
            .entry(record.client_id.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn count_since(
        &self,
        client_id: &ClientId,
        action: ActionKind,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let count = self
            .usage
            .get(client_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.action == action && r.timestamp >= since)
                    .count()
            })
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn is_early_adopter(&self, client_id: &ClientId) -> Result<bool, StoreError> {
        let adopters = self.adopters.read().await;
        Ok(adopters.iter().any(|e| &e.client_id == client_id))
    }
}

#[async_trait::async_trait]
impl WaitlistStore for MemoryStore {
    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.adopters.read().await.len() as u64)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<EarlyAdopterEntry>, StoreError> {
        let adopters = self.adopters.read().await;
        Ok(adopters.iter().find(|e| e.email == email).cloned())
    }

    async fn find_by_client(
        &self,
        client_id: &ClientId,
    ) -> Result<Option<EarlyAdopterEntry>, StoreError> {
        let adopters = self.adopters.read().await;
        Ok(adopters.iter().find(|e| &e.client_id == client_id).cloned())
    }

    async fn insert(
        &self,
        mut entry: EarlyAdopterEntry,
    ) -> Result<EarlyAdopterEntry, WaitlistError> {
        // Duplicate check and position assignment under one write lock
        let mut adopters = self.adopters.write().await;
        if let Some(existing) = adopters
            .iter()
            .find(|e| e.email == entry.email || e.client_id == entry.client_id)
        {
            return Err(WaitlistError::AlreadyJoined {
                position: existing.position,
            });
        }
        entry.position = u32::try_from(adopters.len() + 1).unwrap_or(u32::MAX);
        adopters.push(entry.clone());
        Ok(entry)
    }

    async fn list(&self) -> Result<Vec<EarlyAdopterEntry>, StoreError> {
        let mut entries = self.adopters.read().await.clone();
        entries.sort_by_key(|e| e.position);
        Ok(entries)
    }
}

#[async_trait::async_trait]
impl ReportStore for MemoryStore {
    async fn save(&self, report: &StoredReport) -> Result<(), StoreError> {
        if self.reports.contains_key(&report.report_id) {
            return Err(StoreError(format!(
                "report {} already exists",
                report.report_id
            )));
        }
        self.reports.insert(report.report_id.clone(), report.clone());
        Ok(())
    }

    async fn get(&self, report_id: &str) -> Result<Option<StoredReport>, StoreError> {
        Ok(self.reports.get(report_id).map(|r| r.value().clone()))
    }

    async fn latest_for(
        &self,
        requester_id: &str,
        topic: &str,
        audience: &str,
    ) -> Result<Option<StoredReport>, StoreError> {
        Ok(self
            .reports
            .iter()
            .filter(|r| r.requester_id == requester_id && r.topic == topic && r.audience == audience)
            .max_by_key(|r| r.created_at)
            .map(|r| r.value().clone()))
    }

    async fn list_for_requester(&self, requester_id: &str) -> Result<Vec<StoredReport>, StoreError> {
        let mut reports: Vec<StoredReport> = self
            .reports
            .iter()
            .filter(|r| r.requester_id == requester_id)
            .map(|r| r.value().clone())
            .collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn entry(email: &str, client: &str, position: u32) -> EarlyAdopterEntry {
        EarlyAdopterEntry {
            email: email.to_string(),
            client_id: ClientId::supplied(client).unwrap(),
            position,
            profile: json!({}),
            joined_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_count_since_respects_window_and_client() {
        let store = MemoryStore::new();
        let alice = ClientId::supplied("alice").unwrap();
        let bob = ClientId::supplied("bob").unwrap();

        let mut old = UsageRecord::new(alice.clone(), ActionKind::Validation);
        old.timestamp = Utc::now() - Duration::days(31);
        store.append(&old).await.unwrap();
        store
            .append(&UsageRecord::new(alice.clone(), ActionKind::Validation))
            .await
            .unwrap();
        store
            .append(&UsageRecord::new(bob, ActionKind::Validation))
            .await
            .unwrap();

        let since = Utc::now() - Duration::days(30);
        let count = store
            .count_since(&alice, ActionKind::Validation, since)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_waitlist_insert_rejects_duplicates() {
        let store = MemoryStore::new();
        let first = store.insert(entry("a@example.com", "a", 0)).await.unwrap();
        assert_eq!(first.position, 1);

        let dup_email = store.insert(entry("a@example.com", "b", 0)).await;
        assert!(matches!(
            dup_email,
            Err(WaitlistError::AlreadyJoined { position: 1 })
        ));

        let dup_client = store.insert(entry("b@example.com", "a", 0)).await;
        assert!(matches!(
            dup_client,
            Err(WaitlistError::AlreadyJoined { position: 1 })
        ));

        assert_eq!(WaitlistStore::count(&store).await.unwrap(), 1);
        assert!(store
            .is_early_adopter(&ClientId::supplied("a").unwrap())
            .await
            .unwrap());
    }

    #[test]
    fn test_empty_store_counts_zero() {
        let store = MemoryStore::new();
        let count = tokio_test::block_on(store.count_since(
            &ClientId::supplied("nobody").unwrap(),
            ActionKind::Validation,
            Utc::now() - Duration::days(30),
        ))
        .unwrap();
        assert_eq!(count, 0);
    }

    fn stored(requester: &str, topic: &str, audience: &str, age_days: i64) -> StoredReport {
        let report = crate::normalizer::normalize(&crate::routes::test_support::report_json(3)).unwrap();
        let mut stored = StoredReport::new(
            requester.to_string(),
            topic.to_string(),
            audience.to_string(),
            report,
        );
        stored.created_at = Utc::now() - Duration::days(age_days);
        stored
    }

    #[tokio::test]
    async fn test_reports_listed_newest_first() {
        let store = MemoryStore::new();
        let oldest = stored("cid:a", "Rust", "Pythonistas", 9);
        let newest = stored("cid:a", "Go", "Pythonistas", 1);
        let middle = stored("cid:a", "Rust", "Gophers", 4);
        for r in [&oldest, &newest, &middle, &stored("cid:b", "Rust", "Pythonistas", 0)] {
            store.save(r).await.unwrap();
        }

        let ids: Vec<String> = store
            .list_for_requester("cid:a")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.report_id)
            .collect();
        assert_eq!(ids, vec![newest.report_id, middle.report_id, oldest.report_id]);
    }

    #[tokio::test]
    async fn test_latest_for_matches_topic_and_audience() {
        let store = MemoryStore::new();
        let old = stored("cid:a", "Rust", "Pythonistas", 7);
        let recent = stored("cid:a", "Rust", "Pythonistas", 2);
        let other_audience = stored("cid:a", "Rust", "Gophers", 0);
        let other_requester = stored("cid:b", "Rust", "Pythonistas", 0);
        for r in [&old, &recent, &other_audience, &other_requester] {
            store.save(r).await.unwrap();
        }

        let latest = store.latest_for("cid:a", "Rust", "Pythonistas").await.unwrap().unwrap();
        assert_eq!(latest.report_id, recent.report_id);
        assert!(store.latest_for("cid:a", "Go", "Pythonistas").await.unwrap().is_none());
    }
}
