//! MongoDB-backed stores for the ledger, waitlist and reports

use bson::doc;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::db::mongo::{MongoClient, MongoCollection};
use crate::db::schemas::{
    EarlyAdopterDoc, ReportDoc, UsageRecordDoc, EARLY_ADOPTER_COLLECTION, REPORT_COLLECTION,
    USAGE_RECORD_COLLECTION,
};
use crate::ledger::{ActionKind, ClientId, StoreError, UsageRecord, UsageStore};
use crate::reports::{ReportStore, StoredReport};
use crate::types::ValidatorError;
use crate::waitlist::{EarlyAdopterEntry, WaitlistError, WaitlistStore};

/// Attempts at claiming a waitlist position before giving up
const MAX_POSITION_ATTEMPTS: u32 = 5;

/// System-of-record store over three MongoDB collections
#[derive(Clone)]
pub struct MongoStore {
    usage: MongoCollection<UsageRecordDoc>,
    adopters: MongoCollection<EarlyAdopterDoc>,
    reports: MongoCollection<ReportDoc>,
}

impl MongoStore {
    /// Open the collections, creating their indexes
    pub async fn new(client: &MongoClient) -> Result<Self, ValidatorError> {
        Ok(Self {
            usage: client.collection(USAGE_RECORD_COLLECTION).await?,
            adopters: client.collection(EARLY_ADOPTER_COLLECTION).await?,
            reports: client.collection(REPORT_COLLECTION).await?,
        })
    }
}

#[async_trait::async_trait]
impl UsageStore for MongoStore {
    async fn append(&self, record: &UsageRecord) -> Result<(), StoreError> {
        self.usage.insert_one(UsageRecordDoc::from(record)).await?;
        Ok(())
    }

    async fn count_since(
        &self,
        client_id: &ClientId,
        action: ActionKind,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let filter = doc! {
            "client_id": client_id.as_str(),
            "action": action.as_str(),
            "timestamp": { "$gte": bson::DateTime::from_chrono(since) },
        };
        Ok(self.usage.count(filter).await?)
    }

    async fn is_early_adopter(&self, client_id: &ClientId) -> Result<bool, StoreError> {
        let found = self
            .adopters
            .find_one(doc! { "client_id": client_id.as_str() }, None)
            .await?;
        Ok(found.is_some())
    }
}

#[async_trait::async_trait]
impl WaitlistStore for MongoStore {
    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.adopters.count(doc! {}).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<EarlyAdopterEntry>, StoreError> {
        let found = self.adopters.find_one(doc! { "email": email }, None).await?;
        Ok(found.map(EarlyAdopterEntry::from))
    }

    async fn find_by_client(
        &self,
        client_id: &ClientId,
    ) -> Result<Option<EarlyAdopterEntry>, StoreError> {
        let found = self
            .adopters
            .find_one(doc! { "client_id": client_id.as_str() }, None)
            .await?;
        Ok(found.map(EarlyAdopterEntry::from))
    }

    async fn insert(
        &self,
        mut entry: EarlyAdopterEntry,
    ) -> Result<EarlyAdopterEntry, WaitlistError> {
        // `position` is uniquely indexed; a conflict that is not a duplicate
        // email or client means a concurrent join took the position first.
        for attempt in 1..=MAX_POSITION_ATTEMPTS {
            entry.position = u32::try_from(WaitlistStore::count(self).await? + 1)
                .unwrap_or(u32::MAX);

            match self.adopters.insert_one(EarlyAdopterDoc::from(&entry)).await {
                Ok(_) => return Ok(entry),
                Err(ValidatorError::Conflict(msg)) => {
                    debug!(email = %entry.email, attempt, "Waitlist insert conflict: {}", msg);
                    let existing = match self.find_by_email(&entry.email).await? {
                        Some(e) => Some(e),
                        None => self.find_by_client(&entry.client_id).await?,
                    };
                    if let Some(existing) = existing {
                        return Err(WaitlistError::AlreadyJoined {
                            position: existing.position,
                        });
                    }
                }
                Err(e) => return Err(WaitlistError::Store(e.into())),
            }
        }

        Err(WaitlistError::Store(StoreError(format!(
            "no free waitlist position after {} attempts",
            MAX_POSITION_ATTEMPTS
        ))))
    }

    async fn list(&self) -> Result<Vec<EarlyAdopterEntry>, StoreError> {
        let docs = self
            .adopters
            .find_many(doc! {}, Some(doc! { "position": 1 }))
            .await?;
        Ok(docs.into_iter().map(EarlyAdopterEntry::from).collect())
    }
}

#[async_trait::async_trait]
impl ReportStore for MongoStore {
    async fn save(&self, report: &StoredReport) -> Result<(), StoreError> {
        self.reports.insert_one(ReportDoc::from(report)).await?;
        Ok(())
    }

    async fn get(&self, report_id: &str) -> Result<Option<StoredReport>, StoreError> {
        let found = self
            .reports
            .find_one(doc! { "report_id": report_id }, None)
            .await?;
        Ok(found.map(StoredReport::from))
    }

    async fn latest_for(
        &self,
        requester_id: &str,
        topic: &str,
        audience: &str,
    ) -> Result<Option<StoredReport>, StoreError> {
        let filter = doc! {
            "requester_id": requester_id,
            "topic": topic,
            "audience": audience,
        };
        let found = self
            .reports
            .find_one(filter, Some(doc! { "created_at": -1 }))
            .await?;
        Ok(found.map(StoredReport::from))
    }

    async fn list_for_requester(&self, requester_id: &str) -> Result<Vec<StoredReport>, StoreError> {
        let docs = self
            .reports
            .find_many(
                doc! { "requester_id": requester_id },
                Some(doc! { "created_at": -1 }),
            )
            .await?;
        Ok(docs.into_iter().map(StoredReport::from).collect())
    }
}
