//! Usage ledger
//!
//! Admission control for metered actions: counts a client's records inside
//! a trailing window and compares them with the ceiling for its tier.
//!
//! ## Failure policy
//!
//! - Count query errors are treated as zero usage (fail-open).
//! - Waitlist lookup errors fall back to the standard tier.
//! - Append errors surface as `LedgerError::RecordFailed`.
//!
//! ## Concurrency
//!
//! `record_usage` checks and then appends as two separate store calls.
//! Two requests from the same client landing in the same instant can both
//! pass the check, so a client may be over-admitted by the number of
//! concurrent requests. Past that, once usage reaches the ceiling every
//! request is rejected.

pub mod client_id;
pub mod store;

pub use client_id::ClientId;
pub use store::{ActionKind, StoreError, UsageRecord, UsageStore};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Quota class of a client
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Standard,
    EarlyAdopter,
}

/// Ceilings per tier and the trailing window they apply to
#[derive(Debug, Clone)]
pub struct QuotaPolicy {
    pub standard_limit: u32,
    pub early_adopter_limit: u32,
    pub window: Duration,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            standard_limit: 3,
            early_adopter_limit: 8,
            window: Duration::days(30),
        }
    }
}

impl QuotaPolicy {
    pub fn limit_for(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Standard => self.standard_limit,
            Tier::EarlyAdopter => self.early_adopter_limit,
        }
    }
}

/// Derived quota state for one client; recomputed on every check
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatus {
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
    pub tier: Tier,
}

impl QuotaStatus {
    fn new(used: u32, tier: Tier, policy: &QuotaPolicy) -> Self {
        let limit = policy.limit_for(tier);
        Self {
            used,
            limit,
            remaining: limit.saturating_sub(used),
            tier,
        }
    }

    pub fn is_early_adopter(&self) -> bool {
        self.tier == Tier::EarlyAdopter
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.limit
    }
}

/// Ledger errors
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// Admission denied; fully user-visible
    #[error("Usage limit reached: {used} of {limit} validations used")]
    QuotaExceeded { used: u32, limit: u32, tier: Tier },

    /// The usage record could not be written
    #[error("Failed to record usage: {0}")]
    RecordFailed(String),
}

/// Trailing-window usage ledger
pub struct UsageLedger {
    store: Arc<dyn UsageStore>,
    policy: QuotaPolicy,
}

impl UsageLedger {
    pub fn new(store: Arc<dyn UsageStore>, policy: QuotaPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }

    /// Read-only quota check. Never fails.
    pub async fn check_quota(&self, client_id: &ClientId) -> QuotaStatus {
        self.check_quota_at(client_id, Utc::now()).await
    }

    /// Quota check as of `now`
    pub async fn check_quota_at(&self, client_id: &ClientId, now: DateTime<Utc>) -> QuotaStatus {
        let since = now - self.policy.window;

        let used = match self
            .store
            .count_since(client_id, ActionKind::Validation, since)
            .await
        {
            Ok(count) => u32::try_from(count).unwrap_or(u32::MAX),
            Err(e) => {
                warn!(client_id = %client_id, error = %e, "Usage count failed, treating as zero usage");
                0
            }
        };

        let tier = match self.store.is_early_adopter(client_id).await {
            Ok(true) => Tier::EarlyAdopter,
            Ok(false) => Tier::Standard,
            Err(e) => {
                warn!(client_id = %client_id, error = %e, "Waitlist lookup failed, using standard tier");
                Tier::Standard
            }
        };

        let status = QuotaStatus::new(used, tier, &self.policy);
        debug!(
            client_id = %client_id,
            used = status.used,
            limit = status.limit,
            "Quota checked"
        );
        status
    }

    /// Admit and record one action, or reject once usage reached the ceiling.
    pub async fn record_usage(&self, client_id: &ClientId) -> Result<QuotaStatus, LedgerError> {
        let current = self.check_quota(client_id).await;

        if current.is_exhausted() {
            info!(
                client_id = %client_id,
                used = current.used,
                limit = current.limit,
                "Quota exceeded"
            );
            return Err(LedgerError::QuotaExceeded {
                used: current.used,
                limit: current.limit,
                tier: current.tier,
            });
        }

        let record = UsageRecord::new(client_id.clone(), ActionKind::Validation);
        self.store
            .append(&record)
            .await
            .map_err(|e| LedgerError::RecordFailed(e.0))?;

        Ok(QuotaStatus::new(current.used + 1, current.tier, &self.policy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Store whose reads and writes can be made to fail
    #[derive(Default)]
    struct FlakyStore {
        fail_count: AtomicBool,
        fail_append: AtomicBool,
        appended: std::sync::Mutex<Vec<UsageRecord>>,
    }

    #[async_trait::async_trait]
    impl UsageStore for FlakyStore {
        async fn append(&self, record: &UsageRecord) -> Result<(), StoreError> {
            if self.fail_append.load(Ordering::SeqCst) {
                return Err(StoreError("write timeout".to_string()));
            }
            self.appended.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn count_since(
            &self,
            client_id: &ClientId,
            action: ActionKind,
            since: DateTime<Utc>,
        ) -> Result<u64, StoreError> {
            if self.fail_count.load(Ordering::SeqCst) {
                return Err(StoreError("connection reset".to_string()));
            }
            let records = self.appended.lock().unwrap();
            Ok(records
                .iter()
                .filter(|r| &r.client_id == client_id && r.action == action && r.timestamp >= since)
                .count() as u64)
        }

        async fn is_early_adopter(&self, _client_id: &ClientId) -> Result<bool, StoreError> {
            Err(StoreError("waitlist unavailable".to_string()))
        }
    }

    fn client() -> ClientId {
        ClientId::supplied("ledger-test").unwrap()
    }

    #[tokio::test]
    async fn test_count_failure_fails_open() {
        let store = Arc::new(FlakyStore::default());
        for _ in 0..3 {
            store
                .append(&UsageRecord::new(client(), ActionKind::Validation))
                .await
                .unwrap();
        }
        store.fail_count.store(true, Ordering::SeqCst);

        let ledger = UsageLedger::new(store.clone(), QuotaPolicy::default());
        let status = ledger.check_quota(&client()).await;
        assert_eq!(status.used, 0);
        assert_eq!(status.remaining, 3);
        assert!(ledger.record_usage(&client()).await.is_ok());
    }

    #[tokio::test]
    async fn test_append_failure_surfaces() {
        let store = Arc::new(FlakyStore::default());
        store.fail_append.store(true, Ordering::SeqCst);

        let ledger = UsageLedger::new(store, QuotaPolicy::default());
        let err = ledger.record_usage(&client()).await.unwrap_err();
        assert!(matches!(err, LedgerError::RecordFailed(_)));
    }

    #[tokio::test]
    async fn test_waitlist_failure_uses_standard_tier() {
        let ledger = UsageLedger::new(Arc::new(FlakyStore::default()), QuotaPolicy::default());
        let status = ledger.check_quota(&client()).await;
        assert_eq!(status.tier, Tier::Standard);
        assert_eq!(status.limit, 3);
    }

    #[test]
    fn test_remaining_saturates() {
        let status = QuotaStatus::new(11, Tier::EarlyAdopter, &QuotaPolicy::default());
        assert_eq!(status.remaining, 0);
        assert!(status.is_exhausted());
    }
}
