//! Storage boundary for the usage ledger
//!
//! Implementations: `db::MongoStore` (system of record) and
//! `db::MemoryStore` (dev mode and tests).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ClientId;

/// Metered action kinds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// One content validation (provider call + report)
    Validation,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
        }
    }
}

/// One append-only accounting entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageRecord {
    pub client_id: ClientId,
    pub action: ActionKind,
    pub timestamp: DateTime<Utc>,
}

impl UsageRecord {
    pub fn new(client_id: ClientId, action: ActionKind) -> Self {
        Self {
            client_id,
            action,
            timestamp: Utc::now(),
        }
    }
}

/// Storage failure reported by a store implementation
#[derive(Debug, Clone, Error)]
#[error("storage error: {0}")]
pub struct StoreError(pub String);

impl From<crate::types::ValidatorError> for StoreError {
    fn from(e: crate::types::ValidatorError) -> Self {
        StoreError(e.to_string())
    }
}

/// Persistence collaborator for the ledger.
///
/// Every method is a single read or write; the store enforces its own
/// consistency.
#[async_trait::async_trait]
pub trait UsageStore: Send + Sync {
    /// Append one record
    async fn append(&self, record: &UsageRecord) -> Result<(), StoreError>;

    /// Count records for a client and action with `timestamp >= since`
    async fn count_since(
        &self,
        client_id: &ClientId,
        action: ActionKind,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Whether the client is on the early-adopter waitlist
    async fn is_early_adopter(&self, client_id: &ClientId) -> Result<bool, StoreError>;
}
