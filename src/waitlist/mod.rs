//! Early-adopter waitlist
//!
//! Joining the waitlist promotes a client to the early-adopter tier; the
//! ledger sees the promotion on its next check. Positions are assigned once
//! at insertion (current count + 1) and never reassigned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::ledger::{ClientId, StoreError};

/// One waitlist entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EarlyAdopterEntry {
    pub email: String,
    pub client_id: ClientId,
    pub position: u32,
    /// Free-form profile answers from the signup form
    #[serde(default)]
    pub profile: serde_json::Value,
    pub joined_at: DateTime<Utc>,
}

/// Waitlist errors
#[derive(Debug, Clone, Error)]
pub enum WaitlistError {
    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Already on the waitlist at position {position}")]
    AlreadyJoined { position: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Persistence for waitlist entries.
///
/// Email and client id are each unique; `insert` must reject duplicates
/// with `WaitlistError::AlreadyJoined`. `insert` assigns the position
/// (current count + 1) atomically with the write, so concurrent joins never
/// share a position.
#[async_trait::async_trait]
pub trait WaitlistStore: Send + Sync {
    async fn count(&self) -> Result<u64, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<EarlyAdopterEntry>, StoreError>;

    async fn find_by_client(
        &self,
        client_id: &ClientId,
    ) -> Result<Option<EarlyAdopterEntry>, StoreError>;

    /// Store a new entry, ignoring its `position` and returning the entry
    /// with the assigned one
    async fn insert(&self, entry: EarlyAdopterEntry) -> Result<EarlyAdopterEntry, WaitlistError>;

    /// All entries ordered by position
    async fn list(&self) -> Result<Vec<EarlyAdopterEntry>, StoreError>;
}

/// Trim and lowercase an email, rejecting anything without exactly one `@`
/// between non-empty parts.
pub fn normalize_email(raw: &str) -> Result<String, WaitlistError> {
    let email = raw.trim().to_lowercase();
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None)
            if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.') =>
        {
            Ok(email)
        }
        _ => Err(WaitlistError::InvalidEmail),
    }
}

/// Waitlist service
pub struct Waitlist {
    store: Arc<dyn WaitlistStore>,
}

impl Waitlist {
    pub fn new(store: Arc<dyn WaitlistStore>) -> Self {
        Self { store }
    }

    /// Add a client to the waitlist.
    pub async fn join(
        &self,
        email: &str,
        client_id: ClientId,
        profile: serde_json::Value,
    ) -> Result<EarlyAdopterEntry, WaitlistError> {
        let email = normalize_email(email)?;

        if let Some(existing) = self.store.find_by_email(&email).await? {
            return Err(WaitlistError::AlreadyJoined {
                position: existing.position,
            });
        }
        if let Some(existing) = self.store.find_by_client(&client_id).await? {
            return Err(WaitlistError::AlreadyJoined {
                position: existing.position,
            });
        }

        let entry = self
            .store
            .insert(EarlyAdopterEntry {
                email,
                client_id,
                position: 0,
                profile,
                joined_at: Utc::now(),
            })
            .await?;

        info!(
            client_id = %entry.client_id,
            position = entry.position,
            "Early adopter joined waitlist"
        );
        Ok(entry)
    }

    pub async fn list(&self) -> Result<Vec<EarlyAdopterEntry>, StoreError> {
        self.store.list().await
    }
}
