//! Early-adopter waitlist document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::ledger::ClientId;
use crate::waitlist::EarlyAdopterEntry;

/// Collection name for waitlist entries
pub const EARLY_ADOPTER_COLLECTION: &str = "early_adopters";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EarlyAdopterDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Lowercased email
    pub email: String,

    /// Namespaced client identifier
    pub client_id: String,

    /// Waitlist position, assigned once at insertion; unique
    pub position: i64,

    /// Free-form profile answers
    #[serde(default)]
    pub profile: serde_json::Value,

    pub joined_at: DateTime,
}

impl From<&EarlyAdopterEntry> for EarlyAdopterDoc {
    fn from(entry: &EarlyAdopterEntry) -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            email: entry.email.clone(),
            client_id: entry.client_id.as_str().to_string(),
            position: i64::from(entry.position),
            profile: entry.profile.clone(),
            joined_at: DateTime::from_chrono(entry.joined_at),
        }
    }
}

impl From<EarlyAdopterDoc> for EarlyAdopterEntry {
    fn from(doc: EarlyAdopterDoc) -> Self {
        Self {
            email: doc.email,
            client_id: ClientId::from_stored(doc.client_id),
            position: u32::try_from(doc.position).unwrap_or(0),
            profile: doc.profile,
            joined_at: doc.joined_at.to_chrono(),
        }
    }
}

impl IntoIndexes for EarlyAdopterDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "client_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("client_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "position": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("position_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for EarlyAdopterDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
