//! Usage record document schema
//!
//! Append-only; records outside the trailing window are simply not counted.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::ledger::UsageRecord;

/// Collection name for usage records
pub const USAGE_RECORD_COLLECTION: &str = "usage_records";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UsageRecordDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Namespaced client identifier
    pub client_id: String,

    /// Action kind (`validation`)
    pub action: String,

    pub timestamp: DateTime,
}

impl From<&UsageRecord> for UsageRecordDoc {
    fn from(record: &UsageRecord) -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            client_id: record.client_id.as_str().to_string(),
            action: record.action.as_str().to_string(),
            timestamp: DateTime::from_chrono(record.timestamp),
        }
    }
}

impl IntoIndexes for UsageRecordDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "client_id": 1, "action": 1, "timestamp": -1 },
            Some(
                IndexOptions::builder()
                    .name("client_action_timestamp".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for UsageRecordDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
