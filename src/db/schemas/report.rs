//! Validation report document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::reports::{StoredReport, ValidationReport};

/// Collection name for reports
pub const REPORT_COLLECTION: &str = "reports";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ReportDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Public report id (UUID)
    pub report_id: String,

    pub requester_id: String,
    pub topic: String,
    pub audience: String,
    pub created_at: DateTime,

    /// The immutable normalized report
    pub report: ValidationReport,
}

impl From<&StoredReport> for ReportDoc {
    fn from(stored: &StoredReport) -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            report_id: stored.report_id.clone(),
            requester_id: stored.requester_id.clone(),
            topic: stored.topic.clone(),
            audience: stored.audience.clone(),
            created_at: DateTime::from_chrono(stored.created_at),
            report: stored.report.clone(),
        }
    }
}

impl From<ReportDoc> for StoredReport {
    fn from(doc: ReportDoc) -> Self {
        Self {
            report_id: doc.report_id,
            requester_id: doc.requester_id,
            topic: doc.topic,
            audience: doc.audience,
            created_at: doc.created_at.to_chrono(),
            report: doc.report,
        }
    }
}

impl IntoIndexes for ReportDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "report_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("report_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "requester_id": 1, "topic": 1, "audience": 1, "created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("requester_topic_audience".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ReportDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
