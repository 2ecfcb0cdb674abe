//! Persisted validation reports
//!
//! A report is created once per successful validation and never modified.
//! It is stored with the requester and the topic/audience it answers.

pub mod export;
pub mod model;

pub use export::ExportDocument;
pub use model::{ReportState, ValidationReport};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::StoreError;

/// A report together with the request it answers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredReport {
    pub report_id: String,
    /// Authenticated user id, or the resolved client id for anonymous use
    pub requester_id: String,
    pub topic: String,
    pub audience: String,
    pub created_at: DateTime<Utc>,
    pub report: ValidationReport,
}

impl StoredReport {
    pub fn new(requester_id: String, topic: String, audience: String, report: ValidationReport) -> Self {
        Self {
            report_id: Uuid::new_v4().to_string(),
            requester_id,
            topic,
            audience,
            created_at: Utc::now(),
            report,
        }
    }

    pub fn state(&self) -> ReportState {
        self.report.state()
    }
}

/// Persistence for reports
#[async_trait::async_trait]
pub trait ReportStore: Send + Sync {
    async fn save(&self, report: &StoredReport) -> Result<(), StoreError>;

    async fn get(&self, report_id: &str) -> Result<Option<StoredReport>, StoreError>;

    /// Most recent report for a requester and topic/audience pair
    async fn latest_for(
        &self,
        requester_id: &str,
        topic: &str,
        audience: &str,
    ) -> Result<Option<StoredReport>, StoreError>;

    /// Reports for a requester, newest first
    async fn list_for_requester(&self, requester_id: &str) -> Result<Vec<StoredReport>, StoreError>;
}
