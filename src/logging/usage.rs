//! Usage analytics logging
//!
//! Appends quota and validation events in JSONL format. Writing is best
//! effort: a failed write is logged and the request carries on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::ledger::{ClientId, QuotaStatus, Tier};

/// Usage event types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Quota read without recording
    QuotaChecked,
    /// Usage record appended
    UsageRecorded,
    /// Request rejected at the ceiling
    QuotaRejected,
    /// Report normalized and stored
    ValidationCompleted,
    /// Provider or normalizer failure
    ValidationFailed,
    /// Client joined the early-adopter waitlist
    WaitlistJoined,
    /// Report export requested
    ReportExported,
}

/// One analytics event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    /// Node that handled the request
    pub node_id: String,
    pub client_id: Option<String>,
    pub used: Option<u32>,
    pub limit: Option<u32>,
    pub report_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl UsageEvent {
    pub fn new(event_type: EventType, node_id: String) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            node_id,
            client_id: None,
            used: None,
            limit: None,
            report_id: None,
            metadata: None,
        }
    }

    pub fn with_client(mut self, client_id: &ClientId) -> Self {
        self.client_id = Some(client_id.as_str().to_string());
        self
    }

    /// Attach used/limit from a quota status
    pub fn with_quota(mut self, status: &QuotaStatus) -> Self {
        self.used = Some(status.used);
        self.limit = Some(status.limit);
        self
    }

    pub fn with_report(mut self, report_id: &str) -> Self {
        self.report_id = Some(report_id.to_string());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Convert to JSONL line
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Usage logger that writes events to a JSONL file
#[derive(Clone)]
pub struct UsageLogger {
    inner: Arc<Mutex<UsageLoggerInner>>,
    node_id: String,
}

struct UsageLoggerInner {
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
}

impl UsageLogger {
    /// Create a logger; events are dropped until `init_file` is called
    pub fn new(node_id: String) -> Self {
        Self {
            inner: Arc::new(Mutex::new(UsageLoggerInner {
                writer: None,
                path: None,
            })),
            node_id,
        }
    }

    /// Initialize file logging to the specified path
    pub async fn init_file(&self, path: PathBuf) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let mut inner = self.inner.lock().await;
        inner.writer = Some(BufWriter::new(file));
        inner.path = Some(path.clone());

        info!("Usage logging initialized to {}", path.display());
        Ok(())
    }

    /// Log a usage event
    pub async fn log(&self, event: UsageEvent) {
        let jsonl = match event.to_jsonl() {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize usage event: {}", e);
                return;
            }
        };

        let mut inner = self.inner.lock().await;

        if let Some(ref mut writer) = inner.writer {
            if let Err(e) = writeln!(writer, "{}", jsonl) {
                error!("Failed to write usage event: {}", e);
            }
            if let Err(e) = writer.flush() {
                error!("Failed to flush usage log: {}", e);
            }
        }
    }

    /// Log a quota event (checked, recorded or rejected)
    pub async fn log_quota(&self, event_type: EventType, client_id: &ClientId, status: &QuotaStatus) {
        let event = UsageEvent::new(event_type, self.node_id.clone())
            .with_client(client_id)
            .with_quota(status)
            .with_metadata(serde_json::json!({
                "tier": status.tier,
            }));

        self.log(event).await;
    }

    /// Log a request rejected at the ceiling
    pub async fn log_quota_rejected(&self, client_id: &ClientId, used: u32, limit: u32, tier: Tier) {
        let mut event =
            UsageEvent::new(EventType::QuotaRejected, self.node_id.clone()).with_client(client_id);
        event.used = Some(used);
        event.limit = Some(limit);
        event.metadata = Some(serde_json::json!({ "tier": tier }));

        self.log(event).await;
    }

    /// Log a completed validation
    pub async fn log_validation(&self, client_id: &ClientId, report_id: &str, status: &QuotaStatus) {
        let event = UsageEvent::new(EventType::ValidationCompleted, self.node_id.clone())
            .with_client(client_id)
            .with_quota(status)
            .with_report(report_id);

        self.log(event).await;
    }

    /// Log a failed validation with the failure kind
    pub async fn log_validation_failed(&self, client_id: &ClientId, kind: &str) {
        let event = UsageEvent::new(EventType::ValidationFailed, self.node_id.clone())
            .with_client(client_id)
            .with_metadata(serde_json::json!({ "kind": kind }));

        self.log(event).await;
    }

    pub async fn log_waitlist_joined(&self, client_id: &ClientId, position: u32) {
        let event = UsageEvent::new(EventType::WaitlistJoined, self.node_id.clone())
            .with_client(client_id)
            .with_metadata(serde_json::json!({ "position": position }));

        self.log(event).await;
    }

    pub async fn log_export(&self, report_id: &str) {
        let event =
            UsageEvent::new(EventType::ReportExported, self.node_id.clone()).with_report(report_id);

        self.log(event).await;
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{QuotaPolicy, UsageLedger};
    use crate::db::MemoryStore;

    #[test]
    fn test_quota_event_serialization() {
        let client = ClientId::supplied("abc").unwrap();
        let event = UsageEvent::new(EventType::QuotaRejected, "node-1".to_string())
            .with_client(&client)
            .with_metadata(serde_json::json!({ "tier": "standard" }));

        let jsonl = event.to_jsonl().unwrap();
        assert!(jsonl.contains("quota_rejected"));
        assert!(jsonl.contains("cid:abc"));
        assert!(jsonl.contains("node-1"));
    }

    #[test]
    fn test_metadata_omitted_when_absent() {
        let event = UsageEvent::new(EventType::ReportExported, "node-1".to_string())
            .with_report("r-1");

        let jsonl = event.to_jsonl().unwrap();
        assert!(jsonl.contains("report_exported"));
        assert!(jsonl.contains("\"report_id\":\"r-1\""));
        assert!(!jsonl.contains("metadata"));
    }

    #[tokio::test]
    async fn test_writes_jsonl_lines() {
        let path = std::env::temp_dir().join(format!("cv-usage-{}.jsonl", uuid::Uuid::new_v4()));
        let logger = UsageLogger::new("node-1".to_string());
        logger.init_file(path.clone()).await.unwrap();

        let ledger = UsageLedger::new(std::sync::Arc::new(MemoryStore::new()), QuotaPolicy::default());
        let client = ClientId::supplied("writer").unwrap();
        let status = ledger.check_quota(&client).await;
        logger.log_quota(EventType::QuotaChecked, &client, &status).await;
        logger.log_export("r-9").await;

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event_type"], "quota_checked");
        assert_eq!(first["limit"], 3);
        let _ = std::fs::remove_file(path);
    }
}
