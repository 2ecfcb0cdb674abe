//! Configuration for ContentValidator
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use uuid::Uuid;

use crate::ledger::QuotaPolicy;

/// ContentValidator - content demand validation service
#[derive(Parser, Debug, Clone)]
#[command(name = "content-validator")]
#[command(about = "Validates content demand through an LLM-backed market analysis")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (in-memory fallback, optional admin key)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "content_validator")]
    pub mongodb_db: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Timeout for analysis provider calls in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "60000")]
    pub request_timeout_ms: u64,

    /// Perplexity API key. Validation is unavailable without it.
    #[arg(long, env = "PERPLEXITY_API_KEY")]
    pub perplexity_api_key: Option<String>,

    /// Perplexity API base URL
    #[arg(long, env = "PERPLEXITY_BASE_URL", default_value = "https://api.perplexity.ai")]
    pub perplexity_base_url: String,

    /// Perplexity model name
    #[arg(long, env = "PERPLEXITY_MODEL", default_value = "sonar-pro")]
    pub perplexity_model: String,

    /// API key for admin access (required in production)
    #[arg(long, env = "API_KEY_ADMIN")]
    pub api_key_admin: Option<String>,

    /// Optional JSONL file for analytics events
    #[arg(long, env = "USAGE_LOG_PATH")]
    pub usage_log_path: Option<PathBuf>,

    /// Validations allowed per window for standard clients
    #[arg(long, env = "STANDARD_QUOTA", default_value = "3")]
    pub standard_quota: u32,

    /// Validations allowed per window for early adopters
    #[arg(long, env = "EARLY_ADOPTER_QUOTA", default_value = "8")]
    pub early_adopter_quota: u32,

    /// Length of the trailing usage window in days
    #[arg(long, env = "QUOTA_WINDOW_DAYS", default_value = "30")]
    pub quota_window_days: u32,
}

impl Args {
    /// Quota policy derived from the configured ceilings and window
    pub fn quota_policy(&self) -> QuotaPolicy {
        QuotaPolicy {
            standard_limit: self.standard_quota,
            early_adopter_limit: self.early_adopter_quota,
            window: chrono::Duration::days(i64::from(self.quota_window_days)),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.api_key_admin.is_none() {
            return Err("API_KEY_ADMIN is required in production mode".to_string());
        }

        if self.quota_window_days == 0 {
            return Err("QUOTA_WINDOW_DAYS must be at least 1".to_string());
        }

        if self.early_adopter_quota < self.standard_quota {
            return Err(
                "EARLY_ADOPTER_QUOTA must be greater than or equal to STANDARD_QUOTA".to_string(),
            );
        }

        Ok(())
    }
}
