//! Health and version endpoints
//!
//! - /health, /healthz - liveness; always 200 while the process runs
//! - /version - build info captured by the build script

use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use super::{json_response, FullBody};
use crate::server::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    /// Seconds since the server state was built
    pub uptime: u64,
    pub timestamp: String,
    /// `development` or `production`
    pub mode: &'static str,
    pub node_id: String,
    /// `mongodb` or `memory`
    pub storage: &'static str,
    /// Whether `/api/validate` can reach an analysis provider
    pub provider_configured: bool,
}

fn build_health_response(state: &AppState) -> HealthResponse {
    HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if state.args.dev_mode {
            "development"
        } else {
            "production"
        },
        node_id: state.args.node_id.to_string(),
        storage: state.storage.as_str(),
        provider_configured: state.provider.is_some(),
    }
}

pub fn health_check(state: Arc<AppState>) -> Response<FullBody> {
    json_response(StatusCode::OK, &build_health_response(&state))
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub commit: &'static str,
    pub commit_full: &'static str,
    pub build_time: &'static str,
    pub service: &'static str,
}

pub fn version_info() -> Response<FullBody> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "content-validator",
    };

    json_response(StatusCode::OK, &response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{body_json, dev_args};

    #[tokio::test]
    async fn test_health_reports_memory_storage() {
        let state = Arc::new(AppState::in_memory(dev_args()));
        let body = body_json(health_check(state)).await;
        assert_eq!(body["healthy"], true);
        assert_eq!(body["storage"], "memory");
        assert_eq!(body["mode"], "development");
        assert_eq!(body["providerConfigured"], false);
    }

    #[tokio::test]
    async fn test_version_info() {
        let body = body_json(version_info()).await;
        assert_eq!(body["service"], "content-validator");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}
