//! POST /api/validate
//!
//! Runs one validation: quota check, provider call, normalization, usage
//! record, report persistence. Usage is only charged once a report has been
//! produced. Provider and parse failures return a generic retry message; the
//! raw provider text only goes to the operator log.

use bytes::Bytes;
use hyper::{HeaderMap, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::usage::{quota_exceeded_response, UsageResponse};
use super::{error_response, json_response, parse_json, FullBody};
use crate::ledger::{ClientId, LedgerError};
use crate::logging::EventType;
use crate::normalizer::{self, RETRY_MESSAGE};
use crate::reports::{ReportState, StoredReport, ValidationReport};
use crate::server::AppState;

/// Longest accepted topic or audience description
const MAX_FIELD_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub audience: String,
    pub client_id: Option<String>,
    /// Authenticated user id, when the caller has one
    pub requester_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub report_id: String,
    pub state: ReportState,
    pub report: ValidationReport,
    pub usage: UsageResponse,
    /// False when the report could not be stored and cannot be fetched later
    pub saved: bool,
}

fn check_field(name: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("`{}` is required", name));
    }
    if value.chars().count() > MAX_FIELD_CHARS {
        return Err(format!("`{}` must be at most {} characters", name, MAX_FIELD_CHARS));
    }
    Ok(())
}

fn retry_response() -> Response<FullBody> {
    error_response(StatusCode::BAD_GATEWAY, RETRY_MESSAGE, Some("ANALYSIS_FAILED"))
}

pub async fn handle_validate(
    state: Arc<AppState>,
    headers: &HeaderMap,
    peer: IpAddr,
    body: Bytes,
) -> Response<FullBody> {
    let request: ValidateRequest = match parse_json(&body) {
        Ok(r) => r,
        Err(response) => return response,
    };

    if let Err(message) = check_field("topic", &request.topic)
        .and_then(|_| check_field("audience", &request.audience))
    {
        return error_response(StatusCode::BAD_REQUEST, &message, Some("INVALID_REQUEST"));
    }
    let topic = request.topic.trim();
    let audience = request.audience.trim();

    let provider = match &state.provider {
        Some(p) => Arc::clone(p),
        None => {
            return error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Validation is not available right now",
                Some("PROVIDER_UNAVAILABLE"),
            )
        }
    };

    let client_id = ClientId::resolve(request.client_id.as_deref(), headers, peer);

    let quota = state.ledger.check_quota(&client_id).await;
    if quota.is_exhausted() {
        state
            .usage_log
            .log_quota_rejected(&client_id, quota.used, quota.limit, quota.tier)
            .await;
        return quota_exceeded_response(quota.used, quota.limit, quota.tier);
    }

    let raw = match provider.analyze(topic, audience).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(client_id = %client_id, "Analysis provider failed: {}", e);
            state
                .usage_log
                .log_validation_failed(&client_id, "provider_error")
                .await;
            return retry_response();
        }
    };

    let report = match normalizer::normalize(&raw) {
        Ok(report) => report,
        Err(e) => {
            warn!(
                client_id = %client_id,
                kind = e.kind(),
                field = e.field().unwrap_or("-"),
                raw = e.raw(),
                "Failed to normalize provider response: {}",
                e
            );
            state
                .usage_log
                .log_validation_failed(&client_id, e.kind())
                .await;
            return error_response(StatusCode::BAD_GATEWAY, e.user_message(), Some("ANALYSIS_FAILED"));
        }
    };

    let usage = match state.ledger.record_usage(&client_id).await {
        Ok(status) => status,
        Err(LedgerError::QuotaExceeded { used, limit, tier }) => {
            // A concurrent request used the last slot while this one ran
            state
                .usage_log
                .log_quota_rejected(&client_id, used, limit, tier)
                .await;
            return quota_exceeded_response(used, limit, tier);
        }
        Err(LedgerError::RecordFailed(e)) => {
            error!(client_id = %client_id, "Failed to record usage: {}", e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to record usage",
                Some("RECORD_FAILED"),
            );
        }
    };

    let requester_id = request
        .requester_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| client_id.to_string());
    let stored = StoredReport::new(requester_id, topic.to_string(), audience.to_string(), report);

    let saved = match state.reports.save(&stored).await {
        Ok(()) => true,
        Err(e) => {
            error!(report_id = %stored.report_id, "Failed to store report: {}", e);
            false
        }
    };

    info!(
        client_id = %client_id,
        report_id = %stored.report_id,
        demand_score = stored.report.demand_score,
        used = usage.used,
        limit = usage.limit,
        "Validation completed"
    );
    state
        .usage_log
        .log_validation(&client_id, &stored.report_id, &usage)
        .await;
    state
        .usage_log
        .log_quota(EventType::UsageRecorded, &client_id, &usage)
        .await;

    json_response(
        StatusCode::OK,
        &ValidateResponse {
            report_id: stored.report_id.clone(),
            state: stored.state(),
            report: stored.report,
            usage: UsageResponse::from(&usage),
            saved,
        },
    )
}
