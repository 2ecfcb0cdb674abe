//! Usage quota endpoints
//!
//! - POST /api/usage/record - admit and record one validation
//! - GET/POST /api/usage/check - read the current quota without writing

use bytes::Bytes;
use hyper::{HeaderMap, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::error;

use super::{error_response, json_response, parse_json, FullBody};
use crate::ledger::{ClientId, LedgerError, QuotaStatus, Tier};
use crate::logging::EventType;
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientBody {
    pub client_id: Option<String>,
}

/// Quota as returned to clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
    pub is_early_adopter: bool,
}

impl From<&QuotaStatus> for UsageResponse {
    fn from(status: &QuotaStatus) -> Self {
        Self {
            used: status.used,
            limit: status.limit,
            remaining: status.remaining,
            is_early_adopter: status.is_early_adopter(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaExceededResponse {
    pub error: String,
    pub code: &'static str,
    pub used: u32,
    pub limit: u32,
    pub is_early_adopter: bool,
}

/// 429 body for a client at its ceiling
pub(crate) fn quota_exceeded_response(used: u32, limit: u32, tier: Tier) -> Response<FullBody> {
    json_response(
        StatusCode::TOO_MANY_REQUESTS,
        &QuotaExceededResponse {
            error: format!(
                "Usage limit reached: {} of {} validations used in the current window",
                used, limit
            ),
            code: "QUOTA_EXCEEDED",
            used,
            limit,
            is_early_adopter: tier == Tier::EarlyAdopter,
        },
    )
}

/// Extract an optional `clientId` from a JSON body
#[allow(clippy::result_large_err)]
pub fn client_id_from_body(body: &Bytes) -> Result<Option<String>, Response<FullBody>> {
    parse_json::<ClientBody>(body).map(|b| b.client_id)
}

pub async fn handle_usage_record(
    state: Arc<AppState>,
    headers: &HeaderMap,
    peer: IpAddr,
    body: Bytes,
) -> Response<FullBody> {
    let request: ClientBody = match parse_json(&body) {
        Ok(r) => r,
        Err(response) => return response,
    };
    let client_id = ClientId::resolve(request.client_id.as_deref(), headers, peer);

    match state.ledger.record_usage(&client_id).await {
        Ok(status) => {
            state
                .usage_log
                .log_quota(EventType::UsageRecorded, &client_id, &status)
                .await;
            json_response(StatusCode::OK, &UsageResponse::from(&status))
        }
        Err(LedgerError::QuotaExceeded { used, limit, tier }) => {
            state
                .usage_log
                .log_quota_rejected(&client_id, used, limit, tier)
                .await;
            quota_exceeded_response(used, limit, tier)
        }
        Err(LedgerError::RecordFailed(e)) => {
            error!(client_id = %client_id, "Failed to record usage: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to record usage",
                Some("RECORD_FAILED"),
            )
        }
    }
}

pub async fn handle_usage_check(
    state: Arc<AppState>,
    headers: &HeaderMap,
    peer: IpAddr,
    client_id: Option<String>,
) -> Response<FullBody> {
    let client_id = ClientId::resolve(client_id.as_deref(), headers, peer);
    let status = state.ledger.check_quota(&client_id).await;

    state
        .usage_log
        .log_quota(EventType::QuotaChecked, &client_id, &status)
        .await;

    json_response(StatusCode::OK, &UsageResponse::from(&status))
}
