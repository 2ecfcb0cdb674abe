//! Admin endpoints
//!
//! - GET /admin/waitlist - all waitlist entries in position order
//!
//! Auth: `Authorization: Bearer <API_KEY_ADMIN>` or `X-Api-Key`. Open in dev
//! mode when no key is configured.

use hyper::{HeaderMap, Response, StatusCode};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{error, warn};

use super::{error_response, json_response, FullBody};
use crate::server::AppState;
use crate::waitlist::EarlyAdopterEntry;

#[derive(Debug, Serialize)]
pub struct WaitlistListResponse {
    pub entries: Vec<EarlyAdopterEntry>,
    pub total: usize,
}

fn extract_token_from_header(headers: &HeaderMap) -> Option<&str> {
    if let Some(token) = headers
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return Some(token.trim());
    }
    headers.get("x-api-key").and_then(|v| v.to_str().ok())
}

/// Compares fixed-length digests so timing does not depend on where the
/// supplied key first differs.
fn keys_match(supplied: &str, expected: &str) -> bool {
    let a = Sha256::digest(supplied.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[allow(clippy::result_large_err)]
fn require_admin(headers: &HeaderMap, state: &AppState) -> Result<(), Response<FullBody>> {
    let expected = match &state.args.api_key_admin {
        Some(key) => key,
        None if state.args.dev_mode => return Ok(()),
        None => {
            return Err(error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Admin access is not configured",
                Some("ADMIN_DISABLED"),
            ))
        }
    };

    match extract_token_from_header(headers) {
        Some(token) if keys_match(token, expected) => Ok(()),
        Some(_) => {
            warn!("Rejected admin request with invalid key");
            Err(error_response(
                StatusCode::UNAUTHORIZED,
                "Invalid API key",
                Some("INVALID_TOKEN"),
            ))
        }
        None => Err(error_response(
            StatusCode::UNAUTHORIZED,
            "No API key provided",
            Some("NO_TOKEN"),
        )),
    }
}

pub async fn handle_admin_waitlist(state: Arc<AppState>, headers: &HeaderMap) -> Response<FullBody> {
    if let Err(response) = require_admin(headers, &state) {
        return response;
    }

    match state.waitlist.list().await {
        Ok(entries) => json_response(
            StatusCode::OK,
            &WaitlistListResponse {
                total: entries.len(),
                entries,
            },
        ),
        Err(e) => {
            error!("Failed to list waitlist: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to list waitlist",
                Some("STORE_ERROR"),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::ClientId;
    use crate::routes::test_support::{body_json, dev_args};
    use clap::Parser;

    fn keyed_state() -> Arc<AppState> {
        let args = crate::config::Args::parse_from(["content-validator", "--api-key-admin", "s3cret"]);
        Arc::new(AppState::in_memory(args))
    }

    #[tokio::test]
    async fn test_requires_key() {
        let state = keyed_state();
        let response = handle_admin_waitlist(Arc::clone(&state), &HeaderMap::new()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer wrong".parse().unwrap());
        let response = handle_admin_waitlist(Arc::clone(&state), &headers).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", "s3cret".parse().unwrap());
        let response = handle_admin_waitlist(state, &headers).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_keys_match_rejects_near_misses() {
        assert!(keys_match("s3cret", "s3cret"));
        assert!(!keys_match("s3cre", "s3cret"));
        assert!(!keys_match("s3cret ", "s3cret"));
        assert!(!keys_match("s3creT", "s3cret"));
        assert!(!keys_match("", "s3cret"));
    }

    #[tokio::test]
    async fn test_near_miss_key_rejected() {
        let state = keyed_state();
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", "s3cre".parse().unwrap());
        let response = handle_admin_waitlist(state, &headers).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_lists_in_position_order() {
        let state = Arc::new(AppState::in_memory(dev_args()));
        for (i, email) in ["one@example.com", "two@example.com"].iter().enumerate() {
            let client = ClientId::supplied(&format!("adm{i}")).unwrap();
            state
                .waitlist
                .join(email, client, serde_json::Value::Null)
                .await
                .unwrap();
        }

        let json = body_json(handle_admin_waitlist(state, &HeaderMap::new()).await).await;
        assert_eq!(json["total"], 2);
        assert_eq!(json["entries"][0]["email"], "one@example.com");
        assert_eq!(json["entries"][1]["position"], 2);
    }
}
