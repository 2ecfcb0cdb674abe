//! POST /api/waitlist - join the early-adopter waitlist

use bytes::Bytes;
use hyper::{HeaderMap, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::error;

use super::{error_response, json_response, parse_json, FullBody};
use crate::ledger::ClientId;
use crate::server::AppState;
use crate::waitlist::WaitlistError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    #[serde(default)]
    pub email: String,
    pub client_id: Option<String>,
    #[serde(default)]
    pub profile: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub position: u32,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct AlreadyJoinedResponse {
    pub error: String,
    pub code: &'static str,
    pub position: u32,
}

pub async fn handle_waitlist_join(
    state: Arc<AppState>,
    headers: &HeaderMap,
    peer: IpAddr,
    body: Bytes,
) -> Response<FullBody> {
    let request: JoinRequest = match parse_json(&body) {
        Ok(r) => r,
        Err(response) => return response,
    };
    let client_id = ClientId::resolve(request.client_id.as_deref(), headers, peer);

    match state
        .waitlist
        .join(&request.email, client_id.clone(), request.profile)
        .await
    {
        Ok(entry) => {
            state
                .usage_log
                .log_waitlist_joined(&client_id, entry.position)
                .await;
            json_response(
                StatusCode::CREATED,
                &JoinResponse {
                    position: entry.position,
                    email: entry.email,
                },
            )
        }
        Err(WaitlistError::InvalidEmail) => error_response(
            StatusCode::BAD_REQUEST,
            "A valid email address is required",
            Some("INVALID_EMAIL"),
        ),
        Err(WaitlistError::AlreadyJoined { position }) => json_response(
            StatusCode::CONFLICT,
            &AlreadyJoinedResponse {
                error: "Already on the waitlist".to_string(),
                code: "ALREADY_JOINED",
                position,
            },
        ),
        Err(WaitlistError::Store(e)) => {
            error!(client_id = %client_id, "Failed to join waitlist: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to join waitlist",
                Some("STORE_ERROR"),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{body_json, dev_args};
    use std::net::Ipv4Addr;

    fn peer() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(198, 51, 100, 20))
    }

    fn join_body(email: &str, client: &str) -> Bytes {
        Bytes::from(
            serde_json::json!({
                "email": email,
                "clientId": client,
                "profile": { "role": "educator" },
            })
            .to_string(),
        )
    }

    #[tokio::test]
    async fn test_join_assigns_positions_and_promotes() {
        let state = Arc::new(AppState::in_memory(dev_args()));
        let headers = HeaderMap::new();

        let response = handle_waitlist_join(
            Arc::clone(&state),
            &headers,
            peer(),
            join_body("First@Example.com", "w1"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["position"], 1);
        assert_eq!(json["email"], "first@example.com");

        let response = handle_waitlist_join(
            Arc::clone(&state),
            &headers,
            peer(),
            join_body("second@example.com", "w2"),
        )
        .await;
        assert_eq!(body_json(response).await["position"], 2);

        let status = state
            .ledger
            .check_quota(&ClientId::supplied("w1").unwrap())
            .await;
        assert_eq!(status.limit, 8);
        assert!(status.is_early_adopter());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let state = Arc::new(AppState::in_memory(dev_args()));
        let headers = HeaderMap::new();

        handle_waitlist_join(Arc::clone(&state), &headers, peer(), join_body("a@example.com", "d1")).await;
        let response =
            handle_waitlist_join(Arc::clone(&state), &headers, peer(), join_body("A@example.com", "d2")).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await["position"], 1);
    }

    #[tokio::test]
    async fn test_invalid_email_rejected() {
        let state = Arc::new(AppState::in_memory(dev_args()));
        let response =
            handle_waitlist_join(state, &HeaderMap::new(), peer(), join_body("not-an-email", "x")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
