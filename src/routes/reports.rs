//! Report retrieval endpoints
//!
//! - GET /api/reports?requesterId= - a requester's reports, newest first
//! - GET /api/reports/latest?topic=&audience= - newest report for a pair
//! - GET /api/reports/{id} - stored report with its presentation state
//! - GET /api/reports/{id}/export - print-oriented export document
//!
//! Without `requesterId` the requester is the resolved client id, the same
//! id `/api/validate` stores for anonymous use.

use chrono::{DateTime, Utc};
use hyper::{HeaderMap, Response, StatusCode};
use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::error;

use super::{error_response, json_response, query_param, FullBody};
use crate::ledger::ClientId;
use crate::reports::{ExportDocument, ReportState, StoredReport, ValidationReport};
use crate::server::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub report_id: String,
    pub topic: String,
    pub audience: String,
    pub created_at: DateTime<Utc>,
    pub state: ReportState,
    pub report: ValidationReport,
}

impl From<StoredReport> for ReportResponse {
    fn from(stored: StoredReport) -> Self {
        Self {
            state: stored.state(),
            report_id: stored.report_id,
            topic: stored.topic,
            audience: stored.audience,
            created_at: stored.created_at,
            report: stored.report,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub report_id: String,
    pub topic: String,
    pub audience: String,
    pub created_at: DateTime<Utc>,
    pub state: ReportState,
    pub demand_score: u8,
}

impl From<&StoredReport> for ReportSummary {
    fn from(stored: &StoredReport) -> Self {
        Self {
            report_id: stored.report_id.clone(),
            topic: stored.topic.clone(),
            audience: stored.audience.clone(),
            created_at: stored.created_at,
            state: stored.state(),
            demand_score: stored.report.demand_score,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReportListResponse {
    pub reports: Vec<ReportSummary>,
    pub total: usize,
}

fn requester_from_query(query: Option<&str>, headers: &HeaderMap, peer: IpAddr) -> String {
    query_param(query, "requesterId")
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| {
            let client_id = query_param(query, "clientId");
            ClientId::resolve(client_id.as_deref(), headers, peer).to_string()
        })
}

fn store_failure() -> Response<FullBody> {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to load reports",
        Some("STORE_ERROR"),
    )
}

pub async fn handle_list_reports(
    state: Arc<AppState>,
    headers: &HeaderMap,
    peer: IpAddr,
    query: Option<&str>,
) -> Response<FullBody> {
    let requester_id = requester_from_query(query, headers, peer);

    match state.reports.list_for_requester(&requester_id).await {
        Ok(reports) => json_response(
            StatusCode::OK,
            &ReportListResponse {
                total: reports.len(),
                reports: reports.iter().map(ReportSummary::from).collect(),
            },
        ),
        Err(e) => {
            error!(requester_id = %requester_id, "Failed to list reports: {}", e);
            store_failure()
        }
    }
}

pub async fn handle_latest_report(
    state: Arc<AppState>,
    headers: &HeaderMap,
    peer: IpAddr,
    query: Option<&str>,
) -> Response<FullBody> {
    let (topic, audience) = match (query_param(query, "topic"), query_param(query, "audience")) {
        (Some(t), Some(a)) if !t.trim().is_empty() && !a.trim().is_empty() => {
            (t.trim().to_string(), a.trim().to_string())
        }
        _ => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "`topic` and `audience` are required",
                Some("INVALID_REQUEST"),
            )
        }
    };
    let requester_id = requester_from_query(query, headers, peer);

    match state.reports.latest_for(&requester_id, &topic, &audience).await {
        Ok(Some(stored)) => json_response(StatusCode::OK, &ReportResponse::from(stored)),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Report not found", Some("NOT_FOUND")),
        Err(e) => {
            error!(requester_id = %requester_id, "Failed to load latest report: {}", e);
            store_failure()
        }
    }
}

async fn load(state: &AppState, report_id: &str) -> Result<StoredReport, Response<FullBody>> {
    match state.reports.get(report_id).await {
        Ok(Some(stored)) => Ok(stored),
        Ok(None) => Err(error_response(
            StatusCode::NOT_FOUND,
            "Report not found",
            Some("NOT_FOUND"),
        )),
        Err(e) => {
            error!(report_id, "Failed to load report: {}", e);
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load report",
                Some("STORE_ERROR"),
            ))
        }
    }
}

pub async fn handle_get_report(state: Arc<AppState>, report_id: &str) -> Response<FullBody> {
    match load(&state, report_id).await {
        Ok(stored) => json_response(StatusCode::OK, &ReportResponse::from(stored)),
        Err(response) => response,
    }
}

pub async fn handle_export_report(state: Arc<AppState>, report_id: &str) -> Response<FullBody> {
    match load(&state, report_id).await {
        Ok(stored) => {
            state.usage_log.log_export(&stored.report_id).await;
            json_response(StatusCode::OK, &ExportDocument::from(&stored))
        }
        Err(response) => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize;
    use crate::routes::test_support::{body_json, dev_args, report_json};

    async fn seeded() -> (Arc<AppState>, String) {
        let state = Arc::new(AppState::in_memory(dev_args()));
        let report = normalize(&report_json(41)).unwrap();
        let stored = StoredReport::new(
            "cid:r1".to_string(),
            "Rust".to_string(),
            "Pythonistas".to_string(),
            report,
        );
        state.reports.save(&stored).await.unwrap();
        (state, stored.report_id)
    }

    #[tokio::test]
    async fn test_get_report() {
        let (state, id) = seeded().await;
        let response = handle_get_report(state, &id).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["reportId"], id.as_str());
        assert_eq!(json["state"], "sufficient");
        assert_eq!(json["report"]["data_signals"]["count"], 41);
    }

    #[tokio::test]
    async fn test_missing_report_is_404() {
        let (state, _) = seeded().await;
        let response = handle_get_report(state, "does-not-exist").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    fn no_headers() -> HeaderMap {
        HeaderMap::new()
    }

    fn peer() -> IpAddr {
        IpAddr::from([192, 0, 2, 44])
    }

    async fn save(state: &AppState, requester: &str, topic: &str, age_days: i64) -> String {
        let mut stored = StoredReport::new(
            requester.to_string(),
            topic.to_string(),
            "Pythonistas".to_string(),
            normalize(&report_json(10)).unwrap(),
        );
        stored.created_at = Utc::now() - chrono::Duration::days(age_days);
        state.reports.save(&stored).await.unwrap();
        stored.report_id
    }

    #[tokio::test]
    async fn test_list_reports_newest_first() {
        let state = Arc::new(AppState::in_memory(dev_args()));
        let old = save(&state, "cid:lister", "Rust", 3).await;
        let new = save(&state, "cid:lister", "Go", 1).await;
        save(&state, "cid:someone-else", "Rust", 0).await;

        let response = handle_list_reports(
            Arc::clone(&state),
            &no_headers(),
            peer(),
            Some("requesterId=cid%3Alister"),
        )
        .await;
        let json = body_json(response).await;
        assert_eq!(json["total"], 2);
        assert_eq!(json["reports"][0]["reportId"], new.as_str());
        assert_eq!(json["reports"][1]["reportId"], old.as_str());
    }

    #[tokio::test]
    async fn test_list_defaults_to_resolved_client() {
        let state = Arc::new(AppState::in_memory(dev_args()));
        save(&state, "cid:anon", "Rust", 0).await;

        let json = body_json(
            handle_list_reports(Arc::clone(&state), &no_headers(), peer(), Some("clientId=anon")).await,
        )
        .await;
        assert_eq!(json["total"], 1);

        let json = body_json(handle_list_reports(state, &no_headers(), peer(), None).await).await;
        assert_eq!(json["total"], 0);
    }

    #[tokio::test]
    async fn test_latest_report_matches_topic_and_audience() {
        let state = Arc::new(AppState::in_memory(dev_args()));
        save(&state, "cid:latest", "Rust", 5).await;
        let newest = save(&state, "cid:latest", "Rust", 1).await;
        save(&state, "cid:latest", "Go", 0).await;

        let response = handle_latest_report(
            Arc::clone(&state),
            &no_headers(),
            peer(),
            Some("clientId=latest&topic=Rust&audience=Pythonistas"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["reportId"], newest.as_str());

        let response = handle_latest_report(
            Arc::clone(&state),
            &no_headers(),
            peer(),
            Some("clientId=latest&topic=Rust&audience=Gophers"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response =
            handle_latest_report(state, &no_headers(), peer(), Some("clientId=latest&topic=Rust")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_export_report() {
        let (state, id) = seeded().await;
        let response = handle_export_report(state, &id).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["subtitle"].as_str().map(|s| s.contains("Pythonistas")), Some(true));
        assert_eq!(json["score"]["value"], 72);
    }
}
