//! HTTP routes for ContentValidator

pub mod admin;
pub mod health;
pub mod reports;
pub mod usage;
pub mod validate;
pub mod waitlist;

pub use admin::handle_admin_waitlist;
pub use health::{health_check, version_info};
pub use reports::{
    handle_export_report, handle_get_report, handle_latest_report, handle_list_reports,
};
pub use usage::{client_id_from_body, handle_usage_check, handle_usage_record};
pub use validate::handle_validate;
pub use waitlist::handle_waitlist_join;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

pub type FullBody = Full<Bytes>;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<FullBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

pub fn error_response(status: StatusCode, error: &str, code: Option<&str>) -> Response<FullBody> {
    json_response(
        status,
        &ErrorResponse {
            error: error.to_string(),
            code: code.map(|c| c.to_string()),
        },
    )
}

/// Parse a JSON request body, treating an empty body as `{}`
#[allow(clippy::result_large_err)]
pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(body: &Bytes) -> Result<T, Response<FullBody>> {
    let slice: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        body
    };
    serde_json::from_slice(slice).map_err(|e| {
        error_response(
            StatusCode::BAD_REQUEST,
            &format!("Invalid request body: {}", e),
            Some("INVALID_BODY"),
        )
    })
}

/// Look up one decoded query parameter
pub fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    query?.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key == name {
            urlencoding::decode(value).ok().map(|v| v.into_owned())
        } else {
            None
        }
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param() {
        assert_eq!(
            query_param(Some("a=1&clientId=abc%20def"), "clientId").as_deref(),
            Some("abc def")
        );
        assert_eq!(query_param(Some("a=1"), "clientId"), None);
        assert_eq!(query_param(None, "clientId"), None);
    }

    #[test]
    fn test_parse_json_accepts_empty_body() {
        #[derive(serde::Deserialize)]
        struct Body {
            name: Option<String>,
        }
        let parsed: Body = parse_json(&Bytes::new()).unwrap();
        assert!(parsed.name.is_none());
        assert!(parse_json::<Body>(&Bytes::from_static(b"not json")).is_err());
    }
}
