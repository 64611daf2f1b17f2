//! Wire types of the download endpoint and the error → response mapping.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use stelle_config::StatusPolicy;
use stelle_http::HttpError;
use stelle_scraper::ExtractedRecord;

pub const MSG_INVALID_REQUEST: &str = "Invalid request format";
pub const MSG_EMPTY_URL: &str = "Please provide the URL";
pub const MSG_NO_LINKS: &str = "No download links could be extracted";
pub const MSG_ENCODE_FAILED: &str = "Failed to encode response";

// Written verbatim when serialising the real body fails.
const ENCODE_FAILED_BODY: &str = r#"{"success":false,"message":"Failed to encode response"}"#;

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<BTreeMap<String, String>>,
}

impl DownloadResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            id: String::new(),
            title: String::new(),
            links: None,
        }
    }

    /// Successful scrape; an empty link set carries an informational message.
    pub fn from_record(record: &ExtractedRecord) -> Self {
        let links = record.download_links();
        let message = links.is_empty().then(|| MSG_NO_LINKS.to_string());
        Self {
            success: true,
            message,
            id: record.id.clone(),
            title: record.title.clone(),
            links: Some(links),
        }
    }

    /// Serialise with `status`, falling back to a fixed body if encoding fails.
    pub fn into_http(self, status: StatusCode, policy: StatusPolicy) -> Response {
        match serde_json::to_vec(&self) {
            Ok(bytes) => json_bytes(status, bytes),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode response");
                let err = ApiError::Encode(e.to_string());
                json_bytes(err.status(policy), ENCODE_FAILED_BODY.as_bytes().to_vec())
            }
        }
    }
}

fn json_bytes(status: StatusCode, bytes: Vec<u8>) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], bytes).into_response()
}

/// Every way a download request can fail, before or after the fetch.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid request body: {0}")]
    InvalidRequest(String),
    #[error("empty url")]
    EmptyUrl,
    #[error(transparent)]
    Fetch(#[from] HttpError),
    #[error("response encoding failed: {0}")]
    Encode(String),
}

impl ApiError {
    /// Message placed in the JSON body.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::InvalidRequest(_) => MSG_INVALID_REQUEST.to_string(),
            ApiError::EmptyUrl => MSG_EMPTY_URL.to_string(),
            ApiError::Fetch(err) => err.to_string(),
            ApiError::Encode(_) => MSG_ENCODE_FAILED.to_string(),
        }
    }

    pub fn status(&self, policy: StatusPolicy) -> StatusCode {
        if policy == StatusPolicy::AlwaysOk {
            return StatusCode::OK;
        }
        match self {
            ApiError::InvalidRequest(_) | ApiError::EmptyUrl => StatusCode::BAD_REQUEST,
            ApiError::Fetch(HttpError::Url(_)) => StatusCode::BAD_REQUEST,
            ApiError::Fetch(HttpError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Fetch(_) => StatusCode::BAD_GATEWAY,
            ApiError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_http(self, policy: StatusPolicy) -> Response {
        let status = self.status(policy);
        DownloadResponse::failure(self.public_message()).into_http(status, policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stelle_http::StatusCode as UpstreamStatus;

    #[test]
    fn failure_serialises_only_success_and_message() {
        let body = serde_json::to_value(DownloadResponse::failure(MSG_EMPTY_URL)).unwrap();
        assert_eq!(
            body,
            json!({"success": false, "message": "Please provide the URL"})
        );
    }

    #[test]
    fn record_without_links_keeps_empty_map_and_message() {
        let record = ExtractedRecord {
            id: "42".into(),
            title: "No Title".into(),
            low: None,
            high: None,
        };
        let body = serde_json::to_value(DownloadResponse::from_record(&record)).unwrap();
        assert_eq!(
            body,
            json!({
                "success": true,
                "id": "42",
                "title": "No Title",
                "links": {},
                "message": "No download links could be extracted"
            })
        );
    }

    #[test]
    fn record_with_links_has_no_message_and_omits_empty_id() {
        let record = ExtractedRecord {
            id: String::new(),
            title: "Clip".into(),
            low: Some("https://s".into()),
            high: None,
        };
        let body = serde_json::to_value(DownloadResponse::from_record(&record)).unwrap();
        assert_eq!(
            body,
            json!({
                "success": true,
                "title": "Clip",
                "links": {"Download Low Quality(360p)": "https://s&dl=1"}
            })
        );
    }

    #[test]
    fn semantic_statuses() {
        let p = StatusPolicy::Semantic;
        assert_eq!(ApiError::EmptyUrl.status(p), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::InvalidRequest("eof".into()).status(p),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Fetch(HttpError::Status {
                status: UpstreamStatus::NOT_FOUND
            })
            .status(p),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::Fetch(HttpError::Network("connection refused".into())).status(p),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::Encode("boom".into()).status(p),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn always_ok_policy_flattens_every_status() {
        let p = StatusPolicy::AlwaysOk;
        assert_eq!(ApiError::EmptyUrl.status(p), StatusCode::OK);
        assert_eq!(ApiError::Encode("x".into()).status(p), StatusCode::OK);
    }

    #[test]
    fn fetch_errors_surface_their_message() {
        let err = ApiError::Fetch(HttpError::Network("dns error: no such host".into()));
        assert_eq!(err.public_message(), "dns error: no such host");
        let err = ApiError::Fetch(HttpError::Status {
            status: UpstreamStatus::FORBIDDEN,
        });
        assert_eq!(err.public_message(), "failed to fetch page");
    }

    #[test]
    fn fallback_body_is_valid_json() {
        let v: DownloadResponse = serde_json::from_str(ENCODE_FAILED_BODY).unwrap();
        assert_eq!(v, DownloadResponse::failure(MSG_ENCODE_FAILED));
    }
}
