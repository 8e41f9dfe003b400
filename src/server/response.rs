//! Error responses.

use crate::constants::server::RETRY_AFTER_SECS;
use crate::error::Error;
use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, warn};

/// Failure envelope: `{"success": false, "error": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Always `false`.
    pub success: bool,
    /// Client-facing message.
    pub error: String,
}

impl Error {
    /// HTTP status for this error.
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::BackendUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::BackendTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::BackendUnreachable { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show a client. Transport and internal details stay
    /// in the logs.
    pub fn client_message(&self) -> String {
        match self {
            Self::InvalidRequest { .. }
            | Self::PayloadTooLarge { .. }
            | Self::BackendUnavailable { .. }
            | Self::ClassifierInternal { .. } => self.to_string(),
            Self::BackendTimeout { .. } => "Classification timed out".to_string(),
            Self::BackendUnreachable { .. } => "Classifier backend is unreachable".to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if self.is_retryable() {
            warn!(error = %self, "request failed");
        } else if status.is_server_error() {
            error!(error = ?self, "request failed");
        } else {
            warn!(error = %self, "request rejected");
        }

        let body = Json(ErrorBody {
            success: false,
            error: self.client_message(),
        });

        let mut response = (status, body).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(RETRY_AFTER_SECS));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                Error::InvalidRequest {
                    message: "No audio file provided".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (Error::PayloadTooLarge { limit: 10 }, StatusCode::PAYLOAD_TOO_LARGE),
            (
                Error::BackendUnavailable {
                    state: "starting".to_string(),
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (Error::BackendTimeout { timeout_secs: 60 }, StatusCode::GATEWAY_TIMEOUT),
            (
                Error::BackendUnreachable {
                    url: "http://127.0.0.1:8080/classify".to_string(),
                    source: "connection refused".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                Error::ClassifierInternal {
                    message: "model crashed".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                Error::Internal {
                    message: "lock poisoned".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.status_code(), status, "{error}");
        }
    }

    #[test]
    fn test_client_messages_hide_details() {
        let unreachable = Error::BackendUnreachable {
            url: "http://10.0.0.5:8080/classify".to_string(),
            source: "connection refused".into(),
        };
        assert!(!unreachable.client_message().contains("10.0.0.5"));

        let internal = Error::Internal {
            message: "lock poisoned".to_string(),
        };
        assert_eq!(internal.client_message(), "Internal server error");

        let backend = Error::ClassifierInternal {
            message: "model crashed".to_string(),
        };
        assert!(backend.client_message().contains("model crashed"));
    }

    #[test]
    fn test_unavailable_sets_retry_after() {
        let response = Error::BackendUnavailable {
            state: "starting".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
    }
}
