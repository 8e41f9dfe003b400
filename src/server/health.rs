//! `GET /health`.

use super::AppState;
use crate::classifier::ClassifierKind;
use crate::supervisor::ReadinessState;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

/// Health report.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` or `unhealthy`.
    pub status: &'static str,
    /// Backend readiness.
    pub backend: ReadinessState,
    /// Backend kind.
    pub classifier: ClassifierKind,
    /// Crate version.
    pub version: &'static str,
    /// Seconds since the gateway started.
    pub uptime_seconds: u64,
    /// Last backend failure, when unhealthy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Report readiness. 200 when the backend is ready, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let readiness = state.gateway.readiness();
    let backend = readiness.state();
    let healthy = backend == ReadinessState::Ready;

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" },
        backend,
        classifier: state.gateway.classifier_kind(),
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.started.elapsed().as_secs(),
        detail: if healthy { None } else { readiness.last_error() },
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}
