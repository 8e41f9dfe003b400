//! `POST /analyze`.

use super::AppState;
use crate::analysis::AnalysisResult;
use crate::error::{Error, Result};
use crate::gateway::AnalyzeForm;
use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use serde::Serialize;

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    /// Always `true`.
    pub success: bool,
    /// Ranked species and counters.
    #[serde(flatten)]
    pub result: AnalysisResult,
}

/// Classify an uploaded clip.
pub async fn analyze(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>> {
    let multipart = multipart.map_err(|rejection| Error::InvalidRequest {
        message: rejection.body_text(),
    })?;

    let form = AnalyzeForm::read(multipart, state.gateway.settings().max_upload_bytes).await?;
    let result = state.gateway.analyze(form).await?;

    Ok(Json(AnalyzeResponse {
        success: true,
        result,
    }))
}
