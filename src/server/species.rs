//! `GET /species`.

use super::AppState;
use crate::analysis::LocationFields;
use crate::error::Result;
use axum::Json;
use axum::extract::{Query, State};
use serde::Serialize;

/// Species expected at a location.
#[derive(Debug, Serialize)]
pub struct SpeciesResponse {
    /// Always `true`.
    pub success: bool,
    /// Week the list applies to.
    pub week: u32,
    /// Labels, sorted.
    pub species: Vec<String>,
}

/// List species plausible at `lat`/`lon` for `week` (or `date`, or today).
pub async fn species(
    State(state): State<AppState>,
    Query(fields): Query<LocationFields>,
) -> Result<Json<SpeciesResponse>> {
    let (week, species) = state.gateway.species(&fields).await?;
    Ok(Json(SpeciesResponse {
        success: true,
        week,
        species,
    }))
}
