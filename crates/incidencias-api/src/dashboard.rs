//! Handler for `GET /dashboard`.

use axum::{Json, extract::State};
use incidencias_core::{dashboard::Dashboard, store::IncidentStore};

use crate::{AppState, error::ApiError};

/// `GET /dashboard`: incident counts by type and by status.
pub async fn handler<S>(State(state): State<AppState<S>>) -> Result<Json<Dashboard>, ApiError>
where
  S: IncidentStore + 'static,
{
  let incidents = state.incidents.list().await?;
  Ok(Json(Dashboard::from_incidents(&incidents)))
}
