//! Drift diagnostics across the two welcome-channel schemas.

use axum::extract::State;
use axum::{routing::get, Json, Router};
use tracing::error;

use crate::models::{Identity, WelcomeDriftReport};
use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;

/// Registers diagnostics routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/diagnostics/welcome-drift", get(welcome_drift))
}

/// Side-by-side read of the legacy welcome map and the per-guild
/// documents' welcome channels. Pure read, no reconciliation. Requires
/// an authenticated session but no per-guild permission since the report
/// spans all guilds; operators own this endpoint.
async fn welcome_drift(
    _identity: Identity,
    State(state): State<AppState>,
) -> Result<Json<WelcomeDriftReport>, HTTPError> {
    let legacy = state.store.read_legacy_welcome_map().await.map_err(|e| {
        error!("Store failure reading legacy welcome map: {}", e);
        HTTPError::store()
    })?;

    let dashboard = state.store.dashboard_welcome_channels().await.map_err(|e| {
        error!("Store failure listing dashboard welcome channels: {}", e);
        HTTPError::store()
    })?;

    Ok(Json(WelcomeDriftReport { legacy, dashboard }))
}
