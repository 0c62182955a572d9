//! HTTP route definitions and handlers.
//!
//! This module organizes all HTTP endpoints into logical groups:
//! authentication, guild configuration, diagnostics, and health checks.

mod auth_routes;
mod diagnostics_routes;
mod guild_routes;
mod health_routes;

use crate::state::AppState;
use axum::Router;

/// Creates the application router with all configured routes.
///
/// Combines all route modules into a single router and attaches
/// the application state for access in handlers.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(auth_routes::routes())
        .merge(guild_routes::routes())
        .merge(diagnostics_routes::routes())
        .merge(health_routes::routes())
        .with_state(state)
}
