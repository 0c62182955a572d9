//! Application startup and server initialization.
//!
//! This module handles the creation and configuration of the HTTP server,
//! including initialization of the identity provider client, the guild
//! configuration store, the session manager, and route setup.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ConfigV1;
use crate::provider::create_provider;
use crate::routes;
use crate::sessions::SessionManager;
use crate::state::AppState;
use crate::store::create_store;

/// Initializes and runs the application server.
///
/// Sets up the store, the provider client, and the session manager, then
/// binds to the address specified in the configuration and starts
/// serving requests.
///
/// # Errors
///
/// Returns an error if the server fails to bind to the specified address
/// or encounters a runtime error during execution.
pub async fn run(config: Arc<ConfigV1>) -> Result<(), Box<dyn std::error::Error>> {
    let store = create_store(&config.store).await;
    let provider = create_provider(&config.provider);
    let sessions = Arc::new(SessionManager::new());

    info!("Starting server on {}", config.bind_address);

    let state = AppState {
        config: config.clone(),
        provider,
        store,
        sessions,
    };

    let app = routes::create_router(state);

    let listener = TcpListener::bind(&config.bind_address)
        .await
        .expect("Could not bind to specified address");

    axum::serve(listener, app).await?;

    Ok(())
}
