//! Shared application state.
//!
//! Contains the state that is shared across all request handlers,
//! including configuration, the identity provider client, the guild
//! configuration store, and the session manager. The store and provider
//! are trait objects threaded through here so tests can substitute
//! in-process fakes.

use crate::config::ConfigV1;
use crate::provider::IdentityProvider;
use crate::sessions::SessionManager;
use crate::store::Store;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// This state is cloned for each request handler; all members are
/// Arc-shared singletons.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    /// Client for the external identity provider.
    pub provider: Arc<dyn IdentityProvider>,
    /// Guild configuration store (both physical schemas).
    pub store: Arc<dyn Store>,
    /// In-memory session manager owning every live Identity.
    pub sessions: Arc<SessionManager>,
}
