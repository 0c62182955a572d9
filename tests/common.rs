use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::Router;
use figment::{
    providers::{Format, Yaml},
    Figment,
};
use uuid::Uuid;

use guilddash::config::{Config, ConfigV1};
use guilddash::models::{GuildMembership, Identity};
use guilddash::provider::create_provider;
use guilddash::routes::create_router;
use guilddash::sessions::SessionManager;
use guilddash::state::AppState;
use guilddash::store::create_store;

/// Test config with the in-memory store; the provider api_base is
/// injected so tests can point it at a mockito server (or a dead port
/// when the provider is not exercised).
pub fn test_config(api_base: &str) -> ConfigV1 {
    let yaml = format!(
        r#"
version: "1.0.0"
logging:
  level: "debug"
  format: "console"
store:
  type: "memory"
provider:
  client_id: "client"
  client_secret: "secret"
  redirect_uri: "http://localhost:8080/auth/callback"
  bot_token: "bot-token"
  api_base: "{api_base}"
  authorize_url: "{api_base}/oauth2/authorize"
bind_address: 127.0.0.1:8085
"#
    );

    let config: Config = Figment::new()
        .merge(Yaml::string(&yaml))
        .extract()
        .expect("Failed to parse test config YAML");

    match config {
        Config::ConfigV1(cfg) => cfg,
    }
}

pub async fn build_app(config: ConfigV1) -> (Router, AppState) {
    let config = Arc::new(config);
    let store = create_store(&config.store).await;
    let provider = create_provider(&config.provider);
    let sessions = Arc::new(SessionManager::new());

    let state = AppState {
        config: config.clone(),
        provider,
        store,
        sessions,
    };

    (create_router(state.clone()), state)
}

pub fn membership(guild_id: &str, permissions: u64) -> GuildMembership {
    GuildMembership {
        guild_id: guild_id.to_string(),
        name: format!("guild-{}", guild_id),
        icon: None,
        permissions,
    }
}

pub fn identity(memberships: Vec<GuildMembership>) -> Identity {
    Identity {
        id: "user-1".to_string(),
        username: "tester".to_string(),
        guild_memberships: memberships,
        access_token: "session-token".to_string(),
    }
}

/// Inserts an authenticated session directly, skipping the OAuth dance,
/// and returns the session id for the cookie.
pub async fn seed_session(state: &AppState, identity: Identity) -> Uuid {
    let (session_id, _nonce) = state.sessions.begin().await;
    assert!(state.sessions.complete(session_id, identity).await);
    session_id
}

pub fn request(path: &str, method: Method, session: Option<Uuid>) -> Request<Body> {
    request_with_body(path, method, session, None)
}

pub fn request_with_body(
    path: &str,
    method: Method,
    session: Option<Uuid>,
    json_body: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);

    if let Some(session_id) = session {
        builder = builder.header("Cookie", format!("guilddash_session={}", session_id));
    }

    match json_body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("failed to build request")
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body is not JSON")
}
