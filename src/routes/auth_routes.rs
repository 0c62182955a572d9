//! Authentication endpoint handlers: the OAuth login/callback pair,
//! logout, and the current-identity view.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{routing::get, routing::post, Json, Router};
use http::HeaderMap;
use serde::Deserialize;
use tracing::{info, warn};

use crate::models::Identity;
use crate::state::AppState;
use crate::utils::http_helpers::{
    clear_session_cookie, session_cookie, session_id_from_headers, HTTPError,
};

/// Registers authentication routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login))
        .route("/auth/callback", get(callback))
        .route("/auth/logout", post(logout))
        .route("/api/me", get(me))
}

/// Starts an authentication attempt: creates an in-flight session and
/// redirects the browser to the provider's authorize endpoint.
async fn login(State(state): State<AppState>) -> Response {
    let (session_id, nonce) = state.sessions.begin().await;
    let location = state.provider.authorize_redirect(&nonce);

    (
        [(
            "Set-Cookie",
            session_cookie(&state.config.session.cookie_name, session_id),
        )],
        Redirect::temporary(&location),
    )
        .into_response()
}

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
}

/// Completes the OAuth exchange. On success the session becomes
/// authenticated and the browser lands on the configured success path;
/// any failure is terminal for the attempt and sends the browser back to
/// the anonymous landing page. A failed attempt only tears down the
/// in-flight entry: a session that is already authenticated cannot be
/// ended by a stray or forged callback, only by explicit logout.
async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Response {
    let failure = Redirect::temporary(&state.config.session.failure_path);

    let session_id =
        match session_id_from_headers(&headers, &state.config.session.cookie_name) {
            Some(id) => id,
            None => {
                warn!("OAuth callback without a session cookie");
                return failure.into_response();
            }
        };

    let (code, returned_state) = match (params.code, params.state) {
        (Some(code), Some(returned_state)) => (code, returned_state),
        _ => {
            warn!("OAuth callback missing code or state parameter");
            state.sessions.abort_inflight(session_id).await;
            return failure.into_response();
        }
    };

    match state.sessions.inflight_nonce(session_id).await {
        Some(nonce) if nonce == returned_state => {}
        _ => {
            warn!("OAuth callback state nonce mismatch or stale session");
            state.sessions.abort_inflight(session_id).await;
            return failure.into_response();
        }
    }

    let access_token = match state.provider.exchange_code(&code).await {
        Ok(token) => token,
        Err(e) => {
            warn!("Token exchange failed: {}", e);
            state.sessions.abort_inflight(session_id).await;
            return failure.into_response();
        }
    };

    let (id, username, guild_memberships) =
        match state.provider.fetch_identity(&access_token).await {
            Ok(identity) => identity,
            Err(e) => {
                warn!("Identity fetch failed: {}", e);
                state.sessions.abort_inflight(session_id).await;
                return failure.into_response();
            }
        };

    let identity = Identity {
        id,
        username,
        guild_memberships,
        access_token,
    };

    if !state.sessions.complete(session_id, identity).await {
        warn!("Session disappeared during OAuth exchange");
        return failure.into_response();
    }

    info!("Authentication completed for session");
    Redirect::temporary(&state.config.session.success_path).into_response()
}

/// Ends the session. Idempotent: succeeds even when the session record
/// is already gone. Always tells the client to drop its cookie.
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(session_id) =
        session_id_from_headers(&headers, &state.config.session.cookie_name)
    {
        state.sessions.destroy(session_id).await;
    }

    (
        StatusCode::OK,
        [(
            "Set-Cookie",
            clear_session_cookie(&state.config.session.cookie_name),
        )],
        Json(serde_json::json!({ "success": true })),
    )
        .into_response()
}

/// The Identity attached to the caller's session, without the access
/// token (which never serializes).
async fn me(identity: Identity) -> Result<Json<Identity>, HTTPError> {
    Ok(Json(identity))
}
