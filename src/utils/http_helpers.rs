use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use http::HeaderMap;
use uuid::Uuid;

use crate::models::Identity;
use crate::state::AppState;

/// A general purpose HTTP error type that can be converted into an `IntoResponse`.
pub struct HTTPError {
    status: StatusCode,
    message: String,
}

impl HTTPError {
    /// Creates a new HTTP error with the given status code and message.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        HTTPError {
            status,
            message: message.into(),
        }
    }

    pub fn unauthenticated() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthenticated")
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "Missing manage-guild permission")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Upstream (identity provider) failures surface as 500 after being
    /// logged with operation context. The raw error never reaches the
    /// client.
    pub fn upstream() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Upstream identity provider unavailable",
        )
    }

    pub fn store() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Store unavailable")
    }
}

/// Converts our `HTTPError` into an HTTP response.
impl IntoResponse for HTTPError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message }).to_string();
        Response::builder()
            .status(self.status)
            .header("Content-Type", "application/json")
            .body(body.into())
            .unwrap()
    }
}

/// Pulls the session id out of the `Cookie` header, if present.
pub fn session_id_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<Uuid> {
    let cookies = headers.get("cookie").and_then(|v| v.to_str().ok())?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name == cookie_name {
            Uuid::parse_str(value).ok()
        } else {
            None
        }
    })
}

/// `Set-Cookie` value establishing the session cookie.
pub fn session_cookie(cookie_name: &str, session_id: Uuid) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", cookie_name, session_id)
}

/// `Set-Cookie` value clearing the session cookie on the client.
pub fn clear_session_cookie(cookie_name: &str) -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", cookie_name)
}

/// Extractor implementation: resolves the session cookie into the
/// Identity attached to the session, rejecting with 401 when there is no
/// valid authenticated session.
#[async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = HTTPError;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        state: &AppState,
    ) -> Result<Identity, HTTPError> {
        let session_id =
            session_id_from_headers(&parts.headers, &state.config.session.cookie_name)
                .ok_or_else(HTTPError::unauthenticated)?;

        state
            .sessions
            .identity(session_id)
            .await
            .ok_or_else(HTTPError::unauthenticated)
    }
}
