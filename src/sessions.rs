//! In-memory session manager.
//!
//! Sessions move through `Anonymous -> AuthenticationInFlight ->
//! Authenticated -> Anonymous`. The session record is the only place an
//! Identity (and its access token) lives; destroying the session
//! destroys that view. Nothing here is persisted.
//!
//! Entries carry an expiry so anonymous traffic cannot grow the map
//! without bound: abandoned exchanges and idle authenticated sessions
//! become invisible once expired and are physically reaped by the sweep
//! in `begin`.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

/// How long an unfinished OAuth exchange may sit before it is reaped.
const INFLIGHT_TTL: Duration = Duration::from_secs(10 * 60);

/// Lifetime of an authenticated session. The membership snapshot goes
/// stale over this span anyway; re-authentication refreshes both.
const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// State of one session slot.
#[derive(Debug, Clone)]
pub enum Session {
    /// An OAuth exchange has been started; holds the state nonce sent to
    /// the provider so the callback can be matched to this session.
    AuthenticationInFlight { state_nonce: String },
    Authenticated(crate::models::Identity),
}

#[derive(Debug, Clone)]
struct SessionEntry {
    session: Session,
    expires_at: Instant,
}

impl SessionEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// Uuid-keyed session map shared across handlers.
#[derive(Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts an authentication attempt: creates a new session in the
    /// in-flight state and returns its id plus the state nonce to hand
    /// to the provider. Also sweeps out every expired entry, so the map
    /// stays bounded by live traffic.
    pub async fn begin(&self) -> (Uuid, String) {
        let session_id = Uuid::new_v4();
        let state_nonce = Uuid::new_v4().to_string();
        let now = Instant::now();

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, entry| !entry.is_expired(now));
        sessions.insert(
            session_id,
            SessionEntry {
                session: Session::AuthenticationInFlight {
                    state_nonce: state_nonce.clone(),
                },
                expires_at: now + INFLIGHT_TTL,
            },
        );
        (session_id, state_nonce)
    }

    /// Returns the state nonce if the session exists, is in-flight, and
    /// has not expired.
    pub async fn inflight_nonce(&self, session_id: Uuid) -> Option<String> {
        let now = Instant::now();
        match self.sessions.read().await.get(&session_id) {
            Some(entry) if !entry.is_expired(now) => match &entry.session {
                Session::AuthenticationInFlight { state_nonce } => Some(state_nonce.clone()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Promotes an in-flight session to authenticated. Returns false if
    /// the session vanished, expired, or was never in-flight; the
    /// caller treats that as a failed exchange.
    pub async fn complete(&self, session_id: Uuid, identity: crate::models::Identity) -> bool {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        match sessions.get(&session_id) {
            Some(entry)
                if !entry.is_expired(now)
                    && matches!(entry.session, Session::AuthenticationInFlight { .. }) =>
            {
                sessions.insert(
                    session_id,
                    SessionEntry {
                        session: Session::Authenticated(identity),
                        expires_at: now + SESSION_TTL,
                    },
                );
                true
            }
            _ => false,
        }
    }

    /// The Identity attached to a valid, unexpired authenticated session.
    pub async fn identity(&self, session_id: Uuid) -> Option<crate::models::Identity> {
        let now = Instant::now();
        match self.sessions.read().await.get(&session_id) {
            Some(entry) if !entry.is_expired(now) => match &entry.session {
                Session::Authenticated(identity) => Some(identity.clone()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Tears down a failed authentication attempt. Removes the entry
    /// only while it is still in-flight; an authenticated session is
    /// left untouched, since only explicit logout may end it.
    pub async fn abort_inflight(&self, session_id: Uuid) {
        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get(&session_id) {
            if matches!(entry.session, Session::AuthenticationInFlight { .. }) {
                sessions.remove(&session_id);
            }
        }
    }

    /// Invalidates a session. Idempotent: removing a session that is
    /// already gone is a success.
    pub async fn destroy(&self, session_id: Uuid) {
        self.sessions.write().await.remove(&session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Identity;

    fn identity() -> Identity {
        Identity {
            id: "u1".to_string(),
            username: "tester".to_string(),
            guild_memberships: vec![],
            access_token: "tok".to_string(),
        }
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let sessions = SessionManager::new();
        let (id, nonce) = sessions.begin().await;

        assert_eq!(sessions.inflight_nonce(id).await.as_deref(), Some(&*nonce));
        assert!(sessions.identity(id).await.is_none());

        assert!(sessions.complete(id, identity()).await);
        assert_eq!(sessions.identity(id).await.unwrap().id, "u1");
        // Once authenticated, the in-flight nonce is gone.
        assert!(sessions.inflight_nonce(id).await.is_none());

        sessions.destroy(id).await;
        assert!(sessions.identity(id).await.is_none());
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let sessions = SessionManager::new();
        let (id, _) = sessions.begin().await;
        sessions.destroy(id).await;
        // Second destroy of the same id must not panic or error.
        sessions.destroy(id).await;
    }

    #[tokio::test]
    async fn test_complete_requires_inflight_session() {
        let sessions = SessionManager::new();
        assert!(!sessions.complete(Uuid::new_v4(), identity()).await);
    }

    #[tokio::test]
    async fn test_abort_inflight_removes_only_inflight_entries() {
        let sessions = SessionManager::new();
        let (id, _) = sessions.begin().await;
        sessions.abort_inflight(id).await;
        assert!(sessions.inflight_nonce(id).await.is_none());
    }

    /// Only explicit logout may end an authenticated session; aborting a
    /// failed exchange against it must leave it alone.
    #[tokio::test]
    async fn test_abort_inflight_leaves_authenticated_session() {
        let sessions = SessionManager::new();
        let (id, _) = sessions.begin().await;
        assert!(sessions.complete(id, identity()).await);

        sessions.abort_inflight(id).await;
        assert!(sessions.identity(id).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_inflight_entry_expires() {
        let sessions = SessionManager::new();
        let (id, _) = sessions.begin().await;

        tokio::time::advance(INFLIGHT_TTL + Duration::from_secs(1)).await;

        assert!(sessions.inflight_nonce(id).await.is_none());
        assert!(!sessions.complete(id, identity()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_authenticated_session_expires() {
        let sessions = SessionManager::new();
        let (id, _) = sessions.begin().await;
        assert!(sessions.complete(id, identity()).await);

        tokio::time::advance(SESSION_TTL + Duration::from_secs(1)).await;

        assert!(sessions.identity(id).await.is_none());
    }

    /// Abandoned exchanges must not accumulate: the sweep in begin reaps
    /// everything expired.
    #[tokio::test(start_paused = true)]
    async fn test_begin_sweeps_expired_entries() {
        let sessions = SessionManager::new();
        for _ in 0..10 {
            sessions.begin().await;
        }
        assert_eq!(sessions.sessions.read().await.len(), 10);

        tokio::time::advance(INFLIGHT_TTL + Duration::from_secs(1)).await;
        sessions.begin().await;

        assert_eq!(sessions.sessions.read().await.len(), 1);
    }
}
