//! Server-side sessions
//!
//! A session handle is an opaque 256-bit random token. Sessions end when
//! their TTL elapses or on revoke; an ended session never comes back.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use crate::error::{BrokerError, Result};
use crate::identity::Identity;
use crate::login_state::generate_random_string;

/// Default session lifetime: 24 hours
pub const SESSION_TTL_SECONDS: i64 = 86_400;

/// Opaque session handle, handed to the caller as a cookie or bearer value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    fn generate() -> Self {
        Self(generate_random_string(32))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: SessionId,
    pub identity: Identity,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Concurrent session table
pub struct SessionStore {
    sessions: DashMap<SessionId, Session>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Duration::seconds(SESSION_TTL_SECONDS))
    }
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl: ttl.min(Duration::seconds(fg_config::MAX_TTL_SECS)),
        }
    }

    pub fn create(&self, identity: Identity) -> SessionId {
        let now = Utc::now();
        let session = Session {
            session_id: SessionId::generate(),
            identity,
            created_at: now,
            expires_at: now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        let session_id = session.session_id.clone();
        self.sessions.insert(session_id.clone(), session);
        session_id
    }

    /// Identity behind a live session
    ///
    /// An expired session is evicted on first sight.
    pub fn resolve(&self, session_id: &SessionId) -> Result<Identity> {
        match self.sessions.get(session_id) {
            None => return Err(BrokerError::SessionNotFound),
            Some(session) if !session.is_expired() => return Ok(session.identity.clone()),
            Some(_) => {}
        }

        // The read guard is released before taking the write lock
        self.sessions.remove_if(session_id, |_, s| s.is_expired());
        debug!("Evicted expired session");
        Err(BrokerError::SessionExpired)
    }

    /// End a session; unknown or already ended handles are ignored
    pub fn revoke(&self, session_id: &SessionId) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    /// Drop every expired session, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired());
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
