//! Pending Login State
//!
//! One record per `begin_login`, keyed by the random `state` value sent to
//! the provider. A record correlates the callback with the request that
//! started it, carries the nonce expected inside the ID token and keeps the
//! PKCE code verifier on our side. Records are single use.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::{BrokerError, Result};

/// Default lifetime of a pending login: 10 minutes
pub const STATE_EXPIRY_SECONDS: i64 = 600;

/// Default cap on records awaiting their callback
pub const MAX_PENDING_STATES: usize = 10_000;

/// Pending login record
#[derive(Debug, Clone)]
pub struct LoginState {
    /// Random state parameter, also the store key
    pub state: String,
    pub provider_id: String,
    /// Expected ID token nonce; only for providers that issue ID tokens
    pub nonce: Option<String>,
    /// PKCE code verifier (the provider only sees its challenge)
    pub code_verifier: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl LoginState {
    fn new(provider_id: &str, with_nonce: bool, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            state: generate_random_string(32),
            provider_id: provider_id.to_string(),
            nonce: with_nonce.then(|| generate_random_string(32)),
            code_verifier: generate_code_verifier(),
            created_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// S256 challenge for the stored verifier
    pub fn code_challenge(&self) -> String {
        generate_code_challenge(&self.code_verifier)
    }
}

/// Concurrent store of pending logins
///
/// Holds at most `max_pending` records (give or take concurrent inserts).
/// Expired records are swept once the cap is reached; if every record is
/// still live the oldest one is evicted.
pub struct LoginStateStore {
    states: DashMap<String, LoginState>,
    ttl: Duration,
    max_pending: usize,
}

impl Default for LoginStateStore {
    fn default() -> Self {
        Self::new(Duration::seconds(STATE_EXPIRY_SECONDS))
    }
}

impl LoginStateStore {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, MAX_PENDING_STATES)
    }

    pub fn with_capacity(ttl: Duration, max_pending: usize) -> Self {
        Self {
            states: DashMap::new(),
            ttl: ttl.min(Duration::seconds(fg_config::MAX_TTL_SECS)),
            max_pending: max_pending.max(1),
        }
    }

    /// Issue and store a fresh state for `provider_id`
    pub fn issue(&self, provider_id: &str, with_nonce: bool) -> LoginState {
        if self.states.len() >= self.max_pending {
            self.make_room();
        }

        let login_state = LoginState::new(provider_id, with_nonce, self.ttl);
        self.states
            .insert(login_state.state.clone(), login_state.clone());
        login_state
    }

    /// Take the state out of the store
    ///
    /// Unknown, already consumed, expired, or issued for another provider
    /// all fail with `StateMismatch`. The record is gone afterwards in every
    /// case.
    pub fn consume(&self, state: &str, provider_id: &str) -> Result<LoginState> {
        let (_, login_state) = self.states.remove(state).ok_or(BrokerError::StateMismatch)?;

        if login_state.is_expired() || login_state.provider_id != provider_id {
            return Err(BrokerError::StateMismatch);
        }
        Ok(login_state)
    }

    /// Drop expired records, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let before = self.states.len();
        self.states.retain(|_, s| !s.is_expired());
        before.saturating_sub(self.states.len())
    }

    fn make_room(&self) {
        self.purge_expired();
        if self.states.len() < self.max_pending {
            return;
        }

        let oldest = self
            .states
            .iter()
            .min_by_key(|entry| entry.value().created_at)
            .map(|entry| entry.key().clone());
        if let Some(state) = oldest {
            warn!(max_pending = self.max_pending, "Pending login states at capacity, evicting oldest");
            self.states.remove(&state);
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// `length` random bytes, base64url without padding
pub(crate) fn generate_random_string(length: usize) -> String {
    let bytes: Vec<u8> = (0..length).map(|_| rand::thread_rng().gen()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

fn generate_code_verifier() -> String {
    generate_random_string(32)
}

pub(crate) fn generate_code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    let hash = hasher.finalize();
    URL_SAFE_NO_PAD.encode(hash)
}
