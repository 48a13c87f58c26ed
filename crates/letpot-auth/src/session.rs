//! The process-wide session and the store that owns it.

use std::fmt;

use tokio::sync::{Mutex, MutexGuard};

use crate::types::AuthData;

/// Credentials of the logged-in user.
///
/// Created by a successful login and updated in place by every refresh.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque user id taken from the access token's `uid` claim.
    pub user_id: String,
    /// Lowercased account email.
    pub email: String,
    /// Bearer token for protected API calls.
    pub access_token: String,
    /// Access token expiry, Unix epoch seconds.
    pub access_token_expires_at: i64,
    /// Token used to obtain a new access token.
    pub refresh_token: String,
    /// Refresh token expiry, Unix epoch seconds.
    pub refresh_token_expires_at: i64,
}

impl Session {
    /// Whether the access token is no longer usable at `now`.
    pub fn access_expired(&self, now: i64) -> bool {
        now >= self.access_token_expires_at
    }

    /// Whether the refresh token is no longer usable at `now`.
    pub fn refresh_expired(&self, now: i64) -> bool {
        now >= self.refresh_token_expires_at
    }

    /// Apply a refresh response.
    ///
    /// The refresh token is only replaced when the response rotates it.
    pub(crate) fn apply_refresh(&mut self, user_id: String, data: AuthData) {
        self.user_id = user_id;
        self.access_token = data.token.token;
        self.access_token_expires_at = data.token.exp;
        if let Some(refresh) = data.refresh_token {
            self.refresh_token = refresh.token;
            self.refresh_token_expires_at = refresh.exp;
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("access_token", &"<redacted>")
            .field("access_token_expires_at", &self.access_token_expires_at)
            .field("refresh_token", &"<redacted>")
            .field("refresh_token_expires_at", &self.refresh_token_expires_at)
            .finish()
    }
}

/// Holder of the single [`Session`].
///
/// Empty until the first login. The lock is async so a refresh can hold it
/// across the network call: the next reader sees either the old session or
/// the fully refreshed one.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: Mutex<Option<Session>>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusive access to the slot, for read-modify-write sequences.
    pub async fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.inner.lock().await
    }

    /// Copy of the current session, if any.
    pub async fn snapshot(&self) -> Option<Session> {
        self.inner.lock().await.clone()
    }

    /// Install or overwrite the session fields after a login.
    ///
    /// An existing session is updated in place rather than swapped out.
    pub async fn set(&self, session: Session) {
        let mut slot = self.inner.lock().await;
        match slot.as_mut() {
            Some(existing) => *existing = session,
            None => *slot = Some(session),
        }
    }

    /// Whether a login has happened.
    pub async fn is_logged_in(&self) -> bool {
        self.inner.lock().await.is_some()
    }
}

#[cfg(test)]
pub(crate) fn sample_session(access_expires_at: i64, refresh_expires_at: i64) -> Session {
    Session {
        user_id: "uid-123".to_string(),
        email: "user@example.com".to_string(),
        access_token: "access".to_string(),
        access_token_expires_at: access_expires_at,
        refresh_token: "refresh".to_string(),
        refresh_token_expires_at: refresh_expires_at,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
