//! Session lifecycle: login, expiry tracking, and silent refresh.

use std::sync::Arc;

use letpot_core::{LetPotError, Result, now_secs};
use letpot_settings::ApiSettings;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::claims;
use crate::session::{Session, SessionStore};
use crate::types::Device;

/// Drives login and refresh against the API and guards every protected call.
///
/// Cloning is cheap; clones share the same [`SessionStore`].
#[derive(Clone, Debug)]
pub struct SessionManager {
    api: ApiClient,
    store: Arc<SessionStore>,
}

impl SessionManager {
    /// Create a manager with an empty store.
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        Ok(Self::with_store(ApiClient::new(settings)?, Arc::new(SessionStore::new())))
    }

    /// Create a manager over an existing client and store.
    pub fn with_store(api: ApiClient, store: Arc<SessionStore>) -> Self {
        Self { api, store }
    }

    /// The shared session store.
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Log in with email and password and install the resulting session.
    #[tracing::instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let data = self.api.login(email, password).await?;
        let Some(refresh) = data.refresh_token else {
            return Err(LetPotError::Authentication {
                status: 200,
                message: "login response carried no refresh token".to_string(),
            });
        };
        let user_id = claims::unverified_uid(&data.token.token)?;

        let session = Session {
            user_id,
            email: email.to_lowercase(),
            access_token: data.token.token,
            access_token_expires_at: data.token.exp,
            refresh_token: refresh.token,
            refresh_token_expires_at: refresh.exp,
        };
        self.store.set(session.clone()).await;
        info!(user_id = %session.user_id, "logged in");
        Ok(session)
    }

    /// Make sure the session can be used for a protected call.
    ///
    /// Refreshes the access token when it has expired. The store lock is held
    /// for the whole check-and-refresh, so concurrent callers wait for an
    /// in-flight refresh instead of starting their own.
    ///
    /// Returns a copy of the (possibly refreshed) session.
    #[tracing::instrument(skip_all)]
    pub async fn ensure_valid_session(&self) -> Result<Session> {
        let mut slot = self.store.lock().await;
        let Some(session) = slot.as_mut() else {
            return Err(LetPotError::NotAuthenticated);
        };

        let now = now_secs();
        // Access expiry first; refresh expiry only decides whether a refresh is possible.
        if session.access_expired(now) {
            if session.refresh_expired(now) {
                warn!(user_id = %session.user_id, "refresh token expired");
                return Err(LetPotError::SessionExpired);
            }

            info!(user_id = %session.user_id, "access token expired, refreshing");
            let data = self.api.refresh(&session.refresh_token).await?;
            let user_id = claims::unverified_uid(&data.token.token)?;
            session.apply_refresh(user_id, data);
        }

        Ok(session.clone())
    }

    /// List the devices registered to the logged-in user.
    #[tracing::instrument(skip_all)]
    pub async fn devices(&self) -> Result<Vec<Device>> {
        let session = self.ensure_valid_session().await?;
        self.api
            .devices(&session.access_token, &session.user_id)
            .await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
