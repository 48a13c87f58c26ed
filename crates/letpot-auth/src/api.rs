//! HTTP client for the LetPot device-management API.
//!
//! Transport failures become [`LetPotError::Connection`]. Rejections by the
//! auth endpoints become [`LetPotError::Authentication`], rejections by the
//! device endpoint [`LetPotError::Request`], both carrying the response body.

use letpot_core::{LetPotError, Result};
use letpot_settings::ApiSettings;
use reqwest::StatusCode;
use tracing::debug;

use crate::types::{AuthData, AuthResponse, Device, DeviceListResponse, LoginForm};

/// Fallback message when the server sent no body.
const UNKNOWN_ERROR: &str = "Unknown error";

/// Thin wrapper over [`reqwest::Client`] bound to one API base URL.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client from settings.
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| transport_error("building HTTP client", e))?;
        Ok(Self::with_client(http, &settings.base_url))
    }

    /// Wrap an existing [`reqwest::Client`].
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /v1/auth/login` with an email/password form.
    #[tracing::instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthData> {
        let resp = self
            .http
            .post(format!("{}/v1/auth/login", self.base_url))
            .json(&LoginForm::email(email, password))
            .send()
            .await
            .map_err(|e| transport_error("login request", e))?;

        read_auth_response(resp, "login").await
    }

    /// `POST /v1/auth/refresh?refresh_token=...`.
    #[tracing::instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthData> {
        let resp = self
            .http
            .post(format!("{}/v1/auth/refresh", self.base_url))
            .query(&[("refresh_token", refresh_token)])
            .send()
            .await
            .map_err(|e| transport_error("refresh request", e))?;

        read_auth_response(resp, "refresh").await
    }

    /// `GET /v1/user/{user_id}/devices` with a bearer token.
    #[tracing::instrument(skip_all, fields(user_id = %user_id))]
    pub async fn devices(&self, access_token: &str, user_id: &str) -> Result<Vec<Device>> {
        let resp = self
            .http
            .get(format!("{}/v1/user/{user_id}/devices", self.base_url))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| transport_error("device list request", e))?;

        let (status, body) = read_body(resp, "device list").await?;
        let rejected = || LetPotError::Request {
            status: status.as_u16(),
            message: error_message(&body),
        };
        if !status.is_success() {
            return Err(rejected());
        }

        match serde_json::from_str::<DeviceListResponse>(&body) {
            Ok(list) if list.ok => {
                debug!(count = list.data.len(), "fetched devices");
                Ok(list.data)
            }
            _ => Err(rejected()),
        }
    }
}

/// Turn a login/refresh response into its token block.
///
/// A 2xx response still fails unless it parses and carries `ok: true` with
/// a data block.
async fn read_auth_response(resp: reqwest::Response, what: &str) -> Result<AuthData> {
    let (status, body) = read_body(resp, what).await?;
    let rejected = || LetPotError::Authentication {
        status: status.as_u16(),
        message: format!("{what} failed: {}", error_message(&body)),
    };
    if !status.is_success() {
        return Err(rejected());
    }

    match serde_json::from_str::<AuthResponse>(&body) {
        Ok(AuthResponse {
            ok: true,
            data: Some(data),
        }) => Ok(data),
        _ => Err(rejected()),
    }
}

async fn read_body(resp: reqwest::Response, what: &str) -> Result<(StatusCode, String)> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| transport_error(format!("reading {what} response"), e))?;
    Ok((status, body))
}

/// Wrap a `reqwest` failure as [`LetPotError::Connection`].
///
/// The URL is stripped first: the refresh endpoint carries the refresh token
/// in its query string.
fn transport_error(context: impl Into<String>, err: reqwest::Error) -> LetPotError {
    LetPotError::connection(context, err.without_url())
}

fn error_message(body: &str) -> String {
    if body.trim().is_empty() {
        UNKNOWN_ERROR.to_string()
    } else {
        body.to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
