//! Wire types for the LetPot HTTP API.

use serde::{Deserialize, Serialize};

/// Body of `POST /v1/auth/login`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginForm<'a> {
    /// Always `"EMAIL"`.
    pub login_type: &'static str,
    /// Account email as typed by the user.
    pub email: &'a str,
    /// Account password.
    pub password: &'a str,
    /// Empty placeholder expected by the endpoint.
    #[serde(rename = "refresh_token")]
    pub refresh_token: &'static str,
}

impl<'a> LoginForm<'a> {
    /// Build an email login form.
    pub fn email(email: &'a str, password: &'a str) -> Self {
        Self {
            login_type: "EMAIL",
            email,
            password,
            refresh_token: "",
        }
    }
}

/// Response of the login and refresh endpoints.
#[derive(Clone, Debug, Deserialize)]
pub struct AuthResponse {
    /// Explicit success flag; absent means failure.
    #[serde(default)]
    pub ok: bool,
    /// Token block, present on success.
    pub data: Option<AuthData>,
}

/// Token block of an [`AuthResponse`].
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthData {
    /// Access token and its expiry.
    pub token: TokenInfo,
    /// Refresh token and its expiry; refresh responses may omit it.
    pub refresh_token: Option<TokenInfo>,
}

/// An opaque token with its absolute expiry.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenInfo {
    /// Opaque token string.
    pub token: String,
    /// Expiry as Unix epoch seconds.
    pub exp: i64,
}

/// Response of `GET /v1/user/{userId}/devices`.
#[derive(Clone, Debug, Deserialize)]
pub struct DeviceListResponse {
    /// Explicit success flag.
    #[serde(default)]
    pub ok: bool,
    /// Registered devices.
    #[serde(default)]
    pub data: Vec<Device>,
}

/// A device registered to the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Device serial, also the broker topic prefix.
    pub device_id: String,
    /// User-assigned name.
    #[serde(default)]
    pub device_name: Option<String>,
    /// Device type code.
    #[serde(default)]
    pub device_type: Option<String>,
    /// Online/offline status as reported by the API.
    #[serde(default)]
    pub device_status: Option<String>,
    /// Hardware model.
    #[serde(default)]
    pub device_model: Option<String>,
    /// Installed firmware version.
    #[serde(default)]
    pub firmware_version: Option<String>,
}

impl Device {
    /// Name for display, falling back to the device id.
    pub fn display_name(&self) -> &str {
        self.device_name.as_deref().unwrap_or(&self.device_id)
    }
}
