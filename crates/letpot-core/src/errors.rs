//! Error taxonomy shared by the auth, broker, and client layers.

use thiserror::Error;

/// Boxed transport error kept as the source of a [`LetPotError::Connection`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by LetPot operations.
///
/// Protocol-level rejections ([`Authentication`](Self::Authentication),
/// [`Request`](Self::Request)) are kept apart from transport failures
/// ([`Connection`](Self::Connection)) so callers can tell "the server said
/// no" from "we never reached the server".
#[derive(Debug, Error)]
pub enum LetPotError {
    /// The server rejected the login or refresh request.
    #[error("authentication failed ({status}): {message}")]
    Authentication {
        /// HTTP status code of the rejecting response.
        status: u16,
        /// Server error body, or a fallback description.
        message: String,
    },

    /// The refresh token itself has expired; a new login is required.
    #[error("refresh token has expired, log in again")]
    SessionExpired,

    /// A protected operation was attempted before any login.
    #[error("not logged in, call login first")]
    NotAuthenticated,

    /// Transport-level failure talking to the HTTP API or the broker.
    #[error("connection error: {context}")]
    Connection {
        /// What was being attempted.
        context: String,
        /// Underlying transport error, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// Claim extraction from an access token failed.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// A non-auth API call was rejected (e.g. device list returned `ok: false`).
    #[error("request rejected ({status}): {message}")]
    Request {
        /// HTTP status code of the rejecting response.
        status: u16,
        /// Server error body, or a fallback description.
        message: String,
    },

    /// Payload length does not fit the 16-bit total-length field of a packet.
    #[error("payload of {len} bytes exceeds the packet length field")]
    PayloadTooLarge {
        /// Offending payload length.
        len: usize,
    },

    /// The operation was cancelled before it completed.
    #[error("operation cancelled")]
    Cancelled,
}

impl LetPotError {
    /// Build a [`Connection`](Self::Connection) error wrapping a transport error.
    pub fn connection(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Connection {
            context: context.into(),
            source: Some(source.into()),
        }
    }

    /// Build a [`Connection`](Self::Connection) error with no underlying cause.
    pub fn connection_msg(context: impl Into<String>) -> Self {
        Self::Connection {
            context: context.into(),
            source: None,
        }
    }

    /// Whether the caller has to log in again before retrying.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::NotAuthenticated)
    }
}

/// Result type for LetPot operations.
pub type Result<T> = std::result::Result<T, LetPotError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
