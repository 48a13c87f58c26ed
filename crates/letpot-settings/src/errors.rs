//! Settings errors. File errors name the file that failed.

use std::path::PathBuf;

use thiserror::Error;

/// Why settings could not be loaded.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// Settings file being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not JSON, or a value has the wrong type.
    #[error("{} is not a valid LetPot settings file: {source}", path.display())]
    Json {
        /// Settings file being parsed.
        path: PathBuf,
        /// Parser error, with line and column when available.
        #[source]
        source: serde_json::Error,
    },

    /// A value parsed but cannot produce a working client.
    #[error("invalid `{key}`: {reason}")]
    InvalidValue {
        /// Dotted camelCase key, as written in the settings file.
        key: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl SettingsError {
    pub(crate) fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key,
            reason: reason.into(),
        }
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
