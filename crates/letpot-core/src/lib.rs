//! # letpot-core
//!
//! Shared vocabulary for the LetPot client crates:
//!
//! - **Errors**: [`LetPotError`], the single taxonomy every layer reports with
//! - **Clock**: [`now_secs`] epoch-seconds helper used for token expiry checks
//! - **Logging**: [`logging::init_subscriber`] for binaries

#![deny(unsafe_code)]

pub mod errors;
pub mod logging;

pub use errors::{BoxError, LetPotError, Result};

/// Current time as Unix epoch seconds.
///
/// Token expiry instants returned by the API are epoch seconds, so every
/// validity comparison goes through this helper.
pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
