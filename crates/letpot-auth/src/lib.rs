//! # letpot-auth
//!
//! Session handling for the LetPot device-management API.
//!
//! - [`SessionManager`]: login, transparent refresh, and device listing
//! - [`SessionStore`]: the single mutable [`Session`], updated in place
//! - [`claims`]: unverified extraction of the `uid` claim from access tokens
//! - [`api`]: thin `reqwest` client for the login/refresh/device endpoints
//!
//! # Example
//!
//! ```no_run
//! use letpot_auth::SessionManager;
//! use letpot_settings::ApiSettings;
//!
//! # async fn run() -> letpot_core::Result<()> {
//! let manager = SessionManager::new(&ApiSettings::default())?;
//! let session = manager.login("me@example.com", "secret").await?;
//! let devices = manager.devices().await?;
//! # Ok(()) }
//! ```

#![deny(unsafe_code)]

pub mod api;
pub mod claims;
pub mod manager;
pub mod session;
pub mod types;

pub use api::ApiClient;
pub use manager::SessionManager;
pub use session::{Session, SessionStore};
pub use types::Device;
