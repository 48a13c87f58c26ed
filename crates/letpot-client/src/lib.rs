//! # letpot-client
//!
//! Service facade over the session and broker layers.
//!
//! - [`LetPotClient`]: login, device listing, pump on/off, and the
//!   cancellable test cycle

#![deny(unsafe_code)]

pub mod client;

pub use client::LetPotClient;
pub use letpot_auth::{Device, Session};
pub use letpot_core::{LetPotError, Result};
pub use letpot_mqtt::ConnectionState;
pub use tokio_util::sync::CancellationToken;
