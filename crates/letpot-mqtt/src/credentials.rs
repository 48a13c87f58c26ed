//! Broker credential derivation.
//!
//! The broker accepts a username/password pair computed from the account
//! email and the user id of the HTTP session:
//!
//! ```text
//! username = lowercase(email) + "__letpot_v3"
//! password = sha256_hex(user_id + "|" + md5_hex(username))
//! ```
//!
//! MD5 and SHA-256 are fixed by the broker; they must be reproduced exactly.

use md5::Md5;
use sha2::{Digest, Sha256};

/// Suffix appended to the lowercased email.
const USERNAME_SUFFIX: &str = "__letpot_v3";

/// Username/password pair for the broker.
#[derive(Clone, PartialEq, Eq)]
pub struct BrokerCredentials {
    /// Broker username.
    pub username: String,
    /// Broker password (lowercase hex SHA-256).
    pub password: String,
}

impl std::fmt::Debug for BrokerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Derive broker credentials for `email` and `user_id`.
pub fn derive_credentials(email: &str, user_id: &str) -> BrokerCredentials {
    let username = format!("{}{USERNAME_SUFFIX}", email.to_lowercase());
    let username_md5 = hex::encode(Md5::digest(username.as_bytes()));
    let password = hex::encode(Sha256::digest(format!("{user_id}|{username_md5}").as_bytes()));
    BrokerCredentials { username, password }
}
