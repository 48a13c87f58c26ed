//! # letpot-settings
//!
//! Configuration for the LetPot client, loaded from three layers (in
//! priority order):
//! 1. **Compiled defaults**: [`LetPotSettings::default()`]
//! 2. **User file**: `~/.letpot/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `LETPOT_*` overrides (highest priority)
//!
//! Settings are loaded explicitly by the binary and handed to the crates
//! that need them; there is no global instance.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings, load_settings_from_path, merge_into, settings_path};
pub use types::*;
