//! Settings loading.
//!
//! Layers, lowest priority first:
//! 1. [`LetPotSettings::default()`]
//! 2. the user's settings file, merged key by key over the defaults
//! 3. `LETPOT_*` environment variables
//!
//! The result is validated before it is returned.

use std::fmt::Display;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::LetPotSettings;

/// Directory under `$HOME` holding LetPot client files.
const SETTINGS_DIR: &str = ".letpot";
/// Settings file name inside [`SETTINGS_DIR`].
const SETTINGS_FILE: &str = "settings.json";

/// Accepted range for `LETPOT_REQUEST_TIMEOUT_MS`.
const REQUEST_TIMEOUT_MS: RangeInclusive<u64> = 100..=600_000;
/// Accepted range for `LETPOT_BROKER_PORT`.
const BROKER_PORT: RangeInclusive<u16> = 1..=u16::MAX;

/// `~/.letpot/settings.json`.
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(SETTINGS_DIR).join(SETTINGS_FILE)
}

/// Load settings from [`settings_path`].
pub fn load_settings() -> Result<LetPotSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings with `path` as the file layer.
///
/// A missing file means "defaults only". An unreadable or malformed file is
/// an error naming `path`.
pub fn load_settings_from_path(path: &Path) -> Result<LetPotSettings> {
    let json_err = |source| SettingsError::Json {
        path: path.to_path_buf(),
        source,
    };

    let mut doc = serde_json::to_value(LetPotSettings::default()).map_err(json_err)?;
    match std::fs::read_to_string(path) {
        Ok(content) => {
            debug!(path = %path.display(), "merging settings file");
            let user: Value = serde_json::from_str(&content).map_err(json_err)?;
            merge_into(&mut doc, user);
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no settings file, using defaults");
        }
        Err(source) => {
            return Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    }

    let mut settings: LetPotSettings = serde_json::from_value(doc).map_err(json_err)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

/// Merge `overlay` into `base` in place.
///
/// Objects merge per key; any other overlay value replaces the base value.
/// `null` in the overlay leaves the base untouched, so `"port": null` means
/// "keep the default".
pub fn merge_into(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_into(slot, value),
                    None if value.is_null() => {}
                    None => {
                        let _ = base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Apply `LETPOT_*` environment overrides.
///
/// Unset or empty variables are skipped; out-of-range numbers are skipped
/// with a warning.
pub fn apply_env_overrides(settings: &mut LetPotSettings) {
    if let Some(url) = env_text("LETPOT_API_URL") {
        settings.api.base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(ms) = env_number("LETPOT_REQUEST_TIMEOUT_MS", &REQUEST_TIMEOUT_MS) {
        settings.api.request_timeout_ms = ms;
    }
    if let Some(host) = env_text("LETPOT_BROKER_HOST") {
        settings.broker.host = host;
    }
    if let Some(port) = env_number("LETPOT_BROKER_PORT", &BROKER_PORT) {
        settings.broker.port = port;
    }
    if let Some(path) = env_text("LETPOT_BROKER_PATH") {
        settings.broker.path = path;
    }
    if let Some(level) = env_text("LETPOT_LOG_LEVEL") {
        settings.logging.level = level;
    }
}

/// Reject settings that cannot reach the API or the broker.
pub fn validate(settings: &LetPotSettings) -> Result<()> {
    let api = &settings.api;
    let broker = &settings.broker;

    if !(api.base_url.starts_with("https://") || api.base_url.starts_with("http://")) {
        return Err(SettingsError::invalid(
            "api.baseUrl",
            format!("expected an http(s) URL, got {:?}", api.base_url),
        ));
    }
    if broker.host.is_empty() {
        return Err(SettingsError::invalid("broker.host", "must not be empty"));
    }
    if broker.port == 0 {
        return Err(SettingsError::invalid("broker.port", "must not be 0"));
    }
    if !broker.path.starts_with('/') {
        return Err(SettingsError::invalid(
            "broker.path",
            format!("must start with '/', got {:?}", broker.path),
        ));
    }
    Ok(())
}

/// Parse `raw` and keep it only if it lies in `range`.
pub fn parse_in_range<T>(raw: &str, range: &RangeInclusive<T>) -> Option<T>
where
    T: FromStr + PartialOrd,
{
    raw.trim().parse().ok().filter(|n| range.contains(n))
}

fn env_text(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_number<T>(name: &str, range: &RangeInclusive<T>) -> Option<T>
where
    T: FromStr + PartialOrd + Display,
{
    let raw = env_text(name)?;
    let parsed = parse_in_range(&raw, range);
    if parsed.is_none() {
        warn!(
            var = name,
            value = %raw,
            min = %range.start(),
            max = %range.end(),
            "ignoring out-of-range environment override"
        );
    }
    parsed
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
