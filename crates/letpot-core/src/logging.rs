//! Logging initialisation for the `letpot` binary.
//!
//! Library crates only emit `tracing` events. The configured level applies to
//! the LetPot crates; HTTP, TLS and MQTT dependencies stay at `warn` unless
//! `RUST_LOG` says otherwise.

use tracing_subscriber::EnvFilter;

/// Targets that follow the configured level.
const LETPOT_TARGETS: [&str; 6] = [
    "letpot",
    "letpot_auth",
    "letpot_client",
    "letpot_core",
    "letpot_mqtt",
    "letpot_settings",
];

/// Level used when the configured one does not parse.
const FALLBACK_LEVEL: &str = "info";

/// Filter directives for `level`: dependencies at `warn`, LetPot crates at
/// `level`.
pub fn directives(level: &str) -> String {
    let level = level.trim().to_ascii_lowercase();
    let mut out = String::from("warn");
    for target in LETPOT_TARGETS {
        out.push(',');
        out.push_str(target);
        out.push('=');
        out.push_str(&level);
    }
    out
}

fn filter_for(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::try_new(directives(level)).unwrap_or_else(|_| EnvFilter::new(directives(FALLBACK_LEVEL)))
}

/// Install the global subscriber writing compact lines to stderr.
///
/// `RUST_LOG` replaces the computed directives when set. Returns `false` if
/// a subscriber was already installed.
pub fn init_subscriber(level: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(level))
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .is_ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
