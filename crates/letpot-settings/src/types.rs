//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a partial
//! JSON file only needs the keys it overrides.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root settings type.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LetPotSettings {
    /// HTTP API settings.
    pub api: ApiSettings,
    /// Telemetry broker settings.
    pub broker: BrokerSettings,
    /// Device command defaults.
    pub device: DeviceSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

/// HTTP API endpoint settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiSettings {
    /// Base URL of the device-management API, without trailing slash.
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.letpot.net".to_string(),
            request_timeout_ms: 30_000,
        }
    }
}

impl ApiSettings {
    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Telemetry broker endpoint settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrokerSettings {
    /// Broker host name.
    pub host: String,
    /// Broker TLS port.
    pub port: u16,
    /// WebSocket path on the broker host.
    pub path: String,
    /// MQTT keep-alive interval in seconds.
    pub keep_alive_secs: u64,
    /// How long to wait for the broker's CONNACK, in milliseconds.
    pub connect_timeout_ms: u64,
    /// Prefix for generated client identifiers.
    pub client_id_prefix: String,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            host: "broker.letpot.net".to_string(),
            port: 443,
            path: "/mqttwss".to_string(),
            keep_alive_secs: 30,
            connect_timeout_ms: 10_000,
            client_id_prefix: "LetPot_Rust_".to_string(),
        }
    }
}

impl BrokerSettings {
    /// Full secure WebSocket URL of the broker.
    pub fn url(&self) -> String {
        format!("wss://{}:{}{}", self.host, self.port, self.path)
    }

    /// Keep-alive as a [`Duration`].
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    /// Connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Defaults for pump commands issued from the CLI.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceSettings {
    /// Pump-on duration when none is given.
    pub default_on_seconds: u16,
    /// On-duration (and wait) of the test cycle.
    pub test_cycle_seconds: u16,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            default_on_seconds: 5,
            test_cycle_seconds: 5,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_url_composition() {
        let broker = BrokerSettings::default();
        assert_eq!(broker.url(), "wss://broker.letpot.net:443/mqttwss");
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(LetPotSettings::default()).unwrap();
        assert_eq!(json["api"]["baseUrl"], "https://api.letpot.net");
        assert_eq!(json["broker"]["keepAliveSecs"], 30);
        assert_eq!(json["device"]["testCycleSeconds"], 5);
    }

    #[test]
    fn partial_section_fills_defaults() {
        let broker: BrokerSettings = serde_json::from_str(r#"{"port": 8884}"#).unwrap();
        assert_eq!(broker.port, 8884);
        assert_eq!(broker.host, "broker.letpot.net");
    }

    #[test]
    fn durations() {
        let api = ApiSettings::default();
        assert_eq!(api.request_timeout(), Duration::from_secs(30));
        let broker = BrokerSettings::default();
        assert_eq!(broker.connect_timeout(), Duration::from_secs(10));
    }
}
