use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::error::RealtimeError;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub realtime: ConnectionConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub log: LogConfig,
    /// Topics to subscribe on startup (e.g. `case:42`)
    #[serde(default)]
    pub subscriptions: Vec<String>,
}

/// Connection parameters for the realtime client.
///
/// Immutable once handed to a client.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ConnectionConfig {
    /// Endpoint address, e.g. `wss://api.example.com/realtime`
    pub endpoint: String,
    /// Platform identifier sent during the handshake
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Reconnect attempts after an unplanned drop before giving up
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// Delay before the first reconnect attempt, doubled for each later one
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    /// Upper bound for any single reconnect delay
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    /// Random spread applied to each reconnect delay, as a fraction of it
    #[serde(default)]
    pub reconnect_jitter_factor: f64,
    /// Latency ping interval in seconds
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
    /// Time allowed for the transport to open and acknowledge
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
}

fn default_platform() -> String {
    "web".to_string()
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_base_delay_ms() -> u64 {
    3000
}

fn default_reconnect_max_delay_ms() -> u64 {
    60_000 // 1 minute
}

fn default_ping_interval_secs() -> u64 {
    30
}

fn default_handshake_timeout_ms() -> u64 {
    10_000
}

impl ConnectionConfig {
    /// Config for `endpoint` with every other field at its default.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            platform: default_platform(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            reconnect_jitter_factor: 0.0,
            ping_interval_secs: default_ping_interval_secs(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
        }
    }

    pub fn validate(&self) -> Result<(), RealtimeError> {
        if self.endpoint.trim().is_empty() {
            return Err(RealtimeError::InvalidConfig(
                "endpoint must not be empty".to_string(),
            ));
        }
        if self.reconnect_base_delay_ms == 0 {
            return Err(RealtimeError::InvalidConfig(
                "reconnect_base_delay_ms must be greater than zero".to_string(),
            ));
        }
        if self.reconnect_max_delay_ms < self.reconnect_base_delay_ms {
            return Err(RealtimeError::InvalidConfig(format!(
                "reconnect_max_delay_ms ({}) is below reconnect_base_delay_ms ({})",
                self.reconnect_max_delay_ms, self.reconnect_base_delay_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.reconnect_jitter_factor) {
            return Err(RealtimeError::InvalidConfig(format!(
                "reconnect_jitter_factor ({}) must be between 0.0 and 1.0",
                self.reconnect_jitter_factor
            )));
        }
        if self.handshake_timeout_ms == 0 {
            return Err(RealtimeError::InvalidConfig(
                "handshake_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.ping_interval_secs == 0 {
            return Err(RealtimeError::InvalidConfig(
                "ping_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Bearer token used by the binary; library callers supply their own
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Fallback filter when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("realtime.platform", default_platform())?
            .set_default("realtime.max_reconnect_attempts", default_max_reconnect_attempts())?
            .set_default("realtime.reconnect_base_delay_ms", default_reconnect_base_delay_ms())?
            .set_default("realtime.reconnect_max_delay_ms", default_reconnect_max_delay_ms())?
            .set_default("realtime.reconnect_jitter_factor", 0.0)?
            .set_default("realtime.ping_interval_secs", default_ping_interval_secs())?
            .set_default("realtime.handshake_timeout_ms", default_handshake_timeout_ms())?
            .set_default("log.level", default_log_level())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // FIELDOPS__REALTIME__ENDPOINT, FIELDOPS__AUTH__TOKEN, FIELDOPS__SUBSCRIPTIONS=case:1,case:2
            .add_source(
                Environment::with_prefix("FIELDOPS")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("subscriptions"),
            );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = ConnectionConfig::new("ws://localhost:3001/realtime");
        assert_eq!(config.platform, "web");
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.reconnect_base_delay_ms, 3000);
        assert_eq!(config.reconnect_max_delay_ms, 60_000);
        assert_eq!(config.ping_interval(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_endpoint() {
        let config = ConnectionConfig::new("  ");
        assert!(matches!(config.validate(), Err(RealtimeError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_cap_below_base() {
        let config = ConnectionConfig {
            reconnect_base_delay_ms: 5000,
            reconnect_max_delay_ms: 1000,
            ..ConnectionConfig::new("ws://localhost")
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: ConnectionConfig =
            serde_json::from_str(r#"{"endpoint": "wss://example.test/rt", "max_reconnect_attempts": 2}"#)
                .unwrap();
        assert_eq!(config.max_reconnect_attempts, 2);
        assert_eq!(config.reconnect_base_delay_ms, 3000);
        assert_eq!(config.handshake_timeout_ms, 10_000);
        assert_eq!(config.reconnect_jitter_factor, 0.0);
    }

    #[test]
    fn test_validate_rejects_zero_handshake_timeout() {
        let config = ConnectionConfig {
            handshake_timeout_ms: 0,
            ..ConnectionConfig::new("ws://localhost")
        };
        assert!(matches!(
            config.validate(),
            Err(RealtimeError::InvalidConfig(ref m)) if m.contains("handshake_timeout_ms")
        ));
    }

    #[test]
    fn test_validate_jitter_range() {
        for jitter in [0.0, 0.25, 1.0] {
            let config = ConnectionConfig {
                reconnect_jitter_factor: jitter,
                ..ConnectionConfig::new("ws://localhost")
            };
            assert!(config.validate().is_ok(), "jitter {} should be accepted", jitter);
        }
        for jitter in [-0.1, 1.5, f64::NAN] {
            let config = ConnectionConfig {
                reconnect_jitter_factor: jitter,
                ..ConnectionConfig::new("ws://localhost")
            };
            assert!(config.validate().is_err(), "jitter {} should be rejected", jitter);
        }
    }
}
