//! Settings types.

use guesswho_core::logging::LogFormat;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GuesswhoSettings {
    /// HTTP server settings.
    pub server: ServerSettings,
    /// Broadcast broker settings.
    pub broker: BrokerSettings,
    /// Cross-process relay settings.
    pub relay: RelaySettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

impl GuesswhoSettings {
    /// Check values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if self.broker.conduit_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "broker.conduitCapacity must be at least 1".into(),
            ));
        }
        if self.relay.channel.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "relay.channel must not be empty".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.relay.jitter_factor) {
            return Err(SettingsError::InvalidValue(format!(
                "relay.jitterFactor must be within 0.0..=1.0, got {}",
                self.relay.jitter_factor
            )));
        }
        if self.relay.base_delay_ms > self.relay.max_delay_ms {
            return Err(SettingsError::InvalidValue(format!(
                "relay.baseDelayMs ({}) exceeds relay.maxDelayMs ({})",
                self.relay.base_delay_ms, self.relay.max_delay_ms
            )));
        }
        Ok(())
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (`0` for auto-assign).
    pub port: u16,
    /// Interval between keep-alive comments on idle event streams, in
    /// seconds. `0` disables them.
    pub keep_alive_secs: u64,
    /// How long shutdown waits for tasks before giving up, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            keep_alive_secs: 15,
            shutdown_timeout_secs: 10,
        }
    }
}

/// What the broker does when a consumer's conduit is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Drop the new event for that consumer only. Consumers that keep
    /// overflowing are evicted once they reach the stall limit.
    #[default]
    DropNewest,
    /// Evict the consumer on its first overflow.
    Disconnect,
}

/// Broadcast broker settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrokerSettings {
    /// Events buffered per consumer before the overflow policy applies.
    pub conduit_capacity: usize,
    /// Overflow policy.
    pub overflow: OverflowPolicy,
    /// Consecutive dropped events after which a consumer is evicted under
    /// [`OverflowPolicy::DropNewest`]. `0` never evicts.
    pub stall_limit: u32,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            conduit_capacity: 16,
            overflow: OverflowPolicy::DropNewest,
            stall_limit: 32,
        }
    }
}

/// Cross-process relay settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    /// Redis address (`host:port` or a `redis://` URL). `None` disables the
    /// relay.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Channel to subscribe to.
    pub channel: String,
    /// Reconnect attempts after an established subscription drops. `0`
    /// never reconnects.
    pub max_reconnect_attempts: u32,
    /// Base reconnect delay in milliseconds.
    pub base_delay_ms: u64,
    /// Maximum reconnect delay in milliseconds.
    pub max_delay_ms: u64,
    /// Reconnect jitter factor (`0.0..=1.0`).
    pub jitter_factor: f64,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            address: None,
            channel: "game_updates".to_string(),
            max_reconnect_attempts: 10,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            jitter_factor: 0.2,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = GuesswhoSettings::default();
        assert_eq!(s.server.host, "0.0.0.0");
        assert_eq!(s.server.keep_alive_secs, 15);
        assert_eq!(s.broker.conduit_capacity, 16);
        assert_eq!(s.broker.stall_limit, 32);
        assert_eq!(s.relay.max_reconnect_attempts, 10);
        assert_eq!(s.logging.level, "info");
        assert_eq!(s.logging.format, LogFormat::Compact);
    }

    #[test]
    fn camel_case_keys() {
        let json = serde_json::to_value(GuesswhoSettings::default()).unwrap();
        assert!(json["broker"]["conduitCapacity"].is_number());
        assert!(json["relay"]["maxReconnectAttempts"].is_number());
        assert!(json["server"]["keepAliveSecs"].is_number());
        assert!(json["relay"].get("address").is_none());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: GuesswhoSettings =
            serde_json::from_str(r#"{"broker":{"overflow":"disconnect"}}"#).unwrap();
        assert_eq!(s.broker.overflow, OverflowPolicy::Disconnect);
        assert_eq!(s.broker.conduit_capacity, 16);
        assert_eq!(s.server.port, 8080);
    }

    #[test]
    fn zero_capacity_rejected() {
        let mut s = GuesswhoSettings::default();
        s.broker.conduit_capacity = 0;
        assert!(matches!(s.validate(), Err(SettingsError::InvalidValue(_))));
    }

    #[test]
    fn empty_channel_rejected() {
        let mut s = GuesswhoSettings::default();
        s.relay.channel = "  ".into();
        assert!(s.validate().is_err());
    }

    #[test]
    fn jitter_out_of_range_rejected() {
        let mut s = GuesswhoSettings::default();
        s.relay.jitter_factor = 1.5;
        assert!(s.validate().is_err());
    }

    #[test]
    fn base_delay_above_max_rejected() {
        let mut s = GuesswhoSettings::default();
        s.relay.base_delay_ms = 60_000;
        s.relay.max_delay_ms = 1_000;
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("baseDelayMs"));
    }
}
