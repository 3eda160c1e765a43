//! Runtime configuration for the server components.
//!
//! Built from [`guesswho_settings`] types at startup; tests construct these
//! directly.

use std::time::Duration;

use guesswho_settings::{BrokerSettings, OverflowPolicy, RelaySettings, ServerSettings};

/// HTTP server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Keep-alive comment interval for idle event streams.
    pub keep_alive: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            keep_alive: Some(Duration::from_secs(15)),
        }
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(s: &ServerSettings) -> Self {
        Self {
            host: s.host.clone(),
            port: s.port,
            keep_alive: (s.keep_alive_secs > 0).then(|| Duration::from_secs(s.keep_alive_secs)),
        }
    }
}

/// Broker configuration.
#[derive(Clone, Copy, Debug)]
pub struct BrokerConfig {
    /// Events buffered per consumer.
    pub conduit_capacity: usize,
    /// What happens when a conduit is full.
    pub overflow: OverflowPolicy,
    /// Consecutive drops before eviction (`0` = never) for
    /// [`OverflowPolicy::DropNewest`].
    pub stall_limit: u32,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self::from(&BrokerSettings::default())
    }
}

impl From<&BrokerSettings> for BrokerConfig {
    fn from(s: &BrokerSettings) -> Self {
        Self {
            conduit_capacity: s.conduit_capacity.max(1),
            overflow: s.overflow,
            stall_limit: s.stall_limit,
        }
    }
}

/// Relay bridge configuration.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Channel to subscribe to.
    pub channel: String,
    /// Reconnect attempts after an established subscription drops.
    pub max_reconnect_attempts: u32,
    /// Base reconnect delay.
    pub base_delay: Duration,
    /// Maximum reconnect delay.
    pub max_delay: Duration,
    /// Jitter factor (`0.0..=1.0`).
    pub jitter_factor: f64,
    /// Upper bound on a single connect + liveness check.
    pub connect_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::from(&RelaySettings::default())
    }
}

impl From<&RelaySettings> for RelayConfig {
    fn from(s: &RelaySettings) -> Self {
        Self {
            channel: s.channel.clone(),
            max_reconnect_attempts: s.max_reconnect_attempts,
            base_delay: Duration::from_millis(s.base_delay_ms),
            max_delay: Duration::from_millis(s.max_delay_ms),
            jitter_factor: s.jitter_factor,
            connect_timeout: Duration::from_secs(5),
        }
    }
}
