//! Relay errors.

use std::time::Duration;

/// Errors from connecting to or subscribing on the relay channel.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Redis client or protocol error.
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    /// Address could not be parsed.
    #[error("invalid relay address {address}: {reason}")]
    InvalidAddress {
        /// Address as configured.
        address: String,
        /// Parser message.
        reason: String,
    },

    /// Connect and liveness check did not finish in time.
    #[error("relay did not respond within {0:?}")]
    Timeout(Duration),
}
