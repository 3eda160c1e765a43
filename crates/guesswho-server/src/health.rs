//! `/health` endpoint.

use std::time::Instant;

use serde::Serialize;

use crate::relay::RelayState;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Registered stream consumers.
    pub consumers: usize,
    /// Cross-process relay state.
    pub relay: RelayState,
}

/// Build a health response from live counters.
pub fn health_check(start_time: Instant, consumers: usize, relay: RelayState) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        consumers,
        relay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_ok() {
        let resp = health_check(Instant::now(), 0, RelayState::Disabled);
        assert_eq!(resp.status, "ok");
        assert!(resp.uptime_secs < 2);
    }

    #[test]
    fn uptime_increases() {
        let start = Instant::now()
            .checked_sub(std::time::Duration::from_secs(60))
            .unwrap();
        let resp = health_check(start, 0, RelayState::Disabled);
        assert!(resp.uptime_secs >= 59);
    }

    #[test]
    fn serialization() {
        let resp = health_check(Instant::now(), 2, RelayState::Connected);
        let parsed = serde_json::to_value(&resp).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["consumers"], 2);
        assert_eq!(parsed["relay"], "connected");
        assert!(parsed["uptime_secs"].is_number());
    }
}
