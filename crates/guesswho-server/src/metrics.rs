//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the global Prometheus recorder.
///
/// Returns the handle used to render `/metrics`. Fails if a recorder is
/// already installed.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Registered stream consumers (gauge).
pub const CONSUMERS_ACTIVE: &str = "broker_consumers_active";
/// Events accepted by the broker (counter).
pub const EVENTS_PUBLISHED_TOTAL: &str = "broker_events_published_total";
/// Deliveries dropped on a full conduit (counter).
pub const DELIVERIES_DROPPED_TOTAL: &str = "broker_deliveries_dropped_total";
/// Consumers evicted by the overflow policy (counter).
pub const CONSUMERS_EVICTED_TOTAL: &str = "broker_consumers_evicted_total";
/// Event stream connections accepted (counter).
pub const SSE_CONNECTIONS_TOTAL: &str = "sse_connections_total";
/// Event stream connections rejected (counter, labels: reason).
pub const SSE_REJECTIONS_TOTAL: &str = "sse_rejections_total";
/// Messages received from the relay channel (counter).
pub const RELAY_MESSAGES_TOTAL: &str = "relay_messages_total";
/// Relay reconnect attempts (counter).
pub const RELAY_RECONNECTS_TOTAL: &str = "relay_reconnects_total";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_are_prometheus_safe() {
        for name in [
            CONSUMERS_ACTIVE,
            EVENTS_PUBLISHED_TOTAL,
            DELIVERIES_DROPPED_TOTAL,
            CONSUMERS_EVICTED_TOTAL,
            SSE_CONNECTIONS_TOTAL,
            SSE_REJECTIONS_TOTAL,
            RELAY_MESSAGES_TOTAL,
            RELAY_RECONNECTS_TOTAL,
        ] {
            let snake = name.chars().all(|c| c.is_ascii_lowercase() || c == '_');
            assert!(snake, "{name}");
        }
    }

    #[test]
    fn local_recorder_renders() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            metrics::counter!(EVENTS_PUBLISHED_TOTAL).increment(2);
        });
        assert!(handle.render().contains(EVENTS_PUBLISHED_TOTAL));
    }
}
