//! `GuesswhoServer`: Axum HTTP server for the event stream and game API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::broker::Broker;
use crate::config::ServerConfig;
use crate::game::{self, GameStore};
use crate::health::{self, HealthResponse};
use crate::relay::RelayStatus;
use crate::shutdown::ShutdownCoordinator;
use crate::sse::events_handler;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Event broker.
    pub broker: Broker,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Game state.
    pub games: Arc<GameStore>,
    /// Relay bridge state.
    pub relay_status: RelayStatus,
    /// Keep-alive interval for event streams.
    pub keep_alive: Option<Duration>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The main server.
pub struct GuesswhoServer {
    config: ServerConfig,
    broker: Broker,
    games: Arc<GameStore>,
    relay_status: RelayStatus,
    shutdown: Arc<ShutdownCoordinator>,
    metrics: Option<PrometheusHandle>,
    start_time: Instant,
}

impl GuesswhoServer {
    /// Create a new server around an already running broker.
    pub fn new(config: ServerConfig, broker: Broker, games: Arc<GameStore>) -> Self {
        Self {
            config,
            broker,
            games,
            relay_status: RelayStatus::default(),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            metrics: None,
            start_time: Instant::now(),
        }
    }

    /// Report this relay state on `/health`.
    #[must_use]
    pub fn with_relay_status(mut self, status: RelayStatus) -> Self {
        self.relay_status = status;
        self
    }

    /// Serve `/metrics` from this handle.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            broker: self.broker.clone(),
            shutdown: self.shutdown.clone(),
            games: self.games.clone(),
            relay_status: self.relay_status.clone(),
            keep_alive: self.config.keep_alive,
            start_time: self.start_time,
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route("/events", get(events_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .merge(game::routes())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind and serve in a background task.
    ///
    /// Returns the bound address and the serve task. Cancelling the shutdown
    /// token ends open streams, stops accepting connections, and then shuts
    /// the broker down.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let bind_addr = (self.config.host.as_str(), self.config.port);
        let listener = TcpListener::bind(bind_addr).await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let token = self.shutdown.token();
        let broker = self.broker.clone();

        info!(%addr, "server listening");
        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    token.cancelled().await;
                    info!("server draining connections");
                })
                .await;
            broker.shutdown();
            if let Err(e) = result {
                error!(error = %e, "server error");
            }
            info!("server stopped");
        });
        Ok((addr, handle))
    }

    /// Get the broker.
    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let consumers = state.broker.consumer_count().await;
    Json(health::health_check(
        state.start_time,
        consumers,
        state.relay_status.get(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;

    use super::*;
    use crate::config::BrokerConfig;
    use crate::relay::RelayState;

    fn make_server() -> GuesswhoServer {
        let (broker, _h) = Broker::spawn(BrokerConfig::default());
        GuesswhoServer::new(ServerConfig::default(), broker, Arc::new(GameStore::seeded()))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn server_with_default_config() {
        let server = make_server();
        assert_eq!(server.config().host, "127.0.0.1");
        assert_eq!(server.config().port, 0);
        assert!(!server.shutdown().is_shutting_down());
    }

    #[tokio::test]
    async fn health_reports_consumers_and_relay() {
        let status = RelayStatus::new(RelayState::Connected);
        let server = make_server().with_relay_status(status);
        let _sub = server.broker().register();

        let resp = server.router().oneshot(get("/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), 10_000)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["consumers"], 1);
        assert_eq!(parsed["relay"], "connected");
        assert!(parsed["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn metrics_absent_without_recorder() {
        let app = make_server().router();
        let resp = app.oneshot(get("/metrics")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_rendered_with_handle() {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let server = make_server().with_metrics(handle);
        let resp = server.router().oneshot(get("/metrics")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(
            resp.headers()[CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/plain")
        );
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = make_server().router();
        let resp = app.oneshot(get("/nonexistent")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listen_binds_and_stops_on_shutdown() {
        let server = make_server();
        let (addr, handle) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);

        server.shutdown().shutdown();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        // the broker loop stops once it processes the shutdown command
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(server.broker().is_closed());
    }
}
