//! `GET /events` handler.

use axum::extract::State;
use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONNECTION};
use axum::http::{HeaderValue, StatusCode, Version};
use axum::response::sse::{KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use tracing::{info, warn};

use super::stream::ConsumerStream;
use crate::metrics::{SSE_CONNECTIONS_TOTAL, SSE_REJECTIONS_TOTAL};
use crate::server::AppState;

/// Body sent when the connection cannot carry an open-ended stream.
pub const STREAMING_UNSUPPORTED: &str = "Streaming unsupported!";

/// Open an event stream bound to one broker registration.
///
/// Rejections happen before registration, so a refused client never
/// occupies a registry slot.
#[tracing::instrument(skip_all, name = "sse", fields(version = ?version))]
pub async fn events_handler(State(state): State<AppState>, version: Version) -> Response {
    let mut stream = ConsumerStream::connecting(state.shutdown.token());

    if version == Version::HTTP_09 || version == Version::HTTP_10 {
        metrics::counter!(SSE_REJECTIONS_TOTAL, "reason" => "unsupported").increment(1);
        warn!("rejecting event stream: transport cannot stream");
        return (StatusCode::INTERNAL_SERVER_ERROR, STREAMING_UNSUPPORTED).into_response();
    }
    if state.shutdown.is_shutting_down() || state.broker.is_closed() {
        metrics::counter!(SSE_REJECTIONS_TOTAL, "reason" => "shutdown").increment(1);
        return (StatusCode::SERVICE_UNAVAILABLE, "Server shutting down").into_response();
    }

    let consumer_id = stream.register(&state.broker);
    info!(%consumer_id, "event stream opened");
    metrics::counter!(SSE_CONNECTIONS_TOTAL).increment(1);

    let sse = Sse::new(stream);
    let mut response = match state.keep_alive {
        Some(interval) => {
            let keep_alive = KeepAlive::new().interval(interval);
            sse.keep_alive(keep_alive).into_response()
        }
        None => sse.into_response(),
    };

    let headers = response.headers_mut();
    let _ = headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    if version == Version::HTTP_11 {
        let _ = headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    }
    let _ = headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}
