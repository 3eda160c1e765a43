//! Stream adapter from a broker subscription to SSE frames.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::response::sse;
use futures::Stream;
use guesswho_core::ids::ConsumerId;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::debug;

use super::frame::frame;
use crate::broker::{Broker, Subscription};

/// Lifecycle of one streaming connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    /// Request accepted, not yet registered.
    Connecting,
    /// Registered with the broker, nothing sent yet.
    Registered,
    /// At least one event has been sent.
    Streaming,
    /// Server shutdown or client disconnect.
    Cancelled,
    /// The broker closed the conduit.
    ConnectionClosed,
    /// Registration released. Terminal.
    Unregistered,
}

/// Body stream for one `/events` connection.
///
/// Created in [`StreamState::Connecting`] before any broker registration;
/// [`register`](Self::register) attaches the subscription. The stream owns
/// it from then on, so the registration is released on every exit path:
/// normal end, shutdown, or the response body being dropped when the client
/// goes away.
pub struct ConsumerStream {
    subscription: Option<Subscription>,
    shutdown: Pin<Box<WaitForCancellationFutureOwned>>,
    state: StreamState,
}

impl ConsumerStream {
    /// A stream not yet registered with the broker. Ends early when
    /// `shutdown` fires.
    pub fn connecting(shutdown: CancellationToken) -> Self {
        Self {
            subscription: None,
            shutdown: Box::pin(shutdown.cancelled_owned()),
            state: StreamState::Connecting,
        }
    }

    /// Register with `broker`. Only the first call registers.
    pub fn register(&mut self, broker: &Broker) -> &ConsumerId {
        let subscription = self.subscription.get_or_insert_with(|| broker.register());
        if self.state == StreamState::Connecting {
            self.state = StreamState::Registered;
            debug!(consumer_id = %subscription.id(), "stream registered");
        }
        subscription.id()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    fn finish(&mut self, reason: StreamState) {
        if self.state == StreamState::Unregistered {
            return;
        }
        self.state = reason;
        if let Some(subscription) = self.subscription.as_mut() {
            subscription.unregister();
            debug!(consumer_id = %subscription.id(), reason = ?reason, "stream ended");
        }
        self.state = StreamState::Unregistered;
    }
}

impl Stream for ConsumerStream {
    type Item = Result<sse::Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.state == StreamState::Unregistered {
            return Poll::Ready(None);
        }
        if this.shutdown.as_mut().poll(cx).is_ready() {
            this.finish(StreamState::Cancelled);
            return Poll::Ready(None);
        }
        // Not registered yet: only shutdown can wake this stream.
        let Some(subscription) = this.subscription.as_mut() else {
            return Poll::Pending;
        };
        match subscription.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                this.state = StreamState::Streaming;
                Poll::Ready(Some(Ok(frame(&event))))
            }
            Poll::Ready(None) => {
                this.finish(StreamState::ConnectionClosed);
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for ConsumerStream {
    fn drop(&mut self) {
        // Dropped before reaching a terminal state: the client disconnected.
        self.finish(StreamState::Cancelled);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;
    use guesswho_core::events::Event;
    use tokio::time::timeout;

    use super::*;
    use crate::config::BrokerConfig;

    const TIMEOUT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn yields_frames_then_ends_on_shutdown() {
        let (broker, _h) = Broker::spawn(BrokerConfig::default());
        let token = CancellationToken::new();
        let mut stream = ConsumerStream::connecting(token.clone());
        assert_eq!(stream.state(), StreamState::Connecting);
        let _ = stream.register(&broker);
        assert_eq!(stream.state(), StreamState::Registered);

        broker.publish(Event::update());
        let first = timeout(TIMEOUT, stream.next()).await.unwrap();
        assert!(matches!(first, Some(Ok(_))));
        assert_eq!(stream.state(), StreamState::Streaming);

        token.cancel();
        assert!(timeout(TIMEOUT, stream.next()).await.unwrap().is_none());
        assert_eq!(stream.state(), StreamState::Unregistered);
        assert_eq!(broker.consumer_count().await, 0);

        // nothing is delivered once unregistered
        broker.publish(Event::update());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn broker_shutdown_closes_stream() {
        let (broker, _h) = Broker::spawn(BrokerConfig::default());
        let mut stream = ConsumerStream::connecting(CancellationToken::new());
        let _ = stream.register(&broker);
        broker.shutdown();
        assert!(timeout(TIMEOUT, stream.next()).await.unwrap().is_none());
        assert_eq!(stream.state(), StreamState::Unregistered);
    }

    #[tokio::test]
    async fn drop_releases_registration() {
        let (broker, _h) = Broker::spawn(BrokerConfig::default());
        let mut stream = ConsumerStream::connecting(CancellationToken::new());
        let _ = stream.register(&broker);
        let _other = broker.register();
        assert_eq!(broker.consumer_count().await, 2);
        drop(stream);
        assert_eq!(broker.consumer_count().await, 1);
    }

    #[tokio::test]
    async fn connecting_stream_holds_no_registration() {
        let (broker, _h) = Broker::spawn(BrokerConfig::default());
        let token = CancellationToken::new();
        let mut stream = ConsumerStream::connecting(token.clone());
        assert_eq!(broker.consumer_count().await, 0);

        broker.publish(Event::update());
        let idle = timeout(Duration::from_millis(50), stream.next()).await;
        assert!(idle.is_err(), "unregistered stream yielded a frame");

        token.cancel();
        assert!(timeout(TIMEOUT, stream.next()).await.unwrap().is_none());
        assert_eq!(stream.state(), StreamState::Unregistered);
        drop(stream);
        assert_eq!(broker.consumer_count().await, 0);
    }

    #[tokio::test]
    async fn register_is_idempotent() {
        let (broker, _h) = Broker::spawn(BrokerConfig::default());
        let mut stream = ConsumerStream::connecting(CancellationToken::new());
        let first = stream.register(&broker).clone();
        let second = stream.register(&broker).clone();
        assert_eq!(first, second);
        assert_eq!(broker.consumer_count().await, 1);
    }
}
