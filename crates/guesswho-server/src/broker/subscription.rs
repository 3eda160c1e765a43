//! Consumer side of a broker registration.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use guesswho_core::events::Event;
use guesswho_core::ids::ConsumerId;
use tokio::sync::mpsc::{self, error::TryRecvError};

use super::Broker;

/// A registered consumer's conduit.
///
/// Yields events in publish order and ends when the broker closes the
/// conduit (unregistration, eviction, or shutdown). Dropping the value
/// unregisters it.
pub struct Subscription {
    id: ConsumerId,
    conduit: mpsc::Receiver<Event>,
    broker: Broker,
    released: bool,
}

impl Subscription {
    pub(super) fn new(id: ConsumerId, conduit: mpsc::Receiver<Event>, broker: Broker) -> Self {
        Self {
            id,
            conduit,
            broker,
            released: false,
        }
    }

    /// Consumer ID.
    pub fn id(&self) -> &ConsumerId {
        &self.id
    }

    /// Wait for the next event. `None` once the conduit is closed and
    /// drained.
    pub async fn recv(&mut self) -> Option<Event> {
        self.conduit.recv().await
    }

    /// Take a buffered event without waiting.
    pub fn try_recv(&mut self) -> Result<Event, TryRecvError> {
        self.conduit.try_recv()
    }

    /// Poll for the next event.
    pub fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<Event>> {
        self.conduit.poll_recv(cx)
    }

    /// Ask the broker to remove this consumer. Repeated calls are no-ops.
    ///
    /// Events enqueued before the removal is processed are still readable.
    pub fn unregister(&mut self) {
        if !self.released {
            self.released = true;
            self.broker.unregister(&self.id);
        }
    }
}

impl Stream for Subscription {
    type Item = Event;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Event>> {
        self.get_mut().poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unregister();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}
