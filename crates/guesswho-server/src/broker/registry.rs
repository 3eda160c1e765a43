//! Consumer registry owned by the broker control loop.

use std::collections::HashMap;

use guesswho_core::events::Event;
use guesswho_core::ids::ConsumerId;
use guesswho_settings::OverflowPolicy;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::metrics::{
    CONSUMERS_ACTIVE, CONSUMERS_EVICTED_TOTAL, DELIVERIES_DROPPED_TOTAL, EVENTS_PUBLISHED_TOTAL,
};

struct Consumer {
    conduit: mpsc::Sender<Event>,
    consecutive_drops: u32,
}

pub(super) struct Registry {
    consumers: HashMap<ConsumerId, Consumer>,
    overflow: OverflowPolicy,
    stall_limit: u32,
}

impl Registry {
    pub(super) fn new(overflow: OverflowPolicy, stall_limit: u32) -> Self {
        Self {
            consumers: HashMap::new(),
            overflow,
            stall_limit,
        }
    }

    pub(super) fn len(&self) -> usize {
        self.consumers.len()
    }

    pub(super) fn insert(&mut self, id: ConsumerId, conduit: mpsc::Sender<Event>) {
        // A consumer whose receiver is already gone never enters the registry.
        if conduit.is_closed() {
            return;
        }
        let _ = self.consumers.insert(
            id.clone(),
            Consumer {
                conduit,
                consecutive_drops: 0,
            },
        );
        self.update_gauge();
        debug!(consumer_id = %id, consumers = self.len(), "consumer registered");
    }

    /// Remove a consumer, closing its conduit. Returns whether it was present.
    pub(super) fn remove(&mut self, id: &ConsumerId) -> bool {
        let removed = self.consumers.remove(id).is_some();
        if removed {
            self.update_gauge();
            debug!(consumer_id = %id, consumers = self.len(), "consumer unregistered");
        }
        removed
    }

    /// Deliver one event to every consumer without waiting on any of them.
    pub(super) fn deliver(&mut self, event: &Event) {
        metrics::counter!(EVENTS_PUBLISHED_TOTAL).increment(1);
        let mut evicted = Vec::new();
        let mut gone = Vec::new();

        for (id, consumer) in &mut self.consumers {
            match consumer.conduit.try_send(event.clone()) {
                Ok(()) => consumer.consecutive_drops = 0,
                Err(TrySendError::Full(_)) => {
                    consumer.consecutive_drops += 1;
                    metrics::counter!(DELIVERIES_DROPPED_TOTAL).increment(1);
                    let evict = match self.overflow {
                        OverflowPolicy::Disconnect => true,
                        OverflowPolicy::DropNewest => {
                            self.stall_limit > 0 && consumer.consecutive_drops >= self.stall_limit
                        }
                    };
                    if evict {
                        evicted.push(id.clone());
                    }
                }
                Err(TrySendError::Closed(_)) => gone.push(id.clone()),
            }
        }

        for id in evicted {
            if self.remove(&id) {
                metrics::counter!(CONSUMERS_EVICTED_TOTAL).increment(1);
                warn!(consumer_id = %id, policy = ?self.overflow, "evicted stalled consumer");
            }
        }
        for id in gone {
            let _ = self.remove(&id);
        }
    }

    /// Drop every conduit sender, ending all subscriptions.
    pub(super) fn close_all(&mut self) {
        let count = self.consumers.len();
        self.consumers.clear();
        self.update_gauge();
        if count > 0 {
            debug!(consumers = count, "closed all conduits");
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn update_gauge(&self) {
        metrics::gauge!(CONSUMERS_ACTIVE).set(self.consumers.len() as f64);
    }
}
