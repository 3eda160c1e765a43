//! Sequential broadcast broker.
//!
//! A single task owns the consumer [`registry`] and processes a FIFO queue
//! of commands (register, unregister, publish, count, shutdown) one at a
//! time. [`Broker`] handles are cheap clones of the queue sender, so
//! registry mutation and delivery never run concurrently and no lock guards
//! the registry.
//!
//! Delivery never waits on a consumer: each conduit is a bounded channel
//! written with `try_send`, and a full conduit is resolved by the configured
//! [`OverflowPolicy`](guesswho_settings::OverflowPolicy).

mod registry;
pub mod subscription;

use guesswho_core::events::Event;
use guesswho_core::ids::ConsumerId;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::BrokerConfig;
use registry::Registry;
pub use subscription::Subscription;

enum Command {
    Register {
        id: ConsumerId,
        conduit: mpsc::Sender<Event>,
    },
    Unregister {
        id: ConsumerId,
    },
    Publish {
        event: Event,
    },
    Count {
        reply: oneshot::Sender<usize>,
    },
    Shutdown,
}

/// Handle to the broker control loop.
///
/// None of the operations fail or block on consumers. Once the loop has
/// stopped, registrations receive an already-closed conduit and publishes
/// are discarded.
#[derive(Clone)]
pub struct Broker {
    commands: mpsc::UnboundedSender<Command>,
    conduit_capacity: usize,
}

impl Broker {
    /// Spawn the control loop on the current runtime.
    pub fn spawn(config: BrokerConfig) -> (Self, JoinHandle<()>) {
        let (commands, rx) = mpsc::unbounded_channel();
        let registry = Registry::new(config.overflow, config.stall_limit);
        let handle = tokio::spawn(run(rx, registry));
        let broker = Self {
            commands,
            conduit_capacity: config.conduit_capacity.max(1),
        };
        (broker, handle)
    }

    /// Register a new consumer and return its subscription.
    ///
    /// The registration is ordered before any command issued after this
    /// call returns, so a subsequent `publish` reaches it.
    pub fn register(&self) -> Subscription {
        let id = ConsumerId::new();
        let (conduit, rx) = mpsc::channel(self.conduit_capacity);
        // On a stopped loop the rejected command drops `conduit`, closing
        // the subscription immediately.
        let _ = self.commands.send(Command::Register {
            id: id.clone(),
            conduit,
        });
        Subscription::new(id, rx, self.clone())
    }

    /// Request removal of a consumer. Unknown or already-removed IDs are
    /// ignored.
    pub fn unregister(&self, id: &ConsumerId) {
        let _ = self.commands.send(Command::Unregister { id: id.clone() });
    }

    /// Enqueue an event for every currently registered consumer.
    pub fn publish(&self, event: Event) {
        let _ = self.commands.send(Command::Publish { event });
    }

    /// Registry size as seen by the control loop after every command issued
    /// before this call. Returns `0` once the loop has stopped.
    pub async fn consumer_count(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Count { reply }).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    /// Close every conduit and stop the control loop.
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }

    /// Whether the control loop has stopped.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

#[tracing::instrument(skip_all, name = "broker")]
async fn run(mut commands: mpsc::UnboundedReceiver<Command>, mut registry: Registry) {
    info!("broker started");
    while let Some(command) = commands.recv().await {
        match command {
            Command::Register { id, conduit } => registry.insert(id, conduit),
            Command::Unregister { id } => {
                let _ = registry.remove(&id);
            }
            Command::Publish { event } => registry.deliver(&event),
            Command::Count { reply } => {
                let _ = reply.send(registry.len());
            }
            Command::Shutdown => break,
        }
    }
    // Commands still queued are dropped with the receiver; their conduits
    // close unopened.
    commands.close();
    registry.close_all();
    info!("broker stopped");
}
