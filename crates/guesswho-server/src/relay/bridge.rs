//! Bridge from the relay channel into the local broker.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use guesswho_core::events::Event;
use guesswho_core::retry::backoff_delay_ms;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::errors::RelayError;
use super::source::{MessageStream, RelaySource};
use super::{RelayState, RelayStatus};
use crate::broker::Broker;
use crate::config::RelayConfig;
use crate::metrics::{RELAY_MESSAGES_TOTAL, RELAY_RECONNECTS_TOTAL};

/// Why the bridge loop returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BridgeExit {
    /// No relay configured.
    Disabled,
    /// The relay was unreachable at startup.
    Unavailable,
    /// Server shutdown was requested.
    Shutdown,
    /// An established session dropped and every reconnect attempt failed.
    GaveUp,
}

enum SessionEnd {
    Closed,
    Shutdown,
}

/// Relays every message on one channel as a local `update` broadcast.
pub struct PubSubBridge {
    source: Option<Arc<dyn RelaySource>>,
    config: RelayConfig,
    broker: Broker,
    status: RelayStatus,
    shutdown: CancellationToken,
}

impl PubSubBridge {
    /// Create a bridge. `source` is `None` when relaying is disabled.
    pub fn new(
        source: Option<Arc<dyn RelaySource>>,
        config: RelayConfig,
        broker: Broker,
        shutdown: CancellationToken,
    ) -> Self {
        let initial = if source.is_some() {
            RelayState::Connecting
        } else {
            RelayState::Disabled
        };
        Self {
            source,
            config,
            broker,
            status: RelayStatus::new(initial),
            shutdown,
        }
    }

    /// Shared state cell, updated as the bridge runs.
    pub fn status(&self) -> RelayStatus {
        self.status.clone()
    }

    /// Run until shutdown or until the relay is given up on.
    ///
    /// An unreachable relay at startup is logged once and not retried. Once
    /// a session has been established, a dropped subscription is retried
    /// with exponential backoff up to `max_reconnect_attempts` times; the
    /// attempt counter starts over after every successful reconnect.
    #[tracing::instrument(
        skip_all,
        name = "relay_bridge",
        fields(channel = %self.config.channel)
    )]
    pub async fn run(self) -> BridgeExit {
        let Some(source) = self.source.clone() else {
            self.status.set(RelayState::Disabled);
            debug!("no relay configured");
            return BridgeExit::Disabled;
        };

        self.status.set(RelayState::Connecting);
        let mut session = tokio::select! {
            biased;
            () = self.shutdown.cancelled() => return BridgeExit::Shutdown,
            result = self.connect(source.as_ref()) => match result {
                Ok(session) => session,
                Err(e) => {
                    warn!(
                        relay = %source.describe(),
                        error = %e,
                        "relay unavailable, continuing without it"
                    );
                    self.status.set(RelayState::Unavailable);
                    return BridgeExit::Unavailable;
                }
            },
        };
        self.status.set(RelayState::Connected);
        info!(relay = %source.describe(), "relay subscribed");

        loop {
            if let SessionEnd::Shutdown = self.pump(&mut session).await {
                return BridgeExit::Shutdown;
            }
            self.status.set(RelayState::Reconnecting);
            warn!("relay subscription closed");

            match self.reconnect(source.as_ref()).await {
                Ok(next) => {
                    session = next;
                    self.status.set(RelayState::Connected);
                    info!("relay resubscribed");
                }
                Err(exit) => return exit,
            }
        }
    }

    async fn connect(&self, source: &dyn RelaySource) -> Result<MessageStream, RelayError> {
        let timeout = self.config.connect_timeout;
        tokio::time::timeout(timeout, async {
            source.ping().await?;
            source.subscribe(&self.config.channel).await
        })
        .await
        .map_err(|_| RelayError::Timeout(timeout))?
    }

    async fn pump(&self, session: &mut MessageStream) -> SessionEnd {
        loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => return SessionEnd::Shutdown,
                message = session.next() => match message {
                    Some(message) => {
                        metrics::counter!(RELAY_MESSAGES_TOTAL).increment(1);
                        debug!(
                            channel = %message.channel,
                            payload_len = message.payload_len,
                            "relaying update"
                        );
                        self.broker.publish(Event::update());
                    }
                    None => return SessionEnd::Closed,
                },
            }
        }
    }

    async fn reconnect(&self, source: &dyn RelaySource) -> Result<MessageStream, BridgeExit> {
        let attempts = self.config.max_reconnect_attempts;
        for attempt in 0..attempts {
            let delay = self.backoff(attempt);
            metrics::counter!(RELAY_RECONNECTS_TOTAL).increment(1);
            debug!(
                attempt = attempt + 1,
                delay_ms = duration_ms(delay),
                "relay reconnect scheduled"
            );

            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => return Err(BridgeExit::Shutdown),
                () = tokio::time::sleep(delay) => {}
            }
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => return Err(BridgeExit::Shutdown),
                result = self.connect(source) => match result {
                    Ok(session) => return Ok(session),
                    Err(e) => warn!(attempt = attempt + 1, error = %e, "relay reconnect failed"),
                },
            }
        }
        error!(attempts, "relay reconnect attempts exhausted");
        self.status.set(RelayState::Unavailable);
        Err(BridgeExit::GaveUp)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let ms = backoff_delay_ms(
            attempt,
            duration_ms(self.config.base_delay),
            duration_ms(self.config.max_delay),
            self.config.jitter_factor,
            rand::random::<f64>(),
        );
        Duration::from_millis(ms)
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use futures::channel::mpsc::{UnboundedSender, unbounded};
    use guesswho_core::logging::capture_logs;
    use parking_lot::Mutex;
    use tokio::time::{Instant, timeout};
    use tracing::Level;

    use super::*;
    use crate::config::BrokerConfig;
    use crate::relay::source::RelayMessage;

    const TIMEOUT: Duration = Duration::from_secs(60);

    /// Scripted relay: each `subscribe` pops the next session, failing once
    /// the script is exhausted.
    struct FakeRelay {
        reachable: bool,
        sessions: Mutex<VecDeque<MessageStream>>,
        attempts: Mutex<Vec<Instant>>,
    }

    impl FakeRelay {
        fn unreachable() -> Arc<Self> {
            Arc::new(Self {
                reachable: false,
                sessions: Mutex::new(VecDeque::new()),
                attempts: Mutex::new(Vec::new()),
            })
        }

        /// Relay with `n` scripted sessions; returns their senders.
        fn with_sessions(n: usize) -> (Arc<Self>, Vec<UnboundedSender<RelayMessage>>) {
            let mut senders = Vec::new();
            let mut sessions = VecDeque::new();
            for _ in 0..n {
                let (tx, rx) = unbounded();
                senders.push(tx);
                sessions.push_back(rx.boxed());
            }
            let relay = Arc::new(Self {
                reachable: true,
                sessions: Mutex::new(sessions),
                attempts: Mutex::new(Vec::new()),
            });
            (relay, senders)
        }

        fn attempts(&self) -> Vec<Instant> {
            self.attempts.lock().clone()
        }
    }

    #[async_trait]
    impl RelaySource for FakeRelay {
        fn describe(&self) -> String {
            "fake".into()
        }

        async fn ping(&self) -> Result<(), RelayError> {
            self.attempts.lock().push(Instant::now());
            if self.reachable {
                Ok(())
            } else {
                Err(refused("connection refused"))
            }
        }

        async fn subscribe(&self, _channel: &str) -> Result<MessageStream, RelayError> {
            self.sessions
                .lock()
                .pop_front()
                .ok_or_else(|| refused("no session"))
        }
    }

    fn refused(reason: &'static str) -> RelayError {
        let err = redis::RedisError::from((redis::ErrorKind::IoError, reason));
        RelayError::Redis(err)
    }

    fn message() -> RelayMessage {
        RelayMessage {
            channel: "game_updates".into(),
            payload_len: 7,
        }
    }

    fn config(max_reconnect_attempts: u32) -> RelayConfig {
        RelayConfig {
            max_reconnect_attempts,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            jitter_factor: 0.0,
            ..RelayConfig::default()
        }
    }

    fn bridge(
        source: Option<Arc<dyn RelaySource>>,
        config: RelayConfig,
    ) -> (PubSubBridge, Broker, CancellationToken) {
        let (broker, _h) = Broker::spawn(BrokerConfig::default());
        let token = CancellationToken::new();
        let bridge = PubSubBridge::new(source, config, broker.clone(), token.clone());
        (bridge, broker, token)
    }

    #[tokio::test]
    async fn disabled_returns_silently_and_local_publish_works() {
        let (logs, _guard) = capture_logs();
        let (bridge, broker, _token) = bridge(None, config(3));
        let status = bridge.status();
        let mut a = broker.register();
        let mut b = broker.register();

        assert_eq!(bridge.run().await, BridgeExit::Disabled);
        assert_eq!(status.get(), RelayState::Disabled);
        assert_eq!(logs.count_at_level(Level::WARN), 0);
        assert_eq!(logs.count_at_level(Level::ERROR), 0);

        broker.publish(Event::update());
        assert_eq!(a.recv().await, Some(Event::update()));
        assert_eq!(b.recv().await, Some(Event::update()));
    }

    #[tokio::test]
    async fn unreachable_at_startup_is_not_retried() {
        let (logs, _guard) = capture_logs();
        let relay = FakeRelay::unreachable();
        let (bridge, broker, _token) = bridge(Some(relay.clone()), config(5));
        let status = bridge.status();
        let mut sub = broker.register();

        assert_eq!(bridge.run().await, BridgeExit::Unavailable);
        assert_eq!(relay.attempts().len(), 1);
        assert_eq!(status.get(), RelayState::Unavailable);
        assert!(logs.has_event(Level::WARN, "relay unavailable"));

        broker.publish(Event::update());
        assert_eq!(sub.recv().await, Some(Event::update()));
    }

    #[tokio::test]
    async fn one_message_reaches_every_consumer_once() {
        let (relay, senders) = FakeRelay::with_sessions(1);
        let (bridge, broker, token) = bridge(Some(relay), config(0));
        let status = bridge.status();
        let mut a = broker.register();
        let mut b = broker.register();

        senders[0].unbounded_send(message()).unwrap();
        let task = tokio::spawn(bridge.run());

        for sub in [&mut a, &mut b] {
            let event = timeout(TIMEOUT, sub.recv()).await.unwrap().unwrap();
            assert!(event.is_update());
            assert!(event.payload().is_none());
        }
        assert_eq!(status.get(), RelayState::Connected);

        token.cancel();
        assert_eq!(task.await.unwrap(), BridgeExit::Shutdown);
        assert!(a.try_recv().is_err());
        assert!(b.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_session_reconnects() {
        let (relay, mut senders) = FakeRelay::with_sessions(2);
        let (bridge, broker, token) = bridge(Some(relay.clone()), config(3));
        let mut sub = broker.register();
        let task = tokio::spawn(bridge.run());

        let second = senders.pop().unwrap();
        let first = senders.pop().unwrap();
        first.unbounded_send(message()).unwrap();
        let event = timeout(TIMEOUT, sub.recv()).await.unwrap();
        assert!(event.unwrap().is_update());
        drop(first);

        second.unbounded_send(message()).unwrap();
        let event = timeout(TIMEOUT, sub.recv()).await.unwrap();
        assert!(event.unwrap().is_update());
        assert_eq!(relay.attempts().len(), 2);

        token.cancel();
        assert_eq!(task.await.unwrap(), BridgeExit::Shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_attempts_are_capped_with_growing_backoff() {
        let (relay, mut senders) = FakeRelay::with_sessions(1);
        let (bridge, _broker, _token) = bridge(Some(relay.clone()), config(4));
        let status = bridge.status();
        drop(senders.pop());

        let exit = timeout(TIMEOUT, bridge.run()).await.unwrap();
        assert_eq!(exit, BridgeExit::GaveUp);
        assert_eq!(status.get(), RelayState::Unavailable);

        let attempts = relay.attempts();
        assert_eq!(attempts.len(), 1 + 4);
        let gaps: Vec<u128> = attempts
            .windows(2)
            .map(|w| w[1].duration_since(w[0]).as_millis())
            .collect();
        assert_eq!(gaps, vec![100, 200, 400, 800]);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_reconnect_resets_attempt_counter() {
        let (relay, senders) = FakeRelay::with_sessions(3);
        let (bridge, _broker, _token) = bridge(Some(relay.clone()), config(2));
        drop(senders);

        let exit = timeout(TIMEOUT, bridge.run()).await.unwrap();
        assert_eq!(exit, BridgeExit::GaveUp);
        let attempts = relay.attempts();
        let gaps: Vec<u128> = attempts
            .windows(2)
            .map(|w| w[1].duration_since(w[0]).as_millis())
            .collect();
        // each reconnect starts from the base delay again
        assert_eq!(gaps, vec![100, 100, 100, 200]);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_backoff() {
        let (relay, mut senders) = FakeRelay::with_sessions(1);
        let cfg = RelayConfig {
            base_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(30),
            ..config(10)
        };
        let (bridge, _broker, token) = bridge(Some(relay.clone()), cfg);
        let status = bridge.status();
        let task = tokio::spawn(bridge.run());

        drop(senders.pop());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(status.get(), RelayState::Reconnecting);

        token.cancel();
        assert_eq!(task.await.unwrap(), BridgeExit::Shutdown);
        assert_eq!(relay.attempts().len(), 1);
    }
}
