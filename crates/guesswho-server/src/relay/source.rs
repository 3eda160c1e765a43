//! Relay source abstraction.

use async_trait::async_trait;
use futures::stream::BoxStream;

use super::errors::RelayError;

/// One message received on the relay channel. The payload is not kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayMessage {
    /// Channel the message arrived on.
    pub channel: String,
    /// Payload size in bytes.
    pub payload_len: usize,
}

/// Messages from one subscription. Ends when the session drops.
pub type MessageStream = BoxStream<'static, RelayMessage>;

/// An external pub/sub channel the bridge can subscribe to.
#[async_trait]
pub trait RelaySource: Send + Sync {
    /// Human-readable endpoint for logs.
    fn describe(&self) -> String;

    /// Liveness check.
    async fn ping(&self) -> Result<(), RelayError>;

    /// Open a fresh session subscribed to `channel`.
    async fn subscribe(&self, channel: &str) -> Result<MessageStream, RelayError>;
}
