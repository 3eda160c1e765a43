//! Redis pub/sub relay source.

use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

use super::errors::RelayError;
use super::source::{MessageStream, RelayMessage, RelaySource};

/// Relay backed by a Redis server.
pub struct RedisRelay {
    client: redis::Client,
}

impl RedisRelay {
    /// Build a client for `address`.
    ///
    /// Accepts a full `redis://` or `rediss://` URL, or a bare `host:port`.
    /// No connection is made.
    pub fn open(address: &str) -> Result<Self, RelayError> {
        let url = normalize_address(address);
        let client = redis::Client::open(url.as_str()).map_err(|e| RelayError::InvalidAddress {
            address: address.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self { client })
    }
}

fn normalize_address(address: &str) -> String {
    if address.contains("://") {
        address.to_owned()
    } else {
        format!("redis://{address}")
    }
}

#[async_trait]
impl RelaySource for RedisRelay {
    fn describe(&self) -> String {
        self.client.get_connection_info().addr.to_string()
    }

    async fn ping(&self) -> Result<(), RelayError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream, RelayError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(channel).await?;
        debug!(channel, "redis subscription established");
        let messages = pubsub.into_on_message().map(|msg| RelayMessage {
            channel: msg.get_channel_name().to_owned(),
            payload_len: msg.get_payload_bytes().len(),
        });
        Ok(messages.boxed())
    }
}
