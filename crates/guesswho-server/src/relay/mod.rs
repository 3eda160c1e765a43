//! Cross-process relay of update notifications.
//!
//! A [`RelaySource`] yields messages from an external pub/sub channel; the
//! [`PubSubBridge`] turns each one into a local `update` broadcast. With no
//! relay configured the bridge does nothing and the rest of the server is
//! unaffected.

pub mod bridge;
pub mod errors;
pub mod redis_relay;
pub mod source;

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

pub use bridge::{BridgeExit, PubSubBridge};
pub use errors::RelayError;
pub use redis_relay::RedisRelay;
pub use source::{MessageStream, RelayMessage, RelaySource};

/// Connection state of the relay bridge, reported by `/health`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayState {
    /// No relay address configured.
    #[default]
    Disabled,
    /// Initial connect in progress.
    Connecting,
    /// Subscribed and relaying.
    Connected,
    /// Subscription dropped, reconnecting.
    Reconnecting,
    /// Unreachable at startup or reconnect attempts exhausted.
    Unavailable,
}

/// Shared, cheaply cloned view of the bridge state.
#[derive(Clone, Debug, Default)]
pub struct RelayStatus(Arc<Mutex<RelayState>>);

impl RelayStatus {
    /// Create a status cell.
    pub fn new(state: RelayState) -> Self {
        Self(Arc::new(Mutex::new(state)))
    }

    /// Current state.
    pub fn get(&self) -> RelayState {
        *self.0.lock()
    }

    /// Replace the state.
    pub fn set(&self, state: RelayState) {
        *self.0.lock() = state;
    }
}

/// Build the relay source for an optional address.
///
/// `None` or a blank address disables relaying. A malformed address is an
/// error; an unreachable one is not detected here.
pub fn open_source(address: Option<&str>) -> Result<Option<Arc<dyn RelaySource>>, RelayError> {
    match address.map(str::trim).filter(|a| !a.is_empty()) {
        None => Ok(None),
        Some(addr) => {
            let relay: Arc<dyn RelaySource> = Arc::new(RedisRelay::open(addr)?);
            Ok(Some(relay))
        }
    }
}
