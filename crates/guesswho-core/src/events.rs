//! Broadcast events.
//!
//! An [`Event`] is a named notification that game state changed. Events are
//! immutable once built and carry no recipient-specific state, so one value
//! is shared by every consumer; cloning only bumps reference counts.

use std::fmt;
use std::sync::Arc;

/// Canonical event name published after every committed state change.
pub const UPDATE_EVENT: &str = "update";

/// A named notification with an optional opaque payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Event {
    name: Arc<str>,
    payload: Option<Arc<str>>,
}

impl Event {
    /// Create an event with the given name and no payload.
    ///
    /// Names are single-line on the wire, so any line break is replaced by a
    /// space.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: single_line(name.as_ref()),
            payload: None,
        }
    }

    /// The canonical `"update"` event.
    pub fn update() -> Self {
        Self::new(UPDATE_EVENT)
    }

    /// Attach an opaque payload. The payload is never interpreted.
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<Arc<str>>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Event name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Optional payload.
    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    /// Whether this is the canonical update event.
    pub fn is_update(&self) -> bool {
        &*self.name == UPDATE_EVENT
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn single_line(name: &str) -> Arc<str> {
    if name.contains(['\r', '\n']) {
        name.replace(['\r', '\n'], " ").into()
    } else {
        name.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_has_canonical_name() {
        let event = Event::update();
        assert_eq!(event.name(), "update");
        assert!(event.is_update());
        assert!(event.payload().is_none());
    }

    #[test]
    fn custom_name_is_not_update() {
        let event = Event::new("scoreboard");
        assert_eq!(event.name(), "scoreboard");
        assert!(!event.is_update());
    }

    #[test]
    fn payload_is_kept_verbatim() {
        let event = Event::new("solve").with_payload("{\"team\":\"a\"}");
        assert_eq!(event.payload(), Some("{\"team\":\"a\"}"));
    }

    #[test]
    fn line_breaks_in_name_are_flattened() {
        let event = Event::new("bad\r\nname");
        assert_eq!(event.name(), "bad  name");
    }

    #[test]
    fn clones_share_the_same_name() {
        let a = Event::update();
        let b = a.clone();
        assert_eq!(a, b);
        assert!(Arc::ptr_eq(&a.name, &b.name));
    }

    #[test]
    fn display_is_the_name() {
        assert_eq!(Event::update().to_string(), "update");
    }
}
