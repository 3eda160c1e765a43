//! Wire framing for broker events.

use axum::response::sse;
use guesswho_core::events::Event;

/// Frame an event for the stream.
///
/// A bare event becomes `data: <name>`; one with a payload becomes
/// `event: <name>` followed by `data: <payload>`. Multi-line payloads are
/// split across `data:` lines.
pub fn frame(event: &Event) -> sse::Event {
    match event.payload() {
        None => sse::Event::default().data(event.name()),
        Some(payload) => sse::Event::default().event(event.name()).data(payload),
    }
}
