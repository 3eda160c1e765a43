//! Server-sent events endpoint.
//!
//! Each `GET /events` connection registers exactly one broker consumer and
//! streams its conduit as `text/event-stream` until the client leaves, the
//! broker closes the conduit, or the server shuts down.

pub mod frame;
pub mod handler;
pub mod stream;

pub use handler::events_handler;
pub use stream::{ConsumerStream, StreamState};
