//! # guesswho-core
//!
//! Foundation types shared by every guesswho crate.
//!
//! - [`events`]: the immutable broadcast [`Event`](events::Event)
//! - [`ids`]: branded identifiers
//! - [`retry`]: exponential backoff with jitter
//! - [`logging`]: `tracing` subscriber setup and log capture for tests

#![deny(unsafe_code)]

pub mod events;
pub mod ids;
pub mod logging;
pub mod retry;
