//! # guesswho-server
//!
//! Real-time fan-out of game state changes to streaming clients.
//!
//! - Sequential broadcast [`broker`] with bounded per-consumer conduits
//! - Server-sent events endpoint ([`sse`]) bridging one connection to one
//!   registration
//! - Redis pub/sub [`relay`] re-broadcasting updates from other processes
//! - In-memory [`game`] state whose mutations publish `update`
//! - Health, Prometheus metrics, and graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod broker;
pub mod config;
pub mod game;
pub mod health;
pub mod metrics;
pub mod relay;
pub mod server;
pub mod shutdown;
pub mod sse;
