//! # wsgate-realtime
//!
//! Connection and event-management core of the wsgate gateway. Provides:
//!
//! - A thread-safe, insertion-ordered [`Registry`] used for live connections
//!   and for each handler kind
//! - Typed handler registries with ordered, non-short-circuiting dispatch
//! - The per-connection lifecycle loop (upgrading, open, closing, closed)
//! - The [`Manager`] composition root and a WebSocket transport on
//!   `tokio-tungstenite`
//!
//! Connections enter and leave the registry only through the lifecycle loop;
//! the shared state behind a [`Manager`] is private to this crate:
//!
//! ```compile_fail
//! use wsgate_realtime::hub::EventHub;
//! ```

pub mod connection;
pub mod handler;
pub(crate) mod hub;
pub mod lifecycle;
pub mod manager;
pub mod metrics;
pub mod registry;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{Connection, Frame, FrameType};
pub use handler::{DispatchError, Handler, HandlerKind, HandlerRegistry};
pub use manager::Manager;
pub use registry::{Identified, Registry};
pub use transport::ws::{WsTransport, WsUpgrader};
pub use transport::{Transport, Upgrader};
