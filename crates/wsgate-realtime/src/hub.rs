//! Shared state of one manager: the connection registry, the three handler
//! registries, and metrics.

use std::sync::Arc;

use crate::connection::Connection;
use crate::handler::{ConnectionCallback, HandlerRegistry, MessageCallback};
use crate::metrics::GatewayMetrics;
use crate::registry::Registry;

/// Registries shared between the manager and every lifecycle loop.
#[derive(Debug, Default)]
pub(crate) struct EventHub {
    /// Live connections.
    pub(crate) connections: Registry<Arc<Connection>>,
    /// Connection-opened handlers.
    pub(crate) on_connection: HandlerRegistry<ConnectionCallback>,
    /// Message handlers.
    pub(crate) on_message: HandlerRegistry<MessageCallback>,
    /// Connection-closed handlers.
    pub(crate) on_close: HandlerRegistry<ConnectionCallback>,
    /// Counters.
    pub(crate) metrics: GatewayMetrics,
}

impl EventHub {
    /// Creates an empty hub.
    pub(crate) fn new() -> Self {
        Self::default()
    }
}
