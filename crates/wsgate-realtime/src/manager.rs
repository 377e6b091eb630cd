//! Connection manager: handler registration and the per-connection entry
//! point.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use wsgate_core::config::realtime::RealtimeConfig;
use wsgate_core::error::{AppError, ErrorKind};
use wsgate_core::result::AppResult;
use wsgate_core::types::id::{ConnectionId, HandlerId, IdGenerator};

use crate::connection::{Connection, Frame};
use crate::handler::{ConnectionCallback, Handler, HandlerKind, MessageCallback};
use crate::hub::EventHub;
use crate::lifecycle::LifecycleLoop;
use crate::metrics::MetricsSnapshot;
use crate::transport::{Transport, Upgrader};

/// Owns the connection registry and the opened/message/close handler
/// registries, and starts a lifecycle loop per inbound connection.
///
/// Cloning is cheap; clones share all state.
pub struct Manager<U: Upgrader> {
    /// Handshake collaborator.
    upgrader: Arc<U>,
    /// Registries and metrics.
    hub: Arc<EventHub>,
    /// Source of connection and handler ids.
    ids: Arc<dyn IdGenerator>,
    /// Configuration.
    config: RealtimeConfig,
}

impl<U: Upgrader> Clone for Manager<U> {
    fn clone(&self) -> Self {
        Self {
            upgrader: Arc::clone(&self.upgrader),
            hub: Arc::clone(&self.hub),
            ids: Arc::clone(&self.ids),
            config: self.config.clone(),
        }
    }
}

impl<U: Upgrader> fmt::Debug for Manager<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("connections", &self.hub.connections.count())
            .field("ids", &self.ids)
            .finish()
    }
}

impl<U: Upgrader> Manager<U> {
    /// Creates a manager using the id strategy from `config`.
    pub fn new(upgrader: U, config: RealtimeConfig) -> Self {
        let ids = config.id_strategy.build();
        Self::with_id_generator(upgrader, config, ids)
    }

    /// Creates a manager with an explicit id generator.
    pub fn with_id_generator(
        upgrader: U,
        config: RealtimeConfig,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            upgrader: Arc::new(upgrader),
            hub: Arc::new(EventHub::new()),
            ids,
            config,
        }
    }

    /// Registers a handler for newly opened connections.
    pub fn register_connection_handler<F>(&self, callback: F) -> HandlerId
    where
        F: Fn(&Connection) -> AppResult<()> + Send + Sync + 'static,
    {
        let callback = Arc::new(callback) as Arc<ConnectionCallback>;
        let handler = Handler::new(self.next_handler_id(), callback);
        self.hub.on_connection.add(handler).id()
    }

    /// Registers a handler for text and binary messages.
    pub fn register_message_handler<F>(&self, callback: F) -> HandlerId
    where
        F: Fn(&Connection, &[u8]) -> AppResult<()> + Send + Sync + 'static,
    {
        let callback = Arc::new(callback) as Arc<MessageCallback>;
        let handler = Handler::new(self.next_handler_id(), callback);
        self.hub.on_message.add(handler).id()
    }

    /// Registers a handler for closing connections.
    pub fn register_close_handler<F>(&self, callback: F) -> HandlerId
    where
        F: Fn(&Connection) -> AppResult<()> + Send + Sync + 'static,
    {
        let callback = Arc::new(callback) as Arc<ConnectionCallback>;
        let handler = Handler::new(self.next_handler_id(), callback);
        self.hub.on_close.add(handler).id()
    }

    /// Removes a handler. Returns `false` if `id` is not registered under
    /// `kind`.
    pub fn unregister_handler(&self, kind: HandlerKind, id: HandlerId) -> bool {
        match kind {
            HandlerKind::Connection => self.hub.on_connection.remove_id(&id),
            HandlerKind::Message => self.hub.on_message.remove_id(&id),
            HandlerKind::Close => self.hub.on_close.remove_id(&id),
        }
    }

    /// Number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: HandlerKind) -> usize {
        match kind {
            HandlerKind::Connection => self.hub.on_connection.count(),
            HandlerKind::Message => self.hub.on_message.count(),
            HandlerKind::Close => self.hub.on_close.count(),
        }
    }

    /// Upgrades an inbound request and starts its lifecycle loop.
    ///
    /// The handshake runs on the caller. On success the loop is spawned as
    /// its own task and keeps running after this returns; the join handle
    /// may be dropped. On failure nothing is registered and no handler runs.
    pub async fn handle_new_connection(&self, request: U::Request) -> AppResult<JoinHandle<()>> {
        let transport = match self.upgrader.upgrade(request).await {
            Ok(transport) => transport,
            Err(e) => {
                self.hub.metrics.record_handshake_failure();
                warn!(error = %e, "Handshake failed");
                return Err(into_handshake_error(e));
            }
        };

        let (tx, rx) = mpsc::channel(self.config.outbound_buffer_size.max(1));
        let connection = Arc::new(
            Connection::new(ConnectionId::generate(self.ids.as_ref()), tx)
                .with_peer(transport.peer()),
        );

        info!(
            conn_id = %connection.id(),
            peer = connection.peer().unwrap_or("unknown"),
            "Connection upgraded"
        );

        let lifecycle = LifecycleLoop::new(Arc::clone(&self.hub), connection, transport, rx);
        Ok(tokio::spawn(lifecycle.run()))
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.hub.connections.count()
    }

    /// Snapshot of the live connections, in registration order.
    pub fn connections(&self) -> Vec<Arc<Connection>> {
        self.hub.connections.snapshot()
    }

    /// Queues a frame for one connection. Returns `false` if the connection
    /// is gone or its queue is full.
    pub fn send_to(&self, id: ConnectionId, frame: Frame) -> bool {
        self.hub
            .connections
            .get(&id)
            .is_some_and(|connection| connection.send(frame))
    }

    /// Queues a frame for every open connection. Returns how many accepted it.
    pub fn broadcast(&self, frame: Frame) -> usize {
        self.hub
            .connections
            .snapshot()
            .iter()
            .filter(|connection| connection.send(frame.clone()))
            .count()
    }

    /// Current counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.hub.metrics.snapshot()
    }

    fn next_handler_id(&self) -> HandlerId {
        HandlerId::generate(self.ids.as_ref())
    }
}

fn into_handshake_error(error: AppError) -> AppError {
    if error.is_handshake() {
        error
    } else {
        let message = format!("Upgrade failed: {}", error.message);
        AppError::with_source(ErrorKind::Handshake, message, error)
    }
}
