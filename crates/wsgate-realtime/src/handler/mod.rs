//! Event handlers: typed callbacks with an id, grouped by event kind.

pub mod registry;

use std::fmt;
use std::sync::Arc;

use wsgate_core::result::AppResult;
use wsgate_core::types::id::HandlerId;

use crate::connection::Connection;
use crate::registry::Identified;

pub use registry::{DispatchError, HandlerFailure, HandlerRegistry};

/// Callback for connection-opened and connection-closed events.
pub type ConnectionCallback = dyn Fn(&Connection) -> AppResult<()> + Send + Sync;

/// Callback for text and binary messages. Receives the frame payload.
pub type MessageCallback = dyn Fn(&Connection, &[u8]) -> AppResult<()> + Send + Sync;

/// The event a handler subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    /// A connection finished its handshake and was registered.
    Connection,
    /// A text or binary frame arrived.
    Message,
    /// A connection is closing.
    Close,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection => write!(f, "connection"),
            Self::Message => write!(f, "message"),
            Self::Close => write!(f, "close"),
        }
    }
}

/// A registered callback of signature `F`.
pub struct Handler<F: ?Sized> {
    id: HandlerId,
    callback: Arc<F>,
}

impl<F: ?Sized> Handler<F> {
    /// Wraps a callback under the given id.
    pub fn new(id: HandlerId, callback: Arc<F>) -> Self {
        Self { id, callback }
    }

    /// Returns the handler id.
    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// Returns the callback.
    pub fn callback(&self) -> &F {
        &self.callback
    }
}

impl<F: ?Sized> Clone for Handler<F> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<F: ?Sized> Identified for Handler<F> {
    type Id = HandlerId;

    fn id(&self) -> HandlerId {
        self.id
    }
}

impl<F: ?Sized> fmt::Debug for Handler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("id", &self.id).finish()
    }
}
