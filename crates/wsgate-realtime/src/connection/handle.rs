//! A single live connection as seen by handlers.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use wsgate_core::types::id::ConnectionId;

use crate::registry::Identified;

use super::frame::Frame;

/// A live connection.
///
/// The transport itself is owned by the connection's lifecycle loop. Handlers
/// reach the peer through [`Connection::send`], which queues frames for the
/// loop to write between reads.
#[derive(Debug)]
pub struct Connection {
    /// Unique connection ID
    id: ConnectionId,
    /// Remote address, when the transport knows it
    peer: Option<String>,
    /// When the handshake completed
    connected_at: DateTime<Utc>,
    /// Outbound frame queue drained by the lifecycle loop
    outbound: mpsc::Sender<Frame>,
}

impl Connection {
    /// Create a connection whose outbound frames go to `outbound`.
    pub fn new(id: ConnectionId, outbound: mpsc::Sender<Frame>) -> Self {
        Self {
            id,
            peer: None,
            connected_at: Utc::now(),
            outbound,
        }
    }

    /// Attach the peer address.
    pub fn with_peer(mut self, peer: Option<String>) -> Self {
        self.peer = peer;
        self
    }

    /// Connection ID
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Remote address, if known
    pub fn peer(&self) -> Option<&str> {
        self.peer.as_deref()
    }

    /// Handshake completion time
    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Queue a frame for the peer.
    ///
    /// Never blocks. Returns `false` if the queue is full or the connection
    /// has already closed.
    pub fn send(&self, frame: Frame) -> bool {
        match self.outbound.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "Outbound queue full, dropping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

impl Identified for Connection {
    type Id = ConnectionId;

    fn id(&self) -> ConnectionId {
        self.id
    }
}
