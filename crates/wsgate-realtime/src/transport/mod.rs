//! Seams to the handshake and framing layer.
//!
//! The lifecycle loop only sees [`Frame`]s; turning an inbound request into
//! a live transport and moving bytes on the wire belong to implementations of
//! these traits. [`ws`] provides the WebSocket one.

pub mod ws;

use async_trait::async_trait;

use wsgate_core::result::AppResult;

use crate::connection::Frame;

/// A live, bidirectional frame transport.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Reads the next frame.
    ///
    /// Must be cancel-safe: the lifecycle loop polls it inside
    /// `tokio::select!` and drops the future when an outbound frame is ready.
    /// Any error ends the connection.
    async fn read_frame(&mut self) -> AppResult<Frame>;

    /// Writes one frame to the peer.
    async fn write_frame(&mut self, frame: Frame) -> AppResult<()>;

    /// Closes the transport and releases its resources.
    async fn close(&mut self) -> AppResult<()>;

    /// Remote address, when known.
    fn peer(&self) -> Option<String> {
        None
    }
}

/// Performs the handshake that turns an inbound request into a transport.
#[async_trait]
pub trait Upgrader: Send + Sync + 'static {
    /// Whatever the surrounding server hands over per inbound connection.
    type Request: Send + 'static;
    /// The transport produced by a successful handshake.
    type Transport: Transport;

    /// Runs the handshake. Failures should carry `ErrorKind::Handshake`.
    async fn upgrade(&self, request: Self::Request) -> AppResult<Self::Transport>;
}
