//! WebSocket transport on `tokio-tungstenite`.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use wsgate_core::error::{AppError, ErrorKind};
use wsgate_core::result::AppResult;

use crate::connection::Frame;

use super::{Transport, Upgrader};

/// Accepts WebSocket handshakes on raw TCP streams.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsUpgrader;

#[async_trait]
impl Upgrader for WsUpgrader {
    type Request = TcpStream;
    type Transport = WsTransport<TcpStream>;

    async fn upgrade(&self, stream: TcpStream) -> AppResult<Self::Transport> {
        let peer = stream.peer_addr().ok().map(|addr| addr.to_string());

        let socket = tokio_tungstenite::accept_async(stream).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Handshake,
                format!("WebSocket handshake failed: {e}"),
                e,
            )
        })?;

        Ok(WsTransport::new(socket, peer))
    }
}

/// An established WebSocket.
///
/// Ping/pong and raw frames are handled here and never surface as
/// [`Frame`]s; tungstenite answers pings on the next read or write.
#[derive(Debug)]
pub struct WsTransport<S> {
    socket: WebSocketStream<S>,
    peer: Option<String>,
}

impl<S> WsTransport<S> {
    /// Wraps an already-upgraded socket.
    pub fn new(socket: WebSocketStream<S>, peer: Option<String>) -> Self {
        Self { socket, peer }
    }
}

#[async_trait]
impl<S> Transport for WsTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn read_frame(&mut self) -> AppResult<Frame> {
        loop {
            match self.socket.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Frame::Text(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(data))) => return Ok(Frame::Binary(data)),
                Some(Ok(Message::Close(_))) => return Ok(Frame::Close),
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Err(e)) => {
                    return Err(AppError::with_source(
                        ErrorKind::Transport,
                        format!("WebSocket read failed: {e}"),
                        e,
                    ));
                }
                None => return Err(AppError::transport("WebSocket stream ended")),
            }
        }
    }

    async fn write_frame(&mut self, frame: Frame) -> AppResult<()> {
        let message = match frame {
            Frame::Text(text) => Message::Text(text.into()),
            Frame::Binary(data) => Message::Binary(data),
            Frame::Close => Message::Close(None),
        };

        self.socket.send(message).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Transport,
                format!("WebSocket write failed: {e}"),
                e,
            )
        })
    }

    async fn close(&mut self) -> AppResult<()> {
        self.socket.close(None).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Transport,
                format!("WebSocket close failed: {e}"),
                e,
            )
        })
    }

    fn peer(&self) -> Option<String> {
        self.peer.clone()
    }
}
