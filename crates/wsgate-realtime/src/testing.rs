//! In-memory transport and upgrader for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use wsgate_core::error::AppError;
use wsgate_core::result::AppResult;
use wsgate_core::types::id::{ConnectionId, SequentialIds};

use crate::connection::{Connection, Frame};
use crate::transport::{Transport, Upgrader};

/// A connection plus the receiving end of its outbound queue.
pub(crate) fn test_connection() -> (Connection, mpsc::Receiver<Frame>) {
    let (tx, rx) = mpsc::channel(16);
    let connection = Connection::new(ConnectionId::generate(&SequentialIds::new()), tx);
    (connection, rx)
}

/// Creates a transport and the test-side handle that feeds it.
pub(crate) fn mock_transport() -> (MockPeer, MockTransport) {
    let (tx, rx) = mpsc::unbounded_channel();
    let written = Arc::new(Mutex::new(Vec::new()));
    let closed = Arc::new(AtomicBool::new(false));
    let fail_write = Arc::new(AtomicBool::new(false));

    let peer = MockPeer {
        inbound: tx,
        written: Arc::clone(&written),
        closed: Arc::clone(&closed),
        fail_write: Arc::clone(&fail_write),
    };
    let transport = MockTransport {
        inbound: rx,
        written,
        closed,
        fail_write,
    };
    (peer, transport)
}

/// Test side of a [`MockTransport`]. Dropping it surfaces a read error.
pub(crate) struct MockPeer {
    inbound: mpsc::UnboundedSender<AppResult<Frame>>,
    written: Arc<Mutex<Vec<Frame>>>,
    closed: Arc<AtomicBool>,
    fail_write: Arc<AtomicBool>,
}

impl MockPeer {
    /// Queues the next result `read_frame` will return.
    pub(crate) fn push(&self, frame: AppResult<Frame>) {
        let _ = self.inbound.send(frame);
    }

    /// Frames the loop has written so far.
    pub(crate) fn written(&self) -> Vec<Frame> {
        self.written.lock().unwrap().clone()
    }

    /// Makes the next `write_frame` fail with a transport error.
    pub(crate) fn fail_next_write(&self) {
        self.fail_write.store(true, Ordering::SeqCst);
    }

    /// Whether `close` was called on the transport.
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Polls `condition` until it holds, failing the test after five seconds.
    pub(crate) async fn wait_until(&self, condition: impl Fn() -> bool) {
        wait_until(condition).await;
    }
}

/// Polls `condition` until it holds, failing the test after five seconds.
pub(crate) async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Transport backed by channels.
pub(crate) struct MockTransport {
    inbound: mpsc::UnboundedReceiver<AppResult<Frame>>,
    written: Arc<Mutex<Vec<Frame>>>,
    closed: Arc<AtomicBool>,
    fail_write: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn read_frame(&mut self) -> AppResult<Frame> {
        match self.inbound.recv().await {
            Some(result) => result,
            None => Err(AppError::transport("mock peer went away")),
        }
    }

    async fn write_frame(&mut self, frame: Frame) -> AppResult<()> {
        if self.fail_write.swap(false, Ordering::SeqCst) {
            return Err(AppError::transport("mock write failed"));
        }
        self.written.lock().unwrap().push(frame);
        Ok(())
    }

    async fn close(&mut self) -> AppResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn peer(&self) -> Option<String> {
        Some("mock".to_string())
    }
}

/// Upgrades `Some(transport)` and rejects `None`.
#[derive(Debug, Default)]
pub(crate) struct MockUpgrader;

#[async_trait]
impl Upgrader for MockUpgrader {
    type Request = Option<MockTransport>;
    type Transport = MockTransport;

    async fn upgrade(&self, request: Option<MockTransport>) -> AppResult<MockTransport> {
        request.ok_or_else(|| AppError::handshake("mock handshake rejected"))
    }
}
