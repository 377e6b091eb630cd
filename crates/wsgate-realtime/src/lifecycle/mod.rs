//! Per-connection lifecycle: `Upgrading -> Open -> Closing -> Closed`.
//!
//! The handshake (`Upgrading`) runs in [`crate::Manager::handle_new_connection`];
//! a [`LifecycleLoop`] starts at `Open` with an upgraded transport and runs on
//! its own task until the peer closes or the transport fails.

pub(crate) mod guard;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::connection::{Connection, Frame};
use crate::handler::{DispatchError, HandlerKind};
use crate::hub::EventHub;
use crate::transport::Transport;

use self::guard::Registration;

/// Lifecycle states. Transitions are linear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Handshake in progress; no connection exists yet.
    Upgrading,
    /// Registered and reading frames.
    Open,
    /// Running close handlers and deregistering.
    Closing,
    /// Transport released.
    Closed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upgrading => write!(f, "upgrading"),
            Self::Open => write!(f, "open"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Why the read loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    CloseFrame,
    ReadError,
    WriteError,
    HandlerPanic,
}

/// Drives one connection from registration to transport release.
pub(crate) struct LifecycleLoop<T: Transport> {
    hub: Arc<EventHub>,
    connection: Arc<Connection>,
    transport: T,
    outbound: mpsc::Receiver<Frame>,
    state: LifecycleState,
}

impl<T: Transport> LifecycleLoop<T> {
    /// Creates a loop for a freshly upgraded transport.
    pub(crate) fn new(
        hub: Arc<EventHub>,
        connection: Arc<Connection>,
        transport: T,
        outbound: mpsc::Receiver<Frame>,
    ) -> Self {
        Self {
            hub,
            connection,
            transport,
            outbound,
            state: LifecycleState::Upgrading,
        }
    }

    /// Runs the connection to completion.
    ///
    /// A panicking handler ends the connection like any other exit: close
    /// handlers run, the connection is deregistered and the transport is
    /// closed. The panic is then resumed on the loop's task.
    pub(crate) async fn run(mut self) {
        let registration =
            Registration::acquire(Arc::clone(&self.hub), Arc::clone(&self.connection));
        self.transition(LifecycleState::Open);

        let served = AssertUnwindSafe(self.serve()).catch_unwind().await;
        let (exit, mut panicked) = match served {
            Ok(exit) => (exit, None),
            Err(payload) => {
                warn!(conn_id = %self.connection.id(), "Handler panicked, closing connection");
                (Exit::HandlerPanic, Some(payload))
            }
        };

        self.transition(LifecycleState::Closing);
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || drop(registration))) {
            warn!(conn_id = %self.connection.id(), "Close handler panicked");
            panicked = panicked.or(Some(payload));
        }

        if let Err(e) = self.transport.close().await {
            debug!(conn_id = %self.connection.id(), error = %e, "Transport close failed");
        }
        self.transition(LifecycleState::Closed);

        let lifetime = Utc::now() - self.connection.connected_at();
        info!(
            conn_id = %self.connection.id(),
            exit = ?exit,
            duration_ms = lifetime.num_milliseconds(),
            "Connection closed"
        );

        if let Some(payload) = panicked {
            panic::resume_unwind(payload);
        }
    }

    async fn serve(&mut self) -> Exit {
        if let Err(e) = self.hub.on_connection.dispatch(&self.connection) {
            self.report(HandlerKind::Connection, e);
        }
        self.read_loop().await
    }

    async fn read_loop(&mut self) -> Exit {
        loop {
            tokio::select! {
                result = self.transport.read_frame() => match result {
                    Ok(Frame::Close) => {
                        debug!(conn_id = %self.connection.id(), "Close frame received");
                        return Exit::CloseFrame;
                    }
                    Ok(frame) => {
                        self.hub.metrics.record_message();
                        let payload = frame.payload();
                        if let Err(e) = self.hub.on_message.dispatch(&self.connection, payload) {
                            self.report(HandlerKind::Message, e);
                        }
                    }
                    Err(e) => {
                        warn!(
                            conn_id = %self.connection.id(),
                            error = %e,
                            "Read failed, closing connection"
                        );
                        return Exit::ReadError;
                    }
                },
                Some(frame) = self.outbound.recv() => {
                    if let Err(e) = self.transport.write_frame(frame).await {
                        warn!(
                            conn_id = %self.connection.id(),
                            error = %e,
                            "Write failed, closing connection"
                        );
                        return Exit::WriteError;
                    }
                }
            }
        }
    }

    fn transition(&mut self, next: LifecycleState) {
        debug!(
            conn_id = %self.connection.id(),
            from = %self.state,
            to = %next,
            "Lifecycle transition"
        );
        self.state = next;
    }

    fn report(&self, kind: HandlerKind, error: DispatchError) {
        self.hub.metrics.record_dispatch_failures(error.len());
        warn!(
            conn_id = %self.connection.id(),
            event = %kind,
            failures = error.len(),
            error = %error,
            "Handlers reported errors"
        );
    }
}
