//! Scoped registration of a connection.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::connection::Connection;
use crate::hub::EventHub;

/// Holds a connection's place in the connection registry.
///
/// Acquiring adds the connection. Dropping runs the close handlers and then
/// removes it. The removal runs even when a close handler panics, so the
/// connection leaves the registry exactly once on every exit.
pub(crate) struct Registration {
    hub: Arc<EventHub>,
    connection: Arc<Connection>,
}

impl Registration {
    /// Registers the connection.
    pub(crate) fn acquire(hub: Arc<EventHub>, connection: Arc<Connection>) -> Self {
        hub.connections.add(Arc::clone(&connection));
        hub.metrics.record_connect();
        Self { hub, connection }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let _deregistration = Deregistration {
            hub: &self.hub,
            connection: &self.connection,
        };

        if let Err(e) = self.hub.on_close.dispatch(&self.connection) {
            self.hub.metrics.record_dispatch_failures(e.len());
            warn!(
                conn_id = %self.connection.id(),
                failures = e.len(),
                error = %e,
                "Close handlers reported errors"
            );
        }
    }
}

/// Removes the connection when dropped, after the close handlers or while
/// unwinding out of them.
struct Deregistration<'a> {
    hub: &'a EventHub,
    connection: &'a Arc<Connection>,
}

impl Drop for Deregistration<'_> {
    fn drop(&mut self) {
        if self.hub.connections.remove(self.connection) {
            self.hub.metrics.record_disconnect();
        }

        debug!(
            conn_id = %self.connection.id(),
            remaining = self.hub.connections.count(),
            "Connection deregistered"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use wsgate_core::result::AppResult;
    use wsgate_core::types::id::{HandlerId, SequentialIds};

    use super::*;
    use crate::handler::{ConnectionCallback, Handler};
    use crate::testing::test_connection;

    fn close_handler(
        hub: &EventHub,
        ids: &SequentialIds,
        callback: impl Fn(&Connection) -> AppResult<()> + Send + Sync + 'static,
    ) {
        hub.on_close.add(Handler::new(
            HandlerId::generate(ids),
            Arc::new(callback) as Arc<ConnectionCallback>,
        ));
    }

    #[test]
    fn test_drop_runs_close_handlers_then_removes() {
        let hub = Arc::new(EventHub::new());
        let ids = SequentialIds::new();
        let (connection, _outbound) = test_connection();
        let connection = Arc::new(connection);

        let registered_during_close = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&registered_during_close);
        let observer = Arc::clone(&hub);
        close_handler(&hub, &ids, move |_| {
            seen.store(observer.connections.count(), Ordering::SeqCst);
            Ok(())
        });

        let registration = Registration::acquire(Arc::clone(&hub), connection);
        assert_eq!(hub.connections.count(), 1);
        drop(registration);

        assert_eq!(registered_during_close.load(Ordering::SeqCst), 1);
        assert_eq!(hub.connections.count(), 0);
    }

    #[test]
    fn test_panicking_close_handler_still_deregisters() {
        let hub = Arc::new(EventHub::new());
        let ids = SequentialIds::new();
        let (connection, _outbound) = test_connection();

        close_handler(&hub, &ids, |_| panic!("close handler blew up"));

        let registration = Registration::acquire(Arc::clone(&hub), Arc::new(connection));
        let result = panic::catch_unwind(AssertUnwindSafe(move || drop(registration)));

        assert!(result.is_err());
        assert_eq!(hub.connections.count(), 0);
        let metrics = hub.metrics.snapshot();
        assert_eq!(metrics.connections_total, 1);
        assert_eq!(metrics.connections_active, 0);
    }
}
