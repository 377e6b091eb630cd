//! Handler registries and the dispatch protocol.
//!
//! Dispatch calls every handler in insertion order on the calling task and
//! never stops early. Failures are collected and returned together.
//!
//! The registry's read lock is held for the whole dispatch. A handler must
//! not register or unregister handlers of its own kind from inside its
//! callback, and must not block indefinitely; either stalls registration
//! and, with a writer queued, other dispatches of that kind.

use std::fmt;

use wsgate_core::error::AppError;
use wsgate_core::result::AppResult;
use wsgate_core::types::id::HandlerId;

use crate::connection::Connection;
use crate::registry::Registry;

use super::{ConnectionCallback, Handler, MessageCallback};

/// One handler's failure during a dispatch.
#[derive(Debug)]
pub struct HandlerFailure {
    /// The handler that failed.
    pub handler_id: HandlerId,
    /// What it returned.
    pub error: AppError,
}

/// Every failure from one dispatch, in call order.
#[derive(Debug, thiserror::Error)]
#[error("{}", join_messages(.failures))]
pub struct DispatchError {
    failures: Vec<HandlerFailure>,
}

impl DispatchError {
    /// Individual failures in the order the handlers were called.
    pub fn failures(&self) -> &[HandlerFailure] {
        &self.failures
    }

    /// Number of handlers that failed.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Always `false`; a dispatch error has at least one failure.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

fn join_messages(failures: &[HandlerFailure]) -> String {
    failures
        .iter()
        .map(|f| f.error.to_string())
        .collect::<Vec<_>>()
        .join(",\n")
}

/// Ordered set of handlers sharing one callback signature.
pub struct HandlerRegistry<F: ?Sized> {
    handlers: Registry<Handler<F>>,
}

impl<F: ?Sized> HandlerRegistry<F> {
    /// Creates an empty handler registry.
    pub fn new() -> Self {
        Self {
            handlers: Registry::new(),
        }
    }

    /// Appends a handler; it runs after every handler already present.
    pub fn add(&self, handler: Handler<F>) -> Handler<F> {
        self.handlers.add(handler)
    }

    /// Removes a handler, matched by id.
    pub fn remove(&self, handler: &Handler<F>) -> bool {
        self.handlers.remove(handler)
    }

    /// Removes the handler with the given id.
    pub fn remove_id(&self, id: &HandlerId) -> bool {
        self.handlers.remove_id(id)
    }

    /// Number of registered handlers.
    pub fn count(&self) -> usize {
        self.handlers.count()
    }

    /// Invokes `invoke` once per handler, in insertion order, collecting
    /// every error.
    pub fn dispatch_with<I>(&self, mut invoke: I) -> Result<(), DispatchError>
    where
        I: FnMut(&F) -> AppResult<()>,
    {
        let handlers = self.handlers.read();
        let failures: Vec<HandlerFailure> = handlers
            .iter()
            .filter_map(|handler| {
                invoke(handler.callback())
                    .err()
                    .map(|error| HandlerFailure {
                        handler_id: handler.id(),
                        error,
                    })
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DispatchError { failures })
        }
    }
}

impl HandlerRegistry<ConnectionCallback> {
    /// Delivers a connection-opened or connection-closed event.
    pub fn dispatch(&self, connection: &Connection) -> Result<(), DispatchError> {
        self.dispatch_with(|callback| callback(connection))
    }
}

impl HandlerRegistry<MessageCallback> {
    /// Delivers a message payload.
    pub fn dispatch(&self, connection: &Connection, payload: &[u8]) -> Result<(), DispatchError> {
        self.dispatch_with(|callback| callback(connection, payload))
    }
}

impl<F: ?Sized> Default for HandlerRegistry<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> fmt::Debug for HandlerRegistry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("count", &self.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use wsgate_core::types::id::SequentialIds;

    use super::*;
    use crate::testing::test_connection;

    type Calls = Arc<Mutex<Vec<&'static str>>>;

    fn message_handler(
        ids: &SequentialIds,
        calls: &Calls,
        name: &'static str,
        fail: bool,
    ) -> Handler<MessageCallback> {
        let calls = Arc::clone(calls);
        let callback = move |_: &Connection, _: &[u8]| {
            calls.lock().unwrap().push(name);
            if fail {
                Err(AppError::handler(format!("{name} failed")))
            } else {
                Ok(())
            }
        };
        Handler::new(HandlerId::generate(ids), Arc::new(callback) as Arc<MessageCallback>)
    }

    #[test]
    fn test_add_remove_count() {
        let ids = SequentialIds::new();
        let calls = Calls::default();
        let registry = HandlerRegistry::<MessageCallback>::new();

        let h1 = registry.add(message_handler(&ids, &calls, "h1", false));
        assert_eq!(registry.count(), 1);
        let h2 = registry.add(message_handler(&ids, &calls, "h2", false));
        assert_eq!(registry.count(), 2);

        assert!(registry.remove(&h1));
        assert_eq!(registry.count(), 1);
        assert!(registry.remove_id(&h2.id()));
        assert_eq!(registry.count(), 0);
        assert!(!registry.remove(&h2));
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let ids = SequentialIds::new();
        let calls = Calls::default();
        let registry = HandlerRegistry::<MessageCallback>::new();
        registry.add(message_handler(&ids, &calls, "h1", false));
        registry.add(message_handler(&ids, &calls, "h2", false));
        registry.add(message_handler(&ids, &calls, "h3", false));

        let (connection, _outbound) = test_connection();
        registry.dispatch(&connection, b"message").expect("no failures");

        assert_eq!(*calls.lock().unwrap(), vec!["h1", "h2", "h3"]);
    }

    #[test]
    fn test_removed_handler_skipped_and_order_kept() {
        let ids = SequentialIds::new();
        let calls = Calls::default();
        let registry = HandlerRegistry::<MessageCallback>::new();
        registry.add(message_handler(&ids, &calls, "h1", false));
        let h2 = registry.add(message_handler(&ids, &calls, "h2", false));
        registry.add(message_handler(&ids, &calls, "h3", false));

        registry.remove(&h2);
        let (connection, _outbound) = test_connection();
        registry.dispatch(&connection, b"x").expect("no failures");

        assert_eq!(*calls.lock().unwrap(), vec!["h1", "h3"]);
    }

    #[test]
    fn test_dispatch_does_not_short_circuit() {
        let ids = SequentialIds::new();
        let calls = Calls::default();
        let registry = HandlerRegistry::<MessageCallback>::new();
        let h1 = registry.add(message_handler(&ids, &calls, "h1", true));
        registry.add(message_handler(&ids, &calls, "h2", false));
        let h3 = registry.add(message_handler(&ids, &calls, "h3", true));

        let (connection, _outbound) = test_connection();
        let err = registry
            .dispatch(&connection, b"x")
            .expect_err("two handlers fail");

        assert_eq!(*calls.lock().unwrap(), vec!["h1", "h2", "h3"]);
        assert_eq!(err.len(), 2);
        assert_eq!(err.failures()[0].handler_id, h1.id());
        assert_eq!(err.failures()[1].handler_id, h3.id());
        assert_eq!(err.to_string(), "HANDLER: h1 failed,\nHANDLER: h3 failed");
    }

    #[test]
    fn test_connection_dispatch_passes_connection() {
        let ids = SequentialIds::new();
        let registry = HandlerRegistry::<ConnectionCallback>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let callback = move |connection: &Connection| {
            sink.lock().unwrap().push(connection.id());
            Ok(())
        };
        registry.add(Handler::new(
            HandlerId::generate(&ids),
            Arc::new(callback) as Arc<ConnectionCallback>,
        ));

        let (connection, _outbound) = test_connection();
        registry.dispatch(&connection).expect("no failures");

        assert_eq!(*seen.lock().unwrap(), vec![connection.id()]);
    }

    #[test]
    fn test_empty_registry_dispatch_succeeds() {
        let registry = HandlerRegistry::<ConnectionCallback>::new();
        let (connection, _outbound) = test_connection();
        assert!(registry.dispatch(&connection).is_ok());
    }
}
