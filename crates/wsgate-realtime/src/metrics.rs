//! Gateway metrics counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Connection and dispatch counters.
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    /// Total connections established
    connections_total: AtomicU64,
    /// Connections currently registered
    connections_active: AtomicU64,
    /// Text and binary frames received
    messages_received: AtomicU64,
    /// Handshakes that failed before a connection existed
    handshake_failures: AtomicU64,
    /// Individual handler failures across all dispatches
    dispatch_failures: AtomicU64,
}

impl GatewayMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a registered connection
    pub fn record_connect(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a deregistered connection
    pub fn record_disconnect(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record an inbound message
    pub fn record_message(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed handshake
    pub fn record_handshake_failure(&self) {
        self.handshake_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record `count` handler failures from one dispatch
    pub fn record_dispatch_failures(&self, count: usize) {
        self.dispatch_failures.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            handshake_failures: self.handshake_failures.load(Ordering::Relaxed),
            dispatch_failures: self.dispatch_failures.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total connections ever established
    pub connections_total: u64,
    /// Currently registered connections
    pub connections_active: u64,
    /// Total text and binary frames received
    pub messages_received: u64,
    /// Total failed handshakes
    pub handshake_failures: u64,
    /// Total individual handler failures
    pub dispatch_failures: u64,
}
