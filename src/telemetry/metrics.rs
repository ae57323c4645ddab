//! Metrics
//!
//! Session metrics collection interfaces and implementations.

use std::collections::HashMap;
use std::sync::Mutex;

/// Counter names recorded by [`InMemoryMetrics`].
pub mod names {
    pub const REFRESH_EXCHANGES: &str = "refresh_exchanges";
    pub const REFRESH_SUCCESSES: &str = "refresh_successes";
    pub const REFRESH_FAILURES: &str = "refresh_failures";
    pub const QUEUED_CALLERS: &str = "queued_callers";
    pub const REPLAYS: &str = "replays";
    pub const STALE_TOKEN_REPLAYS: &str = "stale_token_replays";
    pub const TEARDOWNS: &str = "teardowns";
}

/// Session metrics interface.
pub trait SessionMetrics: Send + Sync {
    /// A refresh exchange was sent.
    fn record_refresh_exchange(&self);

    /// A refresh exchange settled.
    fn record_refresh_outcome(&self, success: bool);

    /// A caller was queued behind an in-flight refresh.
    fn record_queued_caller(&self);

    /// A call was re-issued with a new token.
    fn record_replay(&self, stale_token: bool);

    /// The session was torn down.
    fn record_teardown(&self, reason: &str);
}

/// No-op metrics implementation.
pub struct NoOpMetrics;

impl SessionMetrics for NoOpMetrics {
    fn record_refresh_exchange(&self) {}
    fn record_refresh_outcome(&self, _success: bool) {}
    fn record_queued_caller(&self) {}
    fn record_replay(&self, _stale_token: bool) {}
    fn record_teardown(&self, _reason: &str) {}
}

/// No-op metrics singleton.
pub fn no_op_metrics() -> NoOpMetrics {
    NoOpMetrics
}

/// In-memory counters for testing.
#[derive(Default)]
pub struct InMemoryMetrics {
    counters: Mutex<HashMap<String, u64>>,
}

impl InMemoryMetrics {
    /// Create new in-memory metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter.
    pub fn get(&self, name: &str) -> u64 {
        self.counters.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    /// Clear all counters.
    pub fn clear(&self) {
        self.counters.lock().unwrap().clear();
    }

    fn increment(&self, name: &str) {
        *self
            .counters
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_insert(0) += 1;
    }
}

impl SessionMetrics for InMemoryMetrics {
    fn record_refresh_exchange(&self) {
        self.increment(names::REFRESH_EXCHANGES);
    }

    fn record_refresh_outcome(&self, success: bool) {
        if success {
            self.increment(names::REFRESH_SUCCESSES);
        } else {
            self.increment(names::REFRESH_FAILURES);
        }
    }

    fn record_queued_caller(&self) {
        self.increment(names::QUEUED_CALLERS);
    }

    fn record_replay(&self, stale_token: bool) {
        self.increment(names::REPLAYS);
        if stale_token {
            self.increment(names::STALE_TOKEN_REPLAYS);
        }
    }

    fn record_teardown(&self, reason: &str) {
        self.increment(names::TEARDOWNS);
        self.increment(&format!("{}.{}", names::TEARDOWNS, reason));
    }
}

/// Create in-memory metrics.
pub fn create_in_memory_metrics() -> InMemoryMetrics {
    InMemoryMetrics::new()
}
