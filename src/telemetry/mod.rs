//! Telemetry
//!
//! Session metrics. Logging goes through `tracing`; the host installs the
//! subscriber.

pub mod metrics;

pub use metrics::{
    create_in_memory_metrics, names as metric_names, no_op_metrics, InMemoryMetrics, NoOpMetrics,
    SessionMetrics,
};
