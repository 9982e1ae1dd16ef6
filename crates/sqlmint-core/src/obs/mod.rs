//! Observability: runtime telemetry (metrics) and sink abstractions.
//!
//! Statement-level logging goes through `tracing`; counters go through the
//! sink so tests can observe them without touching global state.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EntityCounters, EntitySummary, EventOps, EventReport, EventState};
pub use sink::{
    ExecKind, MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink,
};
