//! Metrics sink boundary.
//!
//! Repository and cache code MUST NOT touch obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
use crate::obs::metrics;
use derive_more::Display;
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = RefCell::new(None);
}

///
/// ExecKind
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum ExecKind {
    Insert,
    Update,
    Delete,
    HardDelete,
    Recover,
    Read,
    Count,
    Exists,
    Ddl,
}

impl ExecKind {
    /// Whether this kind writes rows.
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(
            self,
            Self::Insert | Self::Update | Self::Delete | Self::HardDelete | Self::Recover
        )
    }
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    ExecStart {
        kind: ExecKind,
        entity: &'static str,
    },
    ExecFinish {
        kind: ExecKind,
        entity: &'static str,
        rows: u64,
    },
    AuditWritten {
        entity: &'static str,
        details: u64,
    },
    ConcurrencyConflict {
        entity: &'static str,
    },
    ReferenceBlocked {
        entity: &'static str,
    },
    CacheBuild {
        entity: &'static str,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default sink that writes into the process-wide counters.
/// Used whenever no scoped override is installed on this thread.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::ExecStart { kind, entity } => {
                metrics::with_state_mut(|m| {
                    m.ops.bump_calls(kind);
                    m.entities.entry(entity.to_string()).or_default().bump_calls(kind);
                });
            }

            MetricsEvent::ExecFinish { kind, entity, rows } => {
                metrics::with_state_mut(|m| {
                    let entry = m.entities.entry(entity.to_string()).or_default();
                    if kind.is_write() {
                        m.ops.rows_written = m.ops.rows_written.saturating_add(rows);
                        entry.rows_written = entry.rows_written.saturating_add(rows);
                    } else if kind == ExecKind::Read {
                        m.ops.rows_read = m.ops.rows_read.saturating_add(rows);
                        entry.rows_read = entry.rows_read.saturating_add(rows);
                    }
                });
            }

            MetricsEvent::AuditWritten { entity, details } => {
                metrics::with_state_mut(|m| {
                    m.ops.audit_units = m.ops.audit_units.saturating_add(1);
                    m.ops.audit_details = m.ops.audit_details.saturating_add(details);
                    let entry = m.entities.entry(entity.to_string()).or_default();
                    entry.audit_units = entry.audit_units.saturating_add(1);
                });
            }

            MetricsEvent::ConcurrencyConflict { entity } => {
                metrics::with_state_mut(|m| {
                    m.ops.concurrency_conflicts = m.ops.concurrency_conflicts.saturating_add(1);
                    let entry = m.entities.entry(entity.to_string()).or_default();
                    entry.concurrency_conflicts = entry.concurrency_conflicts.saturating_add(1);
                });
            }

            MetricsEvent::ReferenceBlocked { entity } => {
                metrics::with_state_mut(|m| {
                    m.ops.reference_blocks = m.ops.reference_blocks.saturating_add(1);
                    let entry = m.entities.entry(entity.to_string()).or_default();
                    entry.reference_blocks = entry.reference_blocks.saturating_add(1);
                });
            }

            MetricsEvent::CacheBuild { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.plans_built = m.ops.plans_built.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) fn record(event: MetricsEvent) {
    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());

    match sink {
        Some(sink) => sink.record(event),
        None => GlobalMetricsSink.record(event),
    }
}

/// Snapshot the current process-wide metrics.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all process-wide counters.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with events on this thread routed to `sink` instead of the
/// process-wide counters. The previous sink is restored on exit, including
/// unwind.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let previous = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = previous;
            });
        }
    }

    let previous = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(previous);

    f()
}

/// Span
/// RAII guard that emits start/finish events for one repository call.
/// Finish accounting happens even when the call errors out.

pub(crate) struct Span {
    kind: ExecKind,
    entity: &'static str,
    rows: u64,
}

impl Span {
    #[must_use]
    pub(crate) fn new(kind: ExecKind, entity: &'static str) -> Self {
        record(MetricsEvent::ExecStart { kind, entity });

        Self {
            kind,
            entity,
            rows: 0,
        }
    }

    pub(crate) const fn set_rows(&mut self, rows: u64) {
        self.rows = rows;
    }

    pub(crate) const fn add_rows(&mut self, rows: u64) {
        self.rows = self.rows.saturating_add(rows);
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        record(MetricsEvent::ExecFinish {
            kind: self.kind,
            entity: self.entity,
            rows: self.rows,
        });
    }
}
