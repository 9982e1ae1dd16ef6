use crate::obs::sink::ExecKind;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::{collections::BTreeMap, sync::LazyLock};

///
/// EventState
/// Ephemeral, in-memory counters for repository operations.
///

#[derive(Clone, Debug, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub entities: BTreeMap<String, EntityCounters>,
    pub since: DateTime<Utc>,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            entities: BTreeMap::new(),
            since: Utc::now(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct EventOps {
    // Repository entrypoints
    pub insert_calls: u64,
    pub update_calls: u64,
    pub delete_calls: u64,
    pub hard_delete_calls: u64,
    pub recover_calls: u64,
    pub read_calls: u64,
    pub count_calls: u64,
    pub exists_calls: u64,
    pub ddl_calls: u64,

    // Rows touched
    pub rows_read: u64,
    pub rows_written: u64,

    // Audit trail
    pub audit_units: u64,
    pub audit_details: u64,

    // Rejections
    pub concurrency_conflicts: u64,
    pub reference_blocks: u64,

    // Mapping plans
    pub plans_built: u64,
}

impl EventOps {
    pub(crate) fn bump_calls(&mut self, kind: ExecKind) {
        let slot = match kind {
            ExecKind::Insert => &mut self.insert_calls,
            ExecKind::Update => &mut self.update_calls,
            ExecKind::Delete => &mut self.delete_calls,
            ExecKind::HardDelete => &mut self.hard_delete_calls,
            ExecKind::Recover => &mut self.recover_calls,
            ExecKind::Read => &mut self.read_calls,
            ExecKind::Count => &mut self.count_calls,
            ExecKind::Exists => &mut self.exists_calls,
            ExecKind::Ddl => &mut self.ddl_calls,
        };
        *slot = slot.saturating_add(1);
    }
}

///
/// EntityCounters
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct EntityCounters {
    pub write_calls: u64,
    pub read_calls: u64,
    pub rows_read: u64,
    pub rows_written: u64,
    pub audit_units: u64,
    pub concurrency_conflicts: u64,
    pub reference_blocks: u64,
}

impl EntityCounters {
    pub(crate) fn bump_calls(&mut self, kind: ExecKind) {
        if kind.is_write() {
            self.write_calls = self.write_calls.saturating_add(1);
        } else if matches!(kind, ExecKind::Read) {
            self.read_calls = self.read_calls.saturating_add(1);
        }
    }
}

static EVENT_STATE: LazyLock<Mutex<EventState>> =
    LazyLock::new(|| Mutex::new(EventState::default()));

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    f(&EVENT_STATE.lock())
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    f(&mut EVENT_STATE.lock())
}

/// Reset all counters and restart the window.
pub fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

///
/// EventReport
///

#[derive(Clone, Debug, Serialize)]
pub struct EventReport {
    /// Raw counters since `counters.since`.
    pub counters: EventState,
    /// Per-entity counters and averages.
    pub entity_counters: Vec<EntitySummary>,
}

///
/// EntitySummary
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct EntitySummary {
    pub entity: String,
    pub write_calls: u64,
    pub read_calls: u64,
    pub rows_read: u64,
    pub rows_written: u64,
    pub avg_rows_per_read: f64,
    pub audit_units: u64,
    pub concurrency_conflicts: u64,
    pub reference_blocks: u64,
}

/// Build a report from the in-memory counters, busiest entities first.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn report() -> EventReport {
    let snap = with_state(Clone::clone);

    let mut entity_counters: Vec<EntitySummary> = snap
        .entities
        .iter()
        .map(|(entity, c)| EntitySummary {
            entity: entity.clone(),
            write_calls: c.write_calls,
            read_calls: c.read_calls,
            rows_read: c.rows_read,
            rows_written: c.rows_written,
            avg_rows_per_read: if c.read_calls > 0 {
                c.rows_read as f64 / c.read_calls as f64
            } else {
                0.0
            },
            audit_units: c.audit_units,
            concurrency_conflicts: c.concurrency_conflicts,
            reference_blocks: c.reference_blocks,
        })
        .collect();

    entity_counters.sort_by(|a, b| {
        (b.read_calls + b.write_calls)
            .cmp(&(a.read_calls + a.write_calls))
            .then_with(|| a.entity.cmp(&b.entity))
    });

    EventReport {
        counters: snap,
        entity_counters,
    }
}
