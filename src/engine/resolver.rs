//! Dependency readiness for output schedules.
//!
//! The dependency graph is bipartite: edges only run from output schedules
//! to bill inputs, so there is nothing to topologically sort. The resolver
//! expands the configured dependency set against a snapshot of the
//! property's schedules and folds the inputs' period statuses into a single
//! go/no-go verdict.

use std::collections::BTreeMap;

use serde::Serialize;

use super::domain::{ComplianceStatus, Schedule, ScheduleId, ScheduleType};

/// Answer handed to the generation pipeline and the dashboard. `ready`
/// means every concrete dependency's bill has actually arrived for the
/// period; ids still in the way are listed for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessVerdict {
    pub ready: bool,
    pub blocking_schedule_ids: Vec<ScheduleId>,
}

impl ReadinessVerdict {
    pub fn ready() -> Self {
        Self {
            ready: true,
            blocking_schedule_ids: Vec::new(),
        }
    }

    pub fn blocked_on(blocking_schedule_ids: Vec<ScheduleId>) -> Self {
        Self {
            ready: blocking_schedule_ids.is_empty(),
            blocking_schedule_ids,
        }
    }
}

/// Expand an output schedule's dependency set against a snapshot of its
/// property's schedules. An explicit set (validated at write time) keeps the
/// ids that are present in the snapshot; an empty set means every active
/// bill input in the snapshot. Callers choose the snapshot: the registry
/// passes the full property list, the evaluator passes only the schedules
/// in play for the period under evaluation.
pub fn resolve_dependencies(output: &Schedule, siblings: &[Schedule]) -> Vec<ScheduleId> {
    if !output.depends_on.is_empty() {
        return siblings
            .iter()
            .filter(|sibling| output.depends_on.contains(&sibling.id))
            .map(|sibling| sibling.id.clone())
            .collect();
    }

    siblings
        .iter()
        .filter(|sibling| {
            sibling.schedule_type == ScheduleType::BillInput
                && sibling.is_active
                && sibling.id != output.id
        })
        .map(|sibling| sibling.id.clone())
        .collect()
}

/// Fold dependency statuses for one period into a readiness verdict.
///
/// A dependency counts only once its bill arrived (`on_time` or `late`).
/// `pending` and `blocked` keep the output waiting, and so does `missed`:
/// a bill that never came does not silently unblock the work that needs it.
/// Dependencies with no status row yet are pending by definition.
pub fn readiness(
    output: &Schedule,
    dependencies: &[ScheduleId],
    statuses: &BTreeMap<ScheduleId, ComplianceStatus>,
) -> ReadinessVerdict {
    if !output.is_gated() {
        return ReadinessVerdict::ready();
    }

    let blocking: Vec<ScheduleId> = dependencies
        .iter()
        .filter(|id| {
            !statuses
                .get(*id)
                .copied()
                .unwrap_or(ComplianceStatus::Pending)
                .satisfies_dependency()
        })
        .cloned()
        .collect();

    ReadinessVerdict::blocked_on(blocking)
}
