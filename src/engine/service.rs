use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;

use super::domain::{
    ComplianceStatus, FulfillmentEvent, Period, PeriodStatus, PropertyId, Schedule, ScheduleId,
};
use super::evaluator::{ComplianceEvaluator, EnginePolicy};
use super::repository::{FulfillmentStore, RepositoryError, ScheduleRepository};
use super::resolver::{self, ReadinessVerdict};
use super::views::{PeriodStatusView, ReadinessView};

/// Service folding schedule definitions, fulfillment events, and dependency
/// verdicts into per-period compliance answers for the dashboard and the
/// generation pipeline.
///
/// The service holds no mutable state of its own: every answer is derived
/// from one repository snapshot per call, so concurrent reads across
/// schedules, properties, and periods need no coordination.
pub struct ComplianceService<R, F> {
    schedules: Arc<R>,
    fulfillments: Arc<F>,
    evaluator: ComplianceEvaluator,
}

impl<R, F> ComplianceService<R, F>
where
    R: ScheduleRepository + 'static,
    F: FulfillmentStore + 'static,
{
    pub fn new(schedules: Arc<R>, fulfillments: Arc<F>, policy: EnginePolicy) -> Self {
        Self {
            schedules,
            fulfillments,
            evaluator: ComplianceEvaluator::new(policy),
        }
    }

    /// Record (or overwrite) the fulfillment signal for one schedule and
    /// period. Events for unregistered schedules are rejected so a
    /// misrouted pipeline push cannot create orphan rows.
    pub fn record_fulfillment(&self, event: FulfillmentEvent) -> Result<(), ServiceError> {
        if self.schedules.fetch(&event.schedule_id)?.is_none() {
            return Err(ServiceError::UnknownSchedule(event.schedule_id));
        }
        self.fulfillments.record(event)?;
        Ok(())
    }

    /// Per-schedule statuses of one property for one period, evaluated
    /// against a single snapshot of the property's schedules: bill inputs
    /// first, then outputs against those same input statuses, so an output
    /// never observes a mix of periods or a half-updated graph.
    pub fn status_for_property(
        &self,
        property_id: &PropertyId,
        period: Period,
        today: NaiveDate,
    ) -> Result<Vec<PeriodStatusView>, ServiceError> {
        let snapshot = self.property_snapshot(property_id, period)?;
        let mut input_statuses: BTreeMap<ScheduleId, ComplianceStatus> = BTreeMap::new();
        let mut views = Vec::with_capacity(snapshot.len());

        for schedule in snapshot.iter().filter(|schedule| !schedule.is_output()) {
            let status = self.evaluate_ungated(schedule, period, today)?;
            input_statuses.insert(schedule.id.clone(), status.status);
            views.push(PeriodStatusView::from_status(schedule, status, Vec::new()));
        }

        for schedule in snapshot.iter().filter(|schedule| schedule.is_output()) {
            let dependencies = resolver::resolve_dependencies(schedule, &snapshot);
            let verdict = resolver::readiness(schedule, &dependencies, &input_statuses);
            let fulfillment = self.fulfillments.fetch(&schedule.id, period)?;
            let status = self.evaluator.evaluate(
                schedule,
                period,
                fulfillment.as_ref(),
                Some(&verdict),
                today,
            );
            let blocking = if status.status == ComplianceStatus::Blocked {
                verdict.blocking_schedule_ids
            } else {
                Vec::new()
            };
            views.push(PeriodStatusView::from_status(schedule, status, blocking));
        }

        Ok(views)
    }

    /// Late-or-missed totals for a batch of properties, for the portfolio
    /// overview. One snapshot per property, no per-schedule round trips
    /// from the caller's side.
    pub fn late_or_missed_counts(
        &self,
        property_ids: &[PropertyId],
        period: Period,
        today: NaiveDate,
    ) -> Result<BTreeMap<PropertyId, usize>, ServiceError> {
        let mut counts = BTreeMap::new();
        for property_id in property_ids {
            let late_or_missed = self
                .status_for_property(property_id, period, today)?
                .into_iter()
                .filter(|view| {
                    matches!(
                        view.status,
                        ComplianceStatus::Late | ComplianceStatus::Missed
                    )
                })
                .count();
            counts.insert(property_id.clone(), late_or_missed);
        }
        Ok(counts)
    }

    /// The gating call the generation pipeline makes before producing an
    /// invoice or payable artifact. Unknown ids are an error; the caller
    /// treats that as not ready.
    pub fn is_ready_to_generate(
        &self,
        schedule_id: &ScheduleId,
        period: Period,
        today: NaiveDate,
    ) -> Result<ReadinessView, ServiceError> {
        let schedule = self
            .schedules
            .fetch(schedule_id)?
            .ok_or_else(|| ServiceError::UnknownSchedule(schedule_id.clone()))?;

        let verdict = self.readiness_verdict(&schedule, period, today)?;
        Ok(ReadinessView::from_verdict(
            schedule_id.clone(),
            period,
            verdict,
        ))
    }

    /// Current status of a single schedule for one period, dependency gate
    /// included when it is a gated output.
    pub fn status_for_schedule(
        &self,
        schedule_id: &ScheduleId,
        period: Period,
        today: NaiveDate,
    ) -> Result<PeriodStatus, ServiceError> {
        let schedule = self
            .schedules
            .fetch(schedule_id)?
            .ok_or_else(|| ServiceError::UnknownSchedule(schedule_id.clone()))?;

        if !schedule.is_output() {
            return self.evaluate_ungated(&schedule, period, today);
        }

        let verdict = self.readiness_verdict(&schedule, period, today)?;
        let fulfillment = self.fulfillments.fetch(&schedule.id, period)?;
        Ok(self.evaluator.evaluate(
            &schedule,
            period,
            fulfillment.as_ref(),
            Some(&verdict),
            today,
        ))
    }

    fn readiness_verdict(
        &self,
        schedule: &Schedule,
        period: Period,
        today: NaiveDate,
    ) -> Result<ReadinessVerdict, ServiceError> {
        if !schedule.is_gated() {
            return Ok(ReadinessVerdict::ready());
        }

        let snapshot = self.property_snapshot(&schedule.property_id, period)?;
        let dependencies = resolver::resolve_dependencies(schedule, &snapshot);

        let mut statuses: BTreeMap<ScheduleId, ComplianceStatus> = BTreeMap::new();
        for dependency in &dependencies {
            if let Some(input) = snapshot.iter().find(|sibling| &sibling.id == dependency) {
                let status = self.evaluate_ungated(input, period, today)?;
                statuses.insert(dependency.clone(), status.status);
            }
        }

        Ok(resolver::readiness(schedule, &dependencies, &statuses))
    }

    /// Active schedules of the property that produce an occurrence in the
    /// period, ordered for deterministic evaluation.
    fn property_snapshot(
        &self,
        property_id: &PropertyId,
        period: Period,
    ) -> Result<Vec<Schedule>, ServiceError> {
        let mut snapshot: Vec<Schedule> = self
            .schedules
            .list_by_property(property_id)?
            .into_iter()
            .filter(|schedule| schedule.is_active && schedule.applies_to(period))
            .collect();
        snapshot.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(snapshot)
    }

    fn evaluate_ungated(
        &self,
        schedule: &Schedule,
        period: Period,
        today: NaiveDate,
    ) -> Result<PeriodStatus, ServiceError> {
        let fulfillment = self.fulfillments.fetch(&schedule.id, period)?;
        Ok(self
            .evaluator
            .evaluate(schedule, period, fulfillment.as_ref(), None, today))
    }
}

/// Error raised by the compliance service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("schedule {0} is not registered")]
    UnknownSchedule(ScheduleId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
