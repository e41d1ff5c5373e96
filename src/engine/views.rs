use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::domain::{
    BillType, ComplianceStatus, Frequency, Period, PeriodStatus, PropertyId, Schedule, ScheduleId,
    ScheduleType,
};
use super::resolver::ReadinessVerdict;

/// Wire representation of a schedule definition with its dependency set
/// resolved to concrete ids.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleView {
    pub id: ScheduleId,
    pub property_id: PropertyId,
    pub schedule_type: ScheduleType,
    pub schedule_type_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_type: Option<BillType>,
    pub frequency: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_day_of_month: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_day_of_week: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_on: Option<NaiveDate>,
    /// Concrete dependency set, with an empty `depends_on` already expanded
    /// to every active bill input of the property.
    pub depends_on: Vec<ScheduleId>,
    pub wait_for_bills: bool,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_expected_date: Option<NaiveDate>,
}

impl Schedule {
    pub fn to_view(&self, resolved_depends_on: Vec<ScheduleId>) -> ScheduleView {
        let (expected_day_of_month, expected_day_of_week, expected_on) = match self.frequency {
            Frequency::Monthly { day_of_month } => (Some(day_of_month), None, None),
            Frequency::Weekly { weekday } => {
                (None, Some(weekday.num_days_from_sunday() as u8), None)
            }
            Frequency::Once { on } => (None, None, Some(on)),
        };

        ScheduleView {
            id: self.id.clone(),
            property_id: self.property_id.clone(),
            schedule_type: self.schedule_type,
            schedule_type_label: self.schedule_type.label(),
            bill_type: self.bill_type,
            frequency: self.frequency.label(),
            expected_day_of_month,
            expected_day_of_week,
            expected_on,
            depends_on: resolved_depends_on,
            wait_for_bills: self.wait_for_bills,
            is_active: self.is_active,
            next_expected_date: self.next_expected_date,
        }
    }
}

/// All schedules of one property plus the resolved adjacency, as served to
/// the dashboard configuration screen.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyScheduleBoard {
    pub property_id: PropertyId,
    pub schedules: Vec<ScheduleView>,
}

/// Per-period status row for the compliance dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodStatusView {
    pub schedule_id: ScheduleId,
    pub schedule_type: ScheduleType,
    pub schedule_type_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_type: Option<BillType>,
    pub period: Period,
    pub status: ComplianceStatus,
    pub status_label: &'static str,
    pub expected_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_late: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fulfilled_at: Option<NaiveDateTime>,
    /// Ids still holding this schedule back, for blocked outputs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocking_schedule_ids: Vec<ScheduleId>,
}

impl PeriodStatusView {
    pub fn from_status(
        schedule: &Schedule,
        status: PeriodStatus,
        blocking_schedule_ids: Vec<ScheduleId>,
    ) -> Self {
        Self {
            schedule_id: status.schedule_id,
            schedule_type: schedule.schedule_type,
            schedule_type_label: schedule.schedule_type.label(),
            bill_type: schedule.bill_type,
            period: status.period,
            status: status.status,
            status_label: status.status.label(),
            expected_date: status.expected_date,
            days_late: status.days_late,
            fulfilled_at: status.fulfilled_at,
            blocking_schedule_ids,
        }
    }
}

/// Go/no-go answer for the generation pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessView {
    pub schedule_id: ScheduleId,
    pub period: Period,
    pub ready: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocking_schedule_ids: Vec<ScheduleId>,
}

impl ReadinessView {
    pub fn from_verdict(schedule_id: ScheduleId, period: Period, verdict: ReadinessVerdict) -> Self {
        Self {
            schedule_id,
            period,
            ready: verdict.ready,
            blocking_schedule_ids: verdict.blocking_schedule_ids,
        }
    }
}
