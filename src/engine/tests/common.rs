use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use crate::engine::domain::{
    BillType, Frequency, FrequencyKind, FulfillmentEvent, Period, PropertyId, Schedule,
    ScheduleDraft, ScheduleId, ScheduleType,
};
use crate::engine::evaluator::EnginePolicy;
use crate::engine::memory::{MemoryFulfillments, MemorySchedules};
use crate::engine::registry::{DeletionPolicy, ScheduleRegistry};
use crate::engine::router::engine_router;
use crate::engine::service::ComplianceService;

pub(super) fn property() -> PropertyId {
    PropertyId("prop-051".to_string())
}

pub(super) fn other_property() -> PropertyId {
    PropertyId("prop-207".to_string())
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn timestamp(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    date(year, month, day)
        .and_hms_opt(hour, 0, 0)
        .expect("valid timestamp")
}

pub(super) fn march() -> Period {
    Period {
        year: 2026,
        month: 3,
    }
}

pub(super) fn bill_draft(property_id: &PropertyId, bill_type: BillType, day: u8) -> ScheduleDraft {
    ScheduleDraft {
        property_id: property_id.clone(),
        schedule_type: ScheduleType::BillInput,
        bill_type: Some(bill_type),
        frequency: FrequencyKind::Monthly,
        expected_day_of_month: Some(day),
        expected_day_of_week: None,
        expected_on: None,
        depends_on: Vec::new(),
        wait_for_bills: false,
        is_active: true,
    }
}

pub(super) fn output_draft(
    property_id: &PropertyId,
    schedule_type: ScheduleType,
    day: u8,
    depends_on: Vec<ScheduleId>,
    wait_for_bills: bool,
) -> ScheduleDraft {
    ScheduleDraft {
        property_id: property_id.clone(),
        schedule_type,
        bill_type: None,
        frequency: FrequencyKind::Monthly,
        expected_day_of_month: Some(day),
        expected_day_of_week: None,
        expected_on: None,
        depends_on,
        wait_for_bills,
        is_active: true,
    }
}

pub(super) fn event(
    schedule_id: &ScheduleId,
    period: Period,
    fulfilled_at: NaiveDateTime,
) -> FulfillmentEvent {
    FulfillmentEvent {
        schedule_id: schedule_id.clone(),
        period,
        fulfilled_at,
    }
}

/// Hand-built schedule for the pure evaluator and resolver tests that do
/// not need the registry's validation pass.
pub(super) fn input_schedule(id: &str, day_of_month: u8) -> Schedule {
    Schedule {
        id: ScheduleId(id.to_string()),
        property_id: property(),
        schedule_type: ScheduleType::BillInput,
        bill_type: Some(BillType::Municipality),
        frequency: Frequency::Monthly { day_of_month },
        depends_on: BTreeSet::new(),
        wait_for_bills: false,
        is_active: true,
        next_expected_date: None,
    }
}

pub(super) fn output_schedule(
    id: &str,
    day_of_month: u8,
    depends_on: &[&str],
    wait_for_bills: bool,
) -> Schedule {
    Schedule {
        id: ScheduleId(id.to_string()),
        property_id: property(),
        schedule_type: ScheduleType::InvoiceOutput,
        bill_type: None,
        frequency: Frequency::Monthly { day_of_month },
        depends_on: depends_on
            .iter()
            .map(|dep| ScheduleId(dep.to_string()))
            .collect(),
        wait_for_bills,
        is_active: true,
        next_expected_date: None,
    }
}

pub(super) struct EngineHarness {
    pub(super) registry: ScheduleRegistry<MemorySchedules>,
    pub(super) service: ComplianceService<MemorySchedules, MemoryFulfillments>,
}

pub(super) fn harness() -> EngineHarness {
    harness_with(DeletionPolicy::Restrict, EnginePolicy::default())
}

pub(super) fn harness_with(deletion: DeletionPolicy, policy: EnginePolicy) -> EngineHarness {
    let schedules = Arc::new(MemorySchedules::default());
    let fulfillments = Arc::new(MemoryFulfillments::default());
    let registry = ScheduleRegistry::new(schedules.clone(), deletion);
    let service = ComplianceService::new(schedules, fulfillments, policy);
    EngineHarness { registry, service }
}

pub(super) fn engine_router_with_harness() -> axum::Router {
    let schedules = Arc::new(MemorySchedules::default());
    let fulfillments = Arc::new(MemoryFulfillments::default());
    let registry = Arc::new(ScheduleRegistry::new(
        schedules.clone(),
        DeletionPolicy::Restrict,
    ));
    let service = Arc::new(ComplianceService::new(
        schedules,
        fulfillments,
        EnginePolicy::default(),
    ));
    engine_router(registry, service)
}

pub(super) async fn read_json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
