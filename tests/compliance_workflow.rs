//! Integration specifications for the billing compliance workflow.
//!
//! Scenarios run end-to-end through the public registry, service, and HTTP
//! router so schedule validation, dependency gating, and status evaluation
//! are exercised without reaching into private modules.

mod common {
    use std::sync::Arc;

    use chrono::{NaiveDate, NaiveDateTime};

    use billing_engine::engine::{
        BillType, ComplianceService, DeletionPolicy, EnginePolicy, FrequencyKind,
        FulfillmentEvent, MemoryFulfillments, MemorySchedules, Period, PropertyId,
        ScheduleDraft, ScheduleId, ScheduleRegistry, ScheduleType,
    };

    pub(super) type Registry = ScheduleRegistry<MemorySchedules>;
    pub(super) type Service = ComplianceService<MemorySchedules, MemoryFulfillments>;

    pub(super) fn property() -> PropertyId {
        PropertyId("prop-riverbend".to_string())
    }

    pub(super) fn march() -> Period {
        Period {
            year: 2026,
            month: 3,
        }
    }

    pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    pub(super) fn timestamp(year: i32, month: u32, day: u32) -> NaiveDateTime {
        date(year, month, day)
            .and_hms_opt(9, 30, 0)
            .expect("valid timestamp")
    }

    pub(super) fn bill_draft(bill_type: BillType, day: u8) -> ScheduleDraft {
        ScheduleDraft {
            property_id: property(),
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

    pub(super) fn invoice_draft(day: u8, depends_on: Vec<ScheduleId>) -> ScheduleDraft {
        ScheduleDraft {
            property_id: property(),
            schedule_type: ScheduleType::InvoiceOutput,
            bill_type: None,
            frequency: FrequencyKind::Monthly,
            expected_day_of_month: Some(day),
            expected_day_of_week: None,
            expected_on: None,
            depends_on,
            wait_for_bills: true,
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

    pub(super) fn build_engine() -> (Registry, Service) {
        let schedules = Arc::new(MemorySchedules::default());
        let fulfillments = Arc::new(MemoryFulfillments::default());
        let registry = ScheduleRegistry::new(schedules.clone(), DeletionPolicy::Restrict);
        let service = ComplianceService::new(schedules, fulfillments, EnginePolicy::default());
        (registry, service)
    }
}

mod gating {
    use super::common::*;
    use billing_engine::engine::{BillType, ComplianceStatus};

    #[test]
    fn bill_missed_without_event_once_the_day_passes() {
        let (registry, service) = build_engine();
        registry
            .create(bill_draft(BillType::Municipality, 5), date(2026, 3, 1))
            .expect("bill stores");

        let statuses = service
            .status_for_property(&property(), march(), date(2026, 3, 10))
            .expect("statuses evaluate");

        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].status, ComplianceStatus::Missed);
    }

    #[test]
    fn invoice_blocked_until_every_bill_arrives_then_judged_on_its_own_date() {
        let (registry, service) = build_engine();
        let setup_day = date(2026, 3, 1);

        let municipality = registry
            .create(bill_draft(BillType::Municipality, 5), setup_day)
            .expect("municipality bill stores");
        let invoice = registry
            .create(invoice_draft(10, vec![municipality.id.clone()]), setup_day)
            .expect("invoice stores");

        // Day 6: the bill has not arrived, so the invoice is blocked even
        // though its own expected day is still ahead.
        let early = service
            .status_for_property(&property(), march(), date(2026, 3, 6))
            .expect("statuses evaluate");
        let invoice_row = early
            .iter()
            .find(|row| row.schedule_id == invoice.id)
            .expect("invoice row");
        assert_eq!(invoice_row.status, ComplianceStatus::Blocked);
        assert_eq!(invoice_row.blocking_schedule_ids, vec![municipality.id.clone()]);

        // The bill arrives on day 4 (on time); the invoice goes out on day
        // 12, two days past its own expected day 10.
        service
            .record_fulfillment(event(&municipality.id, march(), timestamp(2026, 3, 4)))
            .expect("bill fulfillment records");
        service
            .record_fulfillment(event(&invoice.id, march(), timestamp(2026, 3, 12)))
            .expect("invoice fulfillment records");

        let settled = service
            .status_for_property(&property(), march(), date(2026, 3, 13))
            .expect("statuses evaluate");

        let bill_row = settled
            .iter()
            .find(|row| row.schedule_id == municipality.id)
            .expect("bill row");
        assert_eq!(bill_row.status, ComplianceStatus::OnTime);

        let invoice_row = settled
            .iter()
            .find(|row| row.schedule_id == invoice.id)
            .expect("invoice row");
        assert_eq!(invoice_row.status, ComplianceStatus::Late);
        assert_eq!(invoice_row.days_late, Some(2));
    }

    #[test]
    fn implicit_dependencies_hold_the_invoice_until_all_bills_land() {
        let (registry, service) = build_engine();
        let setup_day = date(2026, 3, 1);

        let x = registry
            .create(bill_draft(BillType::Municipality, 5), setup_day)
            .expect("bill x stores");
        let y = registry
            .create(bill_draft(BillType::Utility, 3), setup_day)
            .expect("bill y stores");
        let invoice = registry
            .create(invoice_draft(10, Vec::new()), setup_day)
            .expect("invoice stores");

        service
            .record_fulfillment(event(&y.id, march(), timestamp(2026, 3, 2)))
            .expect("bill y fulfillment records");

        let statuses = service
            .status_for_property(&property(), march(), date(2026, 3, 20))
            .expect("statuses evaluate");

        let invoice_row = statuses
            .iter()
            .find(|row| row.schedule_id == invoice.id)
            .expect("invoice row");
        assert_eq!(invoice_row.status, ComplianceStatus::Blocked);
        assert_eq!(invoice_row.blocking_schedule_ids, vec![x.id]);
    }

    #[test]
    fn generation_gate_follows_bill_arrival() {
        let (registry, service) = build_engine();
        let setup_day = date(2026, 3, 1);

        let bill = registry
            .create(bill_draft(BillType::Municipality, 5), setup_day)
            .expect("bill stores");
        let invoice = registry
            .create(invoice_draft(10, vec![bill.id.clone()]), setup_day)
            .expect("invoice stores");

        let gate = service
            .is_ready_to_generate(&invoice.id, march(), date(2026, 3, 6))
            .expect("gate evaluates");
        assert!(!gate.ready);
        assert_eq!(gate.blocking_schedule_ids, vec![bill.id.clone()]);

        service
            .record_fulfillment(event(&bill.id, march(), timestamp(2026, 3, 8)))
            .expect("bill fulfillment records");

        let gate = service
            .is_ready_to_generate(&invoice.id, march(), date(2026, 3, 9))
            .expect("gate evaluates");
        assert!(gate.ready);
    }
}

mod registry {
    use super::common::*;
    use billing_engine::engine::{
        BillType, RegistryError, ScheduleId, ValidationError,
    };

    #[test]
    fn duplicate_active_invoice_output_is_rejected() {
        let (registry, _) = build_engine();
        let setup_day = date(2026, 3, 1);

        registry
            .create(invoice_draft(10, Vec::new()), setup_day)
            .expect("first invoice stores");

        match registry.create(invoice_draft(11, Vec::new()), setup_day) {
            Err(RegistryError::Validation(ValidationError::DuplicateOutputSchedule(_))) => {}
            other => panic!("expected duplicate output rejection, got {other:?}"),
        }
    }

    #[test]
    fn dependency_on_another_property_is_rejected() {
        let (registry, _) = build_engine();
        let setup_day = date(2026, 3, 1);

        let mut foreign = bill_draft(BillType::Municipality, 5);
        foreign.property_id = billing_engine::engine::PropertyId("prop-else".to_string());
        let foreign_bill = registry.create(foreign, setup_day).expect("foreign stores");

        match registry.create(invoice_draft(10, vec![foreign_bill.id]), setup_day) {
            Err(RegistryError::Validation(ValidationError::IneligibleDependency(_))) => {}
            other => panic!("expected ineligible dependency rejection, got {other:?}"),
        }
    }

    #[test]
    fn deleting_a_depended_on_bill_is_refused_under_restrict() {
        let (registry, _) = build_engine();
        let setup_day = date(2026, 3, 1);

        let bill = registry
            .create(bill_draft(BillType::Municipality, 5), setup_day)
            .expect("bill stores");
        registry
            .create(invoice_draft(10, vec![bill.id.clone()]), setup_day)
            .expect("invoice stores");

        match registry.delete(&bill.id) {
            Err(RegistryError::Validation(ValidationError::DependencyInUse { .. })) => {}
            other => panic!("expected dependency-in-use rejection, got {other:?}"),
        }
    }

    #[test]
    fn board_resolves_implicit_adjacency_for_the_dashboard() {
        let (registry, _) = build_engine();
        let setup_day = date(2026, 3, 1);

        let bill_a = registry
            .create(bill_draft(BillType::Municipality, 5), setup_day)
            .expect("bill a stores");
        let bill_b = registry
            .create(bill_draft(BillType::Utility, 3), setup_day)
            .expect("bill b stores");
        let invoice = registry
            .create(invoice_draft(10, Vec::new()), setup_day)
            .expect("invoice stores");

        let board = registry
            .list_by_property(&property())
            .expect("board lists");

        let invoice_view = board
            .schedules
            .iter()
            .find(|view| view.id == invoice.id)
            .expect("invoice view");
        let mut resolved: Vec<ScheduleId> = invoice_view.depends_on.clone();
        resolved.sort();
        let mut expected = vec![bill_a.id, bill_b.id];
        expected.sort();
        assert_eq!(resolved, expected);
    }
}

mod routing {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    use billing_engine::engine::{
        engine_router, ComplianceService, DeletionPolicy, EnginePolicy, MemoryFulfillments,
        MemorySchedules, ScheduleRegistry,
    };

    fn build_router() -> axum::Router {
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

    async fn json_body(response: axum::response::Response) -> Value {
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        serde_json::from_slice(&body).expect("json")
    }

    #[tokio::test]
    async fn schedule_lifecycle_over_http() {
        let router = build_router();

        let create = Request::builder()
            .method("POST")
            .uri("/api/v1/schedules")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "property_id": "prop-http",
                    "schedule_type": "bill_input",
                    "bill_type": "utility",
                    "frequency": "monthly",
                    "expected_day_of_month": 5,
                    "today": "2026-03-01",
                })
                .to_string(),
            ))
            .expect("request");

        let response = router.clone().oneshot(create).await.expect("dispatch");
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = json_body(response).await;
        let id = created
            .get("id")
            .and_then(Value::as_str)
            .expect("id present")
            .to_string();

        let status = Request::builder()
            .method("GET")
            .uri("/api/v1/properties/prop-http/status?year=2026&month=3&today=2026-03-04")
            .body(Body::empty())
            .expect("request");
        let response = router.clone().oneshot(status).await.expect("dispatch");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = json_body(response).await;
        let rows = payload
            .get("statuses")
            .and_then(Value::as_array)
            .expect("statuses");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("status"), Some(&json!("pending")));

        let remove = Request::builder()
            .method("DELETE")
            .uri(format!("/api/v1/schedules/{id}"))
            .body(Body::empty())
            .expect("request");
        let response = router.clone().oneshot(remove).await.expect("dispatch");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn unknown_readiness_target_is_not_found() {
        let router = build_router();

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/v1/schedules/sch-none/readiness?year=2026&month=3")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("dispatch");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
