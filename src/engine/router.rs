use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;

use super::domain::{FulfillmentEvent, Period, PropertyId, ScheduleDraft, ScheduleId};
use super::registry::{RegistryError, ScheduleRegistry, ValidationError};
use super::repository::{FulfillmentStore, RepositoryError, ScheduleRepository};
use super::service::{ComplianceService, ServiceError};

/// Shared handler state bundling the registry and the compliance service.
pub struct EngineState<R, F> {
    pub registry: Arc<ScheduleRegistry<R>>,
    pub compliance: Arc<ComplianceService<R, F>>,
}

impl<R, F> Clone for EngineState<R, F> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            compliance: Arc::clone(&self.compliance),
        }
    }
}

/// Router builder exposing the schedule registry, the compliance dashboard
/// reads, fulfillment intake, and the generation gate.
pub fn engine_router<R, F>(
    registry: Arc<ScheduleRegistry<R>>,
    compliance: Arc<ComplianceService<R, F>>,
) -> Router
where
    R: ScheduleRepository + 'static,
    F: FulfillmentStore + 'static,
{
    let state = EngineState {
        registry,
        compliance,
    };

    Router::new()
        .route("/api/v1/schedules", post(create_schedule_handler::<R, F>))
        .route(
            "/api/v1/schedules/:schedule_id",
            put(update_schedule_handler::<R, F>).delete(delete_schedule_handler::<R, F>),
        )
        .route(
            "/api/v1/schedules/:schedule_id/readiness",
            get(readiness_handler::<R, F>),
        )
        .route(
            "/api/v1/properties/:property_id/schedules",
            get(list_schedules_handler::<R, F>),
        )
        .route(
            "/api/v1/properties/:property_id/status",
            get(property_status_handler::<R, F>),
        )
        .route(
            "/api/v1/status/late-or-missed",
            post(late_or_missed_handler::<R, F>),
        )
        .route("/api/v1/fulfillments", post(fulfillment_handler::<R, F>))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScheduleWriteRequest {
    #[serde(flatten)]
    pub(crate) draft: ScheduleDraft,
    /// Evaluation anchor for the derived next-expected-date; defaults to
    /// the server's local date.
    #[serde(default)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PeriodQuery {
    pub(crate) year: i32,
    pub(crate) month: u32,
    #[serde(default)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LateOrMissedRequest {
    pub(crate) property_ids: Vec<PropertyId>,
    pub(crate) year: i32,
    pub(crate) month: u32,
    #[serde(default)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
struct LateOrMissedResponse {
    period: Period,
    counts: std::collections::BTreeMap<PropertyId, usize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FulfillmentRequest {
    pub(crate) schedule_id: ScheduleId,
    pub(crate) period_year: i32,
    pub(crate) period_month: u32,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub(crate) fulfilled_at: NaiveDateTime,
}

pub(crate) async fn create_schedule_handler<R, F>(
    State(state): State<EngineState<R, F>>,
    axum::Json(request): axum::Json<ScheduleWriteRequest>,
) -> Response
where
    R: ScheduleRepository + 'static,
    F: FulfillmentStore + 'static,
{
    let today = request
        .today
        .unwrap_or_else(|| Local::now().date_naive());

    match state.registry.create(request.draft, today) {
        Ok(schedule) => {
            let depends_on = schedule.depends_on.iter().cloned().collect();
            let view = schedule.to_view(depends_on);
            (StatusCode::CREATED, axum::Json(view)).into_response()
        }
        Err(error) => registry_error_response(error),
    }
}

pub(crate) async fn update_schedule_handler<R, F>(
    State(state): State<EngineState<R, F>>,
    Path(schedule_id): Path<String>,
    axum::Json(request): axum::Json<ScheduleWriteRequest>,
) -> Response
where
    R: ScheduleRepository + 'static,
    F: FulfillmentStore + 'static,
{
    let today = request
        .today
        .unwrap_or_else(|| Local::now().date_naive());
    let id = ScheduleId(schedule_id);

    match state.registry.update(&id, request.draft, today) {
        Ok(schedule) => {
            let depends_on = schedule.depends_on.iter().cloned().collect();
            let view = schedule.to_view(depends_on);
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => registry_error_response(error),
    }
}

pub(crate) async fn delete_schedule_handler<R, F>(
    State(state): State<EngineState<R, F>>,
    Path(schedule_id): Path<String>,
) -> Response
where
    R: ScheduleRepository + 'static,
    F: FulfillmentStore + 'static,
{
    let id = ScheduleId(schedule_id);
    match state.registry.delete(&id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => registry_error_response(error),
    }
}

pub(crate) async fn list_schedules_handler<R, F>(
    State(state): State<EngineState<R, F>>,
    Path(property_id): Path<String>,
) -> Response
where
    R: ScheduleRepository + 'static,
    F: FulfillmentStore + 'static,
{
    match state.registry.list_by_property(&PropertyId(property_id)) {
        Ok(board) => (StatusCode::OK, axum::Json(board)).into_response(),
        Err(error) => registry_error_response(error),
    }
}

pub(crate) async fn property_status_handler<R, F>(
    State(state): State<EngineState<R, F>>,
    Path(property_id): Path<String>,
    Query(query): Query<PeriodQuery>,
) -> Response
where
    R: ScheduleRepository + 'static,
    F: FulfillmentStore + 'static,
{
    let Some(period) = Period::new(query.year, query.month) else {
        return invalid_period_response(query.month);
    };
    let today = query.today.unwrap_or_else(|| Local::now().date_naive());
    let property_id = PropertyId(property_id);

    match state
        .compliance
        .status_for_property(&property_id, period, today)
    {
        Ok(statuses) => {
            let payload = json!({
                "property_id": property_id,
                "period": period,
                "statuses": statuses,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn late_or_missed_handler<R, F>(
    State(state): State<EngineState<R, F>>,
    axum::Json(request): axum::Json<LateOrMissedRequest>,
) -> Response
where
    R: ScheduleRepository + 'static,
    F: FulfillmentStore + 'static,
{
    let Some(period) = Period::new(request.year, request.month) else {
        return invalid_period_response(request.month);
    };
    let today = request.today.unwrap_or_else(|| Local::now().date_naive());

    match state
        .compliance
        .late_or_missed_counts(&request.property_ids, period, today)
    {
        Ok(counts) => (
            StatusCode::OK,
            axum::Json(LateOrMissedResponse { period, counts }),
        )
            .into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn fulfillment_handler<R, F>(
    State(state): State<EngineState<R, F>>,
    axum::Json(request): axum::Json<FulfillmentRequest>,
) -> Response
where
    R: ScheduleRepository + 'static,
    F: FulfillmentStore + 'static,
{
    let Some(period) = Period::new(request.period_year, request.period_month) else {
        return invalid_period_response(request.period_month);
    };

    let event = FulfillmentEvent {
        schedule_id: request.schedule_id,
        period,
        fulfilled_at: request.fulfilled_at,
    };

    match state.compliance.record_fulfillment(event) {
        Ok(()) => (
            StatusCode::ACCEPTED,
            axum::Json(json!({ "status": "recorded" })),
        )
            .into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn readiness_handler<R, F>(
    State(state): State<EngineState<R, F>>,
    Path(schedule_id): Path<String>,
    Query(query): Query<PeriodQuery>,
) -> Response
where
    R: ScheduleRepository + 'static,
    F: FulfillmentStore + 'static,
{
    let Some(period) = Period::new(query.year, query.month) else {
        return invalid_period_response(query.month);
    };
    let today = query.today.unwrap_or_else(|| Local::now().date_naive());
    let id = ScheduleId(schedule_id);

    match state.compliance.is_ready_to_generate(&id, period, today) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => service_error_response(error),
    }
}

fn registry_error_response(error: RegistryError) -> Response {
    let payload = json!({ "error": error.to_string() });
    let status = match &error {
        RegistryError::Validation(ValidationError::DependencyInUse { .. }) => StatusCode::CONFLICT,
        RegistryError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RegistryError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        RegistryError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        RegistryError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, axum::Json(payload)).into_response()
}

fn service_error_response(error: ServiceError) -> Response {
    let payload = json!({ "error": error.to_string() });
    let status = match &error {
        ServiceError::UnknownSchedule(_) => StatusCode::NOT_FOUND,
        ServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        ServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, axum::Json(payload)).into_response()
}

fn invalid_period_response(month: u32) -> Response {
    let payload = json!({ "error": format!("month {month} is outside 1-12") });
    (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!(
            "failed to parse '{raw}' as an RFC 3339 timestamp or YYYY-MM-DD date"
        ))
    })
}

/// Fulfillment pipelines push RFC 3339 timestamps; manual backfills often
/// carry bare dates. Accept both.
pub(crate) fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    None
}
