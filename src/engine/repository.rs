use super::domain::{FulfillmentEvent, Period, PropertyId, Schedule, ScheduleId};

/// Storage abstraction for schedule definitions so the registry and service
/// can be exercised in isolation. Implementations are expected to be cheap
/// to clone handles over shared state.
pub trait ScheduleRepository: Send + Sync {
    fn insert(&self, schedule: Schedule) -> Result<Schedule, RepositoryError>;
    fn update(&self, schedule: Schedule) -> Result<(), RepositoryError>;
    fn remove(&self, id: &ScheduleId) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ScheduleId) -> Result<Option<Schedule>, RepositoryError>;
    fn list_by_property(&self, property_id: &PropertyId)
        -> Result<Vec<Schedule>, RepositoryError>;
}

/// Storage abstraction for fulfillment events pushed by the ingestion and
/// generation pipelines. `record` upserts: a later event for the same
/// `(schedule, period)` key overwrites the earlier one.
pub trait FulfillmentStore: Send + Sync {
    fn record(&self, event: FulfillmentEvent) -> Result<(), RepositoryError>;
    fn fetch(
        &self,
        schedule_id: &ScheduleId,
        period: Period,
    ) -> Result<Option<FulfillmentEvent>, RepositoryError>;
}

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
