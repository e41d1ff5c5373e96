//! Billing schedule compliance and dependency gating.
//!
//! The engine answers two questions for every configured obligation: was it
//! met on time for a given period, and may the work that depends on it
//! proceed yet. Schedule definitions live behind the registry, expected
//! dates come from the occurrence calculator, dependency readiness from the
//! resolver, and the evaluator folds all of it into a per-period status.

pub mod blueprint;
pub mod domain;
pub mod evaluator;
pub mod memory;
mod occurrence;
pub mod registry;
pub mod repository;
pub mod resolver;
pub mod router;
pub mod service;
pub mod views;

#[cfg(test)]
mod tests;

pub use blueprint::StandardScheduleBlueprint;
pub use domain::{
    BillType, ComplianceStatus, Frequency, FrequencyKind, FulfillmentEvent, Period, PeriodStatus,
    PropertyId, Schedule, ScheduleDraft, ScheduleId, ScheduleType,
};
pub use evaluator::{ComplianceEvaluator, EnginePolicy};
pub use memory::{MemoryFulfillments, MemorySchedules};
pub use registry::{DeletionPolicy, RegistryError, ScheduleRegistry, ValidationError};
pub use repository::{FulfillmentStore, RepositoryError, ScheduleRepository};
pub use resolver::ReadinessVerdict;
pub use router::{engine_router, EngineState};
pub use service::{ComplianceService, ServiceError};
pub use views::{PeriodStatusView, PropertyScheduleBoard, ReadinessView, ScheduleView};
