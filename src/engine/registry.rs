use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::domain::{
    Frequency, FrequencyKind, PropertyId, Schedule, ScheduleDraft, ScheduleId, ScheduleType,
};
use super::repository::{RepositoryError, ScheduleRepository};
use super::resolver;
use super::views::PropertyScheduleBoard;

/// What `delete` does to a bill input other schedules still depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionPolicy {
    /// Refuse the deletion and report the dependents.
    Restrict,
    /// Strip the edge from every dependent, then delete.
    Cascade,
}

/// Configuration mistakes rejected synchronously at create/update time.
/// These never surface as runtime evaluation failures.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("bill input schedules require a bill type")]
    MissingBillType,
    #[error("an active {0} schedule already exists for this property")]
    DuplicateOutputSchedule(&'static str),
    #[error("{0} is required for the chosen frequency")]
    MissingFrequencyAnchor(&'static str),
    #[error("expected day of month {0} is outside 1-31")]
    DayOfMonthOutOfRange(u8),
    #[error("expected day of week {0} is outside 0-6")]
    DayOfWeekOutOfRange(u8),
    #[error("bill input schedules cannot declare dependencies")]
    DependenciesOnInput,
    #[error("dependency {0} does not exist")]
    UnknownDependency(ScheduleId),
    #[error("dependency {0} does not reference an active bill input of the same property")]
    IneligibleDependency(ScheduleId),
    #[error("schedules cannot move between properties")]
    PropertyReassignment,
    #[error("schedule is a dependency of {dependents:?}")]
    DependencyInUse { dependents: Vec<ScheduleId> },
}

/// Error raised by registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

static SCHEDULE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_schedule_id() -> ScheduleId {
    let id = SCHEDULE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ScheduleId(format!("sch-{id:06}"))
}

/// Validated CRUD over schedule definitions. The write path is serialized
/// so the one-active-output-per-property constraint and dependency-graph
/// edits cannot race each other.
pub struct ScheduleRegistry<R> {
    repository: Arc<R>,
    deletion: DeletionPolicy,
    write_lock: Mutex<()>,
}

impl<R> ScheduleRegistry<R>
where
    R: ScheduleRepository + 'static,
{
    pub fn new(repository: Arc<R>, deletion: DeletionPolicy) -> Self {
        Self {
            repository,
            deletion,
            write_lock: Mutex::new(()),
        }
    }

    /// Validate and store a new schedule. `today` anchors the derived
    /// next-expected-date cache.
    pub fn create(&self, draft: ScheduleDraft, today: NaiveDate) -> Result<Schedule, RegistryError> {
        let _guard = self.write_lock.lock().expect("registry mutex poisoned");

        let schedule = self.validated(draft, next_schedule_id(), None, today)?;
        let stored = self.repository.insert(schedule)?;
        Ok(stored)
    }

    /// Re-validate and replace an existing schedule.
    pub fn update(
        &self,
        id: &ScheduleId,
        draft: ScheduleDraft,
        today: NaiveDate,
    ) -> Result<Schedule, RegistryError> {
        let _guard = self.write_lock.lock().expect("registry mutex poisoned");

        let existing = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        if draft.property_id != existing.property_id {
            return Err(ValidationError::PropertyReassignment.into());
        }

        let schedule = self.validated(draft, existing.id.clone(), Some(&existing.id), today)?;
        self.repository.update(schedule.clone())?;
        Ok(schedule)
    }

    /// Delete a schedule, honouring the configured [`DeletionPolicy`] when
    /// other schedules still depend on it.
    pub fn delete(&self, id: &ScheduleId) -> Result<(), RegistryError> {
        let _guard = self.write_lock.lock().expect("registry mutex poisoned");

        let existing = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;

        let dependents: Vec<Schedule> = self
            .repository
            .list_by_property(&existing.property_id)?
            .into_iter()
            .filter(|sibling| sibling.depends_on.contains(id))
            .collect();

        if !dependents.is_empty() {
            match self.deletion {
                DeletionPolicy::Restrict => {
                    return Err(ValidationError::DependencyInUse {
                        dependents: dependents.into_iter().map(|d| d.id).collect(),
                    }
                    .into());
                }
                DeletionPolicy::Cascade => {
                    for mut dependent in dependents {
                        dependent.depends_on.remove(id);
                        self.repository.update(dependent)?;
                    }
                }
            }
        }

        self.repository.remove(id)?;
        Ok(())
    }

    pub fn get(&self, id: &ScheduleId) -> Result<Schedule, RegistryError> {
        let schedule = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(schedule)
    }

    /// All schedules of a property with each output's dependency set
    /// resolved to concrete ids (an empty set expands to every active bill
    /// input at read time).
    pub fn list_by_property(
        &self,
        property_id: &PropertyId,
    ) -> Result<PropertyScheduleBoard, RegistryError> {
        let schedules = self.repository.list_by_property(property_id)?;

        let views = schedules
            .iter()
            .map(|schedule| {
                let resolved = if schedule.is_output() {
                    resolver::resolve_dependencies(schedule, &schedules)
                } else {
                    Vec::new()
                };
                schedule.to_view(resolved)
            })
            .collect();

        Ok(PropertyScheduleBoard {
            property_id: property_id.clone(),
            schedules: views,
        })
    }

    fn validated(
        &self,
        draft: ScheduleDraft,
        id: ScheduleId,
        replacing: Option<&ScheduleId>,
        today: NaiveDate,
    ) -> Result<Schedule, RegistryError> {
        let frequency = validated_frequency(&draft)?;

        if draft.schedule_type == ScheduleType::BillInput {
            if draft.bill_type.is_none() {
                return Err(ValidationError::MissingBillType.into());
            }
            if !draft.depends_on.is_empty() {
                return Err(ValidationError::DependenciesOnInput.into());
            }
        }

        let siblings = self.repository.list_by_property(&draft.property_id)?;

        if draft.schedule_type.is_output() && draft.is_active {
            let duplicate = siblings.iter().any(|sibling| {
                sibling.schedule_type == draft.schedule_type
                    && sibling.is_active
                    && Some(&sibling.id) != replacing
            });
            if duplicate {
                return Err(
                    ValidationError::DuplicateOutputSchedule(draft.schedule_type.label()).into(),
                );
            }
        }

        let mut depends_on = BTreeSet::new();
        for dependency in &draft.depends_on {
            let target = self
                .repository
                .fetch(dependency)?
                .ok_or_else(|| ValidationError::UnknownDependency(dependency.clone()))?;
            let eligible = target.property_id == draft.property_id
                && target.schedule_type == ScheduleType::BillInput
                && target.is_active;
            if !eligible {
                return Err(ValidationError::IneligibleDependency(dependency.clone()).into());
            }
            depends_on.insert(dependency.clone());
        }

        Ok(Schedule {
            id,
            property_id: draft.property_id,
            schedule_type: draft.schedule_type,
            bill_type: draft.bill_type,
            frequency,
            depends_on,
            // The gate is only meaningful on outputs; normalize inputs.
            wait_for_bills: draft.schedule_type.is_output() && draft.wait_for_bills,
            is_active: draft.is_active,
            next_expected_date: frequency.next_occurrence(today),
        })
    }
}

fn validated_frequency(draft: &ScheduleDraft) -> Result<Frequency, ValidationError> {
    match draft.frequency {
        FrequencyKind::Monthly => {
            let day = draft
                .expected_day_of_month
                .ok_or(ValidationError::MissingFrequencyAnchor("expected_day_of_month"))?;
            if !(1..=31).contains(&day) {
                return Err(ValidationError::DayOfMonthOutOfRange(day));
            }
            Ok(Frequency::Monthly { day_of_month: day })
        }
        FrequencyKind::Weekly => {
            let index = draft
                .expected_day_of_week
                .ok_or(ValidationError::MissingFrequencyAnchor("expected_day_of_week"))?;
            Ok(Frequency::Weekly {
                weekday: weekday_from_index(index)?,
            })
        }
        FrequencyKind::Once => {
            let on = draft
                .expected_on
                .ok_or(ValidationError::MissingFrequencyAnchor("expected_on"))?;
            Ok(Frequency::Once { on })
        }
    }
}

/// Dashboard pickers submit 0 = Sunday through 6 = Saturday.
fn weekday_from_index(index: u8) -> Result<Weekday, ValidationError> {
    match index {
        0 => Ok(Weekday::Sun),
        1 => Ok(Weekday::Mon),
        2 => Ok(Weekday::Tue),
        3 => Ok(Weekday::Wed),
        4 => Ok(Weekday::Thu),
        5 => Ok(Weekday::Fri),
        6 => Ok(Weekday::Sat),
        other => Err(ValidationError::DayOfWeekOutOfRange(other)),
    }
}
