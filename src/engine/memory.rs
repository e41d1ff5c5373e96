use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::domain::{FulfillmentEvent, Period, PropertyId, Schedule, ScheduleId};
use super::repository::{FulfillmentStore, RepositoryError, ScheduleRepository};

/// In-memory schedule store backing the served binary and the test suites.
#[derive(Default, Clone)]
pub struct MemorySchedules {
    records: Arc<Mutex<HashMap<ScheduleId, Schedule>>>,
}

impl ScheduleRepository for MemorySchedules {
    fn insert(&self, schedule: Schedule) -> Result<Schedule, RepositoryError> {
        let mut guard = self.records.lock().expect("schedule mutex poisoned");
        if guard.contains_key(&schedule.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(schedule.id.clone(), schedule.clone());
        Ok(schedule)
    }

    fn update(&self, schedule: Schedule) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("schedule mutex poisoned");
        if guard.contains_key(&schedule.id) {
            guard.insert(schedule.id.clone(), schedule);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn remove(&self, id: &ScheduleId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("schedule mutex poisoned");
        guard
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn fetch(&self, id: &ScheduleId) -> Result<Option<Schedule>, RepositoryError> {
        let guard = self.records.lock().expect("schedule mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list_by_property(
        &self,
        property_id: &PropertyId,
    ) -> Result<Vec<Schedule>, RepositoryError> {
        let guard = self.records.lock().expect("schedule mutex poisoned");
        let mut schedules: Vec<Schedule> = guard
            .values()
            .filter(|schedule| &schedule.property_id == property_id)
            .cloned()
            .collect();
        schedules.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(schedules)
    }
}

/// In-memory fulfillment log keyed by `(schedule, period)`; last write wins.
#[derive(Default, Clone)]
pub struct MemoryFulfillments {
    events: Arc<Mutex<HashMap<(ScheduleId, Period), FulfillmentEvent>>>,
}

impl FulfillmentStore for MemoryFulfillments {
    fn record(&self, event: FulfillmentEvent) -> Result<(), RepositoryError> {
        let mut guard = self.events.lock().expect("fulfillment mutex poisoned");
        guard.insert((event.schedule_id.clone(), event.period), event);
        Ok(())
    }

    fn fetch(
        &self,
        schedule_id: &ScheduleId,
        period: Period,
    ) -> Result<Option<FulfillmentEvent>, RepositoryError> {
        let guard = self.events.lock().expect("fulfillment mutex poisoned");
        Ok(guard.get(&(schedule_id.clone(), period)).cloned())
    }
}
