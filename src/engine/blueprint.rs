use chrono::NaiveDate;

use super::domain::{BillType, FrequencyKind, PropertyId, Schedule, ScheduleDraft, ScheduleType};
use super::registry::{RegistryError, ScheduleRegistry};
use super::repository::ScheduleRepository;

/// Canonical schedule configuration for one property: the set a landlord
/// typically starts from before tailoring it. Used by the CLI report and by
/// tests that need a realistically wired property.
#[derive(Debug)]
pub struct StandardScheduleBlueprint {
    drafts: Vec<ScheduleDraft>,
}

impl StandardScheduleBlueprint {
    pub fn standard(property_id: &PropertyId) -> Self {
        Self {
            drafts: standard_drafts(property_id),
        }
    }

    pub fn drafts(&self) -> &[ScheduleDraft] {
        &self.drafts
    }

    /// Register every draft, returning the stored schedules in draft order.
    pub fn seed<R>(
        &self,
        registry: &ScheduleRegistry<R>,
        today: NaiveDate,
    ) -> Result<Vec<Schedule>, RegistryError>
    where
        R: ScheduleRepository + 'static,
    {
        self.drafts
            .iter()
            .cloned()
            .map(|draft| registry.create(draft, today))
            .collect()
    }
}

fn standard_drafts(property_id: &PropertyId) -> Vec<ScheduleDraft> {
    vec![
        ScheduleDraft {
            property_id: property_id.clone(),
            schedule_type: ScheduleType::BillInput,
            bill_type: Some(BillType::Municipality),
            frequency: FrequencyKind::Monthly,
            expected_day_of_month: Some(5),
            expected_day_of_week: None,
            expected_on: None,
            depends_on: Vec::new(),
            wait_for_bills: false,
            is_active: true,
        },
        ScheduleDraft {
            property_id: property_id.clone(),
            schedule_type: ScheduleType::BillInput,
            bill_type: Some(BillType::Utility),
            frequency: FrequencyKind::Monthly,
            expected_day_of_month: Some(3),
            expected_day_of_week: None,
            expected_on: None,
            depends_on: Vec::new(),
            wait_for_bills: false,
            is_active: true,
        },
        ScheduleDraft {
            property_id: property_id.clone(),
            schedule_type: ScheduleType::BillInput,
            bill_type: Some(BillType::Levy),
            frequency: FrequencyKind::Weekly,
            expected_day_of_month: None,
            // Monday, the usual body-corporate processing day.
            expected_day_of_week: Some(1),
            expected_on: None,
            depends_on: Vec::new(),
            wait_for_bills: false,
            is_active: true,
        },
        ScheduleDraft {
            property_id: property_id.clone(),
            schedule_type: ScheduleType::InvoiceOutput,
            bill_type: None,
            frequency: FrequencyKind::Monthly,
            expected_day_of_month: Some(10),
            expected_day_of_week: None,
            expected_on: None,
            depends_on: Vec::new(),
            wait_for_bills: true,
            is_active: true,
        },
        ScheduleDraft {
            property_id: property_id.clone(),
            schedule_type: ScheduleType::PayableOutput,
            bill_type: None,
            frequency: FrequencyKind::Monthly,
            expected_day_of_month: Some(12),
            expected_day_of_week: None,
            expected_on: None,
            depends_on: Vec::new(),
            wait_for_bills: true,
            is_active: true,
        },
    ]
}
