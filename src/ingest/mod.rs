//! Fulfillment CSV intake.
//!
//! The bill ingestion and generation pipelines export processed work as CSV
//! (`Schedule ID, Period, Processed At`). The importer parses those exports
//! into fulfillment events and replays them through the compliance service,
//! tolerating the usual export noise: BOMs, blank cells, duplicate rows,
//! and rows for schedules this deployment does not know.

mod parser;

use std::io::Read;
use std::path::Path;

use crate::engine::domain::{FulfillmentEvent, ScheduleId};
use crate::engine::repository::{FulfillmentStore, ScheduleRepository};
use crate::engine::service::{ComplianceService, ServiceError};

#[derive(Debug)]
pub enum FulfillmentImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Service(ServiceError),
}

impl std::fmt::Display for FulfillmentImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FulfillmentImportError::Io(err) => {
                write!(f, "failed to read fulfillment export: {}", err)
            }
            FulfillmentImportError::Csv(err) => {
                write!(f, "invalid fulfillment CSV data: {}", err)
            }
            FulfillmentImportError::Service(err) => {
                write!(f, "could not apply fulfillment export: {}", err)
            }
        }
    }
}

impl std::error::Error for FulfillmentImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FulfillmentImportError::Io(err) => Some(err),
            FulfillmentImportError::Csv(err) => Some(err),
            FulfillmentImportError::Service(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for FulfillmentImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for FulfillmentImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<ServiceError> for FulfillmentImportError {
    fn from(err: ServiceError) -> Self {
        Self::Service(err)
    }
}

/// What a replay actually did, for operator feedback.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub applied: usize,
    pub skipped_rows: usize,
    pub unknown_schedules: Vec<ScheduleId>,
}

pub struct FulfillmentCsvImporter;

impl FulfillmentCsvImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<Vec<FulfillmentEvent>, FulfillmentImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse an export into events. Rows without a parseable period or
    /// timestamp are dropped; later rows for the same `(schedule, period)`
    /// key supersede earlier ones, matching the store's last-write-wins
    /// semantics.
    pub fn from_reader<R: Read>(
        reader: R,
    ) -> Result<Vec<FulfillmentEvent>, FulfillmentImportError> {
        let mut events: Vec<FulfillmentEvent> = Vec::new();

        for record in parser::parse_records(reader)? {
            let (Some(period), Some(processed_at)) = (record.period, record.processed_at) else {
                continue;
            };
            if record.schedule_id.is_empty() {
                continue;
            }

            let event = FulfillmentEvent {
                schedule_id: ScheduleId(record.schedule_id),
                period,
                fulfilled_at: processed_at,
            };

            if let Some(existing) = events
                .iter_mut()
                .find(|e| e.schedule_id == event.schedule_id && e.period == event.period)
            {
                *existing = event;
            } else {
                events.push(event);
            }
        }

        Ok(events)
    }

    /// Replay parsed events through the service. Events referencing
    /// schedules this deployment does not know are collected rather than
    /// failing the whole replay; storage failures still abort.
    pub fn replay<R, F>(
        events: Vec<FulfillmentEvent>,
        service: &ComplianceService<R, F>,
    ) -> Result<ImportSummary, FulfillmentImportError>
    where
        R: ScheduleRepository + 'static,
        F: FulfillmentStore + 'static,
    {
        let mut summary = ImportSummary::default();

        for event in events {
            let schedule_id = event.schedule_id.clone();
            match service.record_fulfillment(event) {
                Ok(()) => summary.applied += 1,
                Err(ServiceError::UnknownSchedule(_)) => {
                    summary.skipped_rows += 1;
                    if !summary.unknown_schedules.contains(&schedule_id) {
                        summary.unknown_schedules.push(schedule_id);
                    }
                }
                Err(other) => return Err(other.into()),
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Cursor;

    use crate::engine::domain::Period;

    #[test]
    fn parse_datetime_supports_rfc3339_and_date_strings() {
        let rfc = parser::parse_datetime_for_tests("2026-03-05T10:00:00Z").expect("parse rfc");
        assert_eq!(
            rfc,
            NaiveDate::from_ymd_opt(2026, 3, 5)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap()
        );

        let date = parser::parse_datetime_for_tests("2026-03-05").expect("parse date");
        assert_eq!(
            date,
            NaiveDate::from_ymd_opt(2026, 3, 5)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );

        assert!(parser::parse_datetime_for_tests("  ").is_none());
        assert!(parser::parse_datetime_for_tests("not-a-date").is_none());
    }

    #[test]
    fn normalize_id_strips_bom_and_whitespace() {
        assert_eq!(
            parser::normalize_id_for_tests("\u{feff}  sch-000001  "),
            "sch-000001"
        );
    }

    #[test]
    fn reader_drops_rows_without_period_or_timestamp() {
        let csv = "Schedule ID,Period,Processed At\n\
sch-000001,2026-03,2026-03-04T09:30:00Z\n\
sch-000002,,2026-03-04T09:30:00Z\n\
sch-000003,2026-03,\n";

        let events =
            FulfillmentCsvImporter::from_reader(Cursor::new(csv)).expect("import parses");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].schedule_id, ScheduleId("sch-000001".to_string()));
        assert_eq!(events[0].period, Period { year: 2026, month: 3 });
    }

    #[test]
    fn reader_keeps_last_row_per_schedule_and_period() {
        let csv = "Schedule ID,Period,Processed At\n\
sch-000001,2026-03,2026-03-04T09:30:00Z\n\
sch-000001,2026-03,2026-03-06T14:00:00Z\n";

        let events =
            FulfillmentCsvImporter::from_reader(Cursor::new(csv)).expect("import parses");

        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].fulfilled_at.date(),
            NaiveDate::from_ymd_opt(2026, 3, 6).expect("valid date")
        );
    }

    #[test]
    fn reader_accepts_slash_separated_periods() {
        let csv = "Schedule ID,Period,Processed At\nsch-000001,2026/03,2026-03-04\n";

        let events =
            FulfillmentCsvImporter::from_reader(Cursor::new(csv)).expect("import parses");

        assert_eq!(events[0].period, Period { year: 2026, month: 3 });
    }

    #[test]
    fn importer_from_path_propagates_io_errors() {
        let error = FulfillmentCsvImporter::from_path("./does-not-exist.csv")
            .expect_err("expected io error");

        match error {
            FulfillmentImportError::Io(_) => {}
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
