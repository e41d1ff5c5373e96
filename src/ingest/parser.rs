use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use std::io::Read;

use crate::engine::domain::Period;

#[derive(Debug)]
pub(crate) struct FulfillmentRecord {
    pub(crate) schedule_id: String,
    pub(crate) period: Option<Period>,
    pub(crate) processed_at: Option<NaiveDateTime>,
}

pub(crate) fn parse_records<R: Read>(reader: R) -> Result<Vec<FulfillmentRecord>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for record in csv_reader.deserialize::<FulfillmentRow>() {
        let row = record?;
        records.push(FulfillmentRecord {
            schedule_id: normalize_id(&row.schedule_id),
            period: row.period.as_deref().and_then(Period::parse),
            processed_at: row.processed_at.as_deref().and_then(parse_datetime),
        });
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct FulfillmentRow {
    #[serde(rename = "Schedule ID")]
    schedule_id: String,
    #[serde(rename = "Period", default, deserialize_with = "empty_string_as_none")]
    period: Option<String>,
    #[serde(
        rename = "Processed At",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    processed_at: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Exports occasionally lead with a BOM and pad cells with stray
/// whitespace; ids compare exactly after stripping both.
fn normalize_id(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_string()
}

fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    None
}

#[cfg(test)]
pub(crate) fn parse_datetime_for_tests(value: &str) -> Option<NaiveDateTime> {
    parse_datetime(value)
}

#[cfg(test)]
pub(crate) fn normalize_id_for_tests(value: &str) -> String {
    normalize_id(value)
}
