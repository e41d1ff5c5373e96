use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for configured schedules.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScheduleId(pub String);

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for the property a schedule belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PropertyId(pub String);

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role a schedule plays in the billing flow: bills arrive, invoices and
/// payables are generated from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleType {
    BillInput,
    InvoiceOutput,
    PayableOutput,
}

impl ScheduleType {
    pub const fn label(self) -> &'static str {
        match self {
            ScheduleType::BillInput => "bill_input",
            ScheduleType::InvoiceOutput => "invoice_output",
            ScheduleType::PayableOutput => "payable_output",
        }
    }

    /// Output schedules are the ones gated behind bill arrival.
    pub const fn is_output(self) -> bool {
        matches!(
            self,
            ScheduleType::InvoiceOutput | ScheduleType::PayableOutput
        )
    }
}

/// Categorical tag for bill input schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillType {
    Municipality,
    Levy,
    Utility,
    Other,
}

impl BillType {
    pub const fn label(self) -> &'static str {
        match self {
            BillType::Municipality => "municipality",
            BillType::Levy => "levy",
            BillType::Utility => "utility",
            BillType::Other => "other",
        }
    }
}

/// Cadence of an obligation. The variants carry their own anchor so an
/// invalid combination (a weekly schedule with a day-of-month) cannot be
/// represented once intake validation has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Monthly { day_of_month: u8 },
    Weekly { weekday: Weekday },
    Once { on: NaiveDate },
}

impl Frequency {
    pub const fn label(&self) -> &'static str {
        match self {
            Frequency::Monthly { .. } => "monthly",
            Frequency::Weekly { .. } => "weekly",
            Frequency::Once { .. } => "once",
        }
    }
}

/// Calendar month bucket compliance is tracked against, regardless of the
/// schedule's underlying cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// The bucket containing a calendar date.
    pub fn containing(date: NaiveDate) -> Self {
        use chrono::Datelike;
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::containing(date) == *self
    }

    /// The following calendar month.
    pub fn next(self) -> Self {
        if self.month >= 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Parse the `YYYY-MM` (or `YYYY/MM`) form used by exports and query
    /// strings.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim().trim_start_matches('\u{feff}');
        let (year, month) = trimmed.split_once(['-', '/'])?;
        Self::new(year.trim().parse().ok()?, month.trim().parse().ok()?)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// A configured recurring obligation for one property.
///
/// `depends_on` is only meaningful on output schedules; an empty set means
/// "every active bill input of the property", resolved at read time.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub id: ScheduleId,
    pub property_id: PropertyId,
    pub schedule_type: ScheduleType,
    pub bill_type: Option<BillType>,
    pub frequency: Frequency,
    pub depends_on: BTreeSet<ScheduleId>,
    pub wait_for_bills: bool,
    pub is_active: bool,
    pub next_expected_date: Option<NaiveDate>,
}

impl Schedule {
    pub fn is_output(&self) -> bool {
        self.schedule_type.is_output()
    }

    /// Whether the dependency gate applies to this schedule at all.
    pub fn is_gated(&self) -> bool {
        self.is_output() && self.wait_for_bills
    }

    /// Whether this schedule produces an occurrence in the given period.
    /// Recurring cadences apply to every period; a fixed date only applies
    /// to the single period containing it.
    pub fn applies_to(&self, period: Period) -> bool {
        match self.frequency {
            Frequency::Once { on } => period.contains(on),
            Frequency::Monthly { .. } | Frequency::Weekly { .. } => true,
        }
    }
}

/// Landlord-submitted schedule definition as it arrives on the wire, before
/// the registry has validated it into a [`Schedule`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleDraft {
    pub property_id: PropertyId,
    pub schedule_type: ScheduleType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bill_type: Option<BillType>,
    pub frequency: FrequencyKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_day_of_month: Option<u8>,
    /// 0 = Sunday through 6 = Saturday, matching the dashboard picker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_day_of_week: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_on: Option<NaiveDate>,
    #[serde(default)]
    pub depends_on: Vec<ScheduleId>,
    #[serde(default = "default_wait_for_bills")]
    pub wait_for_bills: bool,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
}

fn default_wait_for_bills() -> bool {
    true
}

fn default_is_active() -> bool {
    true
}

/// Frequency discriminant as submitted; the anchor fields live alongside it
/// in the draft and are folded into [`Frequency`] during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyKind {
    Monthly,
    Weekly,
    Once,
}

/// Compliance state of one schedule for one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Pending,
    OnTime,
    Late,
    Missed,
    Blocked,
}

impl ComplianceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ComplianceStatus::Pending => "pending",
            ComplianceStatus::OnTime => "on_time",
            ComplianceStatus::Late => "late",
            ComplianceStatus::Missed => "missed",
            ComplianceStatus::Blocked => "blocked",
        }
    }

    /// A dependency counts as satisfied once the bill actually arrived,
    /// regardless of promptness.
    pub const fn satisfies_dependency(self) -> bool {
        matches!(self, ComplianceStatus::OnTime | ComplianceStatus::Late)
    }
}

/// Derived per-period projection. Recomputed on every evaluation, never
/// appended to; identical inputs always produce an identical value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodStatus {
    pub schedule_id: ScheduleId,
    pub period: Period,
    pub status: ComplianceStatus,
    pub expected_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_late: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fulfilled_at: Option<NaiveDateTime>,
}

/// External signal that an obligation was actually completed. One event per
/// schedule per period; a later event for the same key overwrites the
/// recorded fulfillment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FulfillmentEvent {
    pub schedule_id: ScheduleId,
    pub period: Period,
    pub fulfilled_at: NaiveDateTime,
}
