//! Expected-occurrence date math.
//!
//! Pure and total: any `(frequency, period)` pair resolves to a concrete
//! calendar date, with invalid anchors already rejected by the registry at
//! creation time.

use chrono::{Datelike, Duration, NaiveDate};

use super::domain::{Frequency, Period};

impl Frequency {
    /// The date this obligation is expected to occur within `period`.
    ///
    /// Monthly anchors clamp to the month length (31 becomes 28/29/30 as
    /// appropriate); weekly anchors resolve to the first matching weekday of
    /// the month; fixed dates ignore the period entirely.
    pub fn expected_date(&self, period: Period) -> NaiveDate {
        match *self {
            Frequency::Monthly { day_of_month } => {
                let day = u32::from(day_of_month).min(days_in_month(period.year, period.month));
                month_start(period.year, period.month) + Duration::days(i64::from(day) - 1)
            }
            Frequency::Weekly { weekday } => {
                let first = month_start(period.year, period.month);
                let offset = (weekday.num_days_from_sunday() + 7
                    - first.weekday().num_days_from_sunday())
                    % 7;
                first + Duration::days(i64::from(offset))
            }
            Frequency::Once { on } => on,
        }
    }

    /// First expected occurrence on or after `today`, used for the cached
    /// `next_expected_date` on a schedule. Fixed dates already in the past
    /// have no next occurrence.
    pub fn next_occurrence(&self, today: NaiveDate) -> Option<NaiveDate> {
        let current = Period::containing(today);
        let candidate = self.expected_date(current);
        if candidate >= today {
            return Some(candidate);
        }

        match self {
            Frequency::Once { .. } => None,
            _ => Some(self.expected_date(current.next())),
        }
    }
}

fn month_start(year: i32, month: u32) -> NaiveDate {
    // Out-of-range periods only arise past chrono's calendar bounds.
    NaiveDate::from_ymd_opt(year, month.clamp(1, 12), 1).unwrap_or(NaiveDate::MIN)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let start = month_start(year, month);
    let next = month_start(
        if month >= 12 { year + 1 } else { year },
        if month >= 12 { 1 } else { month + 1 },
    );
    (next - start).num_days() as u32
}
