//! The per-period compliance state machine.
//!
//! `pending` is the default state; a fulfillment event moves a schedule to
//! `on_time` or `late`, an unready dependency verdict holds a gated output
//! at `blocked`, and a passed expected date with neither flips it to
//! `missed`. Evaluation is a pure function of its inputs and is safe to
//! re-run on every read.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::domain::{ComplianceStatus, FulfillmentEvent, Period, PeriodStatus, Schedule};
use super::resolver::ReadinessVerdict;

/// Product-level policy knobs the evaluator consults. Loaded from the
/// environment by `AppConfig`; defaults follow the conservative reading of
/// the source behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnginePolicy {
    /// When set, an output still blocked this many days past its expected
    /// date is reported `missed` instead of staying `blocked` forever.
    /// `None` keeps blocked outputs blocked until their dependencies land.
    pub blocked_escalation_days: Option<i64>,
}

/// Stateless evaluator combining expected dates, fulfillment events, and
/// dependency verdicts into a period status.
#[derive(Debug, Clone, Default)]
pub struct ComplianceEvaluator {
    policy: EnginePolicy,
}

impl ComplianceEvaluator {
    pub fn new(policy: EnginePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> EnginePolicy {
        self.policy
    }

    /// Evaluate one schedule for one period.
    ///
    /// A fulfillment event always wins over the dependency verdict: once the
    /// obligation was actually met, its own lateness is judged on its own
    /// expected date. Comparisons are date-granular, so sub-day clock drift
    /// cannot change a verdict.
    pub fn evaluate(
        &self,
        schedule: &Schedule,
        period: Period,
        fulfillment: Option<&FulfillmentEvent>,
        verdict: Option<&ReadinessVerdict>,
        today: NaiveDate,
    ) -> PeriodStatus {
        let expected_date = schedule.frequency.expected_date(period);

        if let Some(event) = fulfillment {
            let fulfilled_on = event.fulfilled_at.date();
            let (status, days_late) = if fulfilled_on <= expected_date {
                (ComplianceStatus::OnTime, None)
            } else {
                (
                    ComplianceStatus::Late,
                    Some((fulfilled_on - expected_date).num_days()),
                )
            };

            return PeriodStatus {
                schedule_id: schedule.id.clone(),
                period,
                status,
                expected_date,
                days_late,
                fulfilled_at: Some(event.fulfilled_at),
            };
        }

        let held_back = schedule.is_gated() && verdict.is_some_and(|verdict| !verdict.ready);
        let status = if held_back {
            match self.policy.blocked_escalation_days {
                Some(days) if today > expected_date + Duration::days(days) => {
                    ComplianceStatus::Missed
                }
                _ => ComplianceStatus::Blocked,
            }
        } else if today > expected_date {
            ComplianceStatus::Missed
        } else {
            ComplianceStatus::Pending
        };

        PeriodStatus {
            schedule_id: schedule.id.clone(),
            period,
            status,
            expected_date,
            days_late: None,
            fulfilled_at: None,
        }
    }
}
