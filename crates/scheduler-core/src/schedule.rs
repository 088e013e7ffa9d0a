//! Schedule specification value object: either a single instant or an
//! RFC 5545 RRULE body. See `examples/original_source/src/scheduler/domain/schedule.py`
//! for the dataclass this is translated from.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use rrule::{RRuleSet, Tz};

/// When a job fires: a single instant, or a recurring rule.
///
/// A tagged variant with exactly one inhabitant — mirrors the teacher's
/// preference for enums over dynamic dispatch on schedule shape (spec §9).
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleSpec {
    /// Fire exactly once, at this UTC instant.
    At(DateTime<Utc>),
    /// Fire on each occurrence of this RFC 5545 RRULE body. `timezone` is
    /// the IANA name carried alongside for display only — the RRULE body
    /// itself is always interpreted in UTC per RFC 5545 §3.8.5.3. `dtstart`
    /// is fixed at schedule creation and never re-derived: RRULE series with
    /// a COUNT/UNTIL boundary are only well-defined relative to one anchor.
    Rrule {
        rule: String,
        timezone: String,
        dtstart: DateTime<Utc>,
    },
}

impl ScheduleSpec {
    pub fn one_shot(at: DateTime<Utc>) -> Self {
        ScheduleSpec::At(at)
    }

    pub fn recurring(
        rule: impl Into<String>,
        timezone: impl Into<String>,
        dtstart: DateTime<Utc>,
    ) -> Result<Self> {
        let rule = rule.into();
        let timezone = timezone.into();
        // Validate eagerly, against the real dtstart, so a malformed RRULE
        // is rejected at construction time rather than at the first
        // `next_after` call.
        build_rrule_set(&rule, dtstart)?;
        Ok(ScheduleSpec::Rrule {
            rule,
            timezone,
            dtstart,
        })
    }

    /// Is this a recurring schedule (has an RRULE) rather than a one-shot?
    pub fn is_recurring(&self) -> bool {
        matches!(self, ScheduleSpec::Rrule { .. })
    }

    /// The RRULE body, if this is a recurring schedule.
    pub fn rrule_body(&self) -> Option<&str> {
        match self {
            ScheduleSpec::Rrule { rule, .. } => Some(rule),
            ScheduleSpec::At(_) => None,
        }
    }

    /// The smallest occurrence strictly greater than `t`, or `None` if the
    /// series is exhausted (one-shot already fired, or RRULE's UNTIL/COUNT
    /// boundary reached).
    ///
    /// Idempotent for a fixed `t`; monotonic across increasing `t`. For a
    /// recurring schedule this always walks the same fixed-DTSTART series —
    /// `t` only selects where in that series to resume, it never moves the
    /// anchor.
    pub fn next_after(&self, t: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        match self {
            ScheduleSpec::At(at) => Ok((*at > t).then_some(*at)),
            ScheduleSpec::Rrule { rule, dtstart, .. } => next_rrule_occurrence(rule, *dtstart, t),
        }
    }
}

fn next_rrule_occurrence(
    rule_body: &str,
    dtstart: DateTime<Utc>,
    t: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>> {
    let rule_set = build_rrule_set(rule_body, dtstart)?;
    let anchor = t.with_timezone(&Tz::UTC);
    let next = rule_set
        .into_iter()
        .find(|occurrence| *occurrence > anchor);
    Ok(next.map(|dt| dt.with_timezone(&Utc)))
}

fn build_rrule_set(rule_body: &str, dtstart: DateTime<Utc>) -> Result<RRuleSet> {
    let ical = format!(
        "DTSTART:{}\nRRULE:{}",
        dtstart.format("%Y%m%dT%H%M%SZ"),
        rule_body
    );
    ical.parse::<RRuleSet>()
        .map_err(|e| Error::invalid_schedule(format!("{e}")))
}
