//! Fluent constructor for RFC 5545 RRULE bodies, for use by producers that
//! build schedules before publishing a `ScheduleRequest`.
//!
//! Translated from `examples/original_source/src/rrule.py`'s `RRuleBuilder`
//! dataclass: same canonical field ordering, same COUNT/UNTIL mutual
//! exclusion, same UTC-only `until()`.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

const FIELD_ORDER: [&str; 10] = [
    "FREQ",
    "INTERVAL",
    "BYSECOND",
    "BYMINUTE",
    "BYHOUR",
    "BYDAY",
    "BYMONTHDAY",
    "BYMONTH",
    "COUNT",
    "UNTIL",
];

/// Builder errors — these are caller-side input mistakes, not domain
/// errors, so they get their own small type rather than `scheduler_core::Error`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RRuleBuilderError {
    #[error("RRULE must contain FREQ")]
    MissingFreq,
    #[error("INTERVAL must be >= 1")]
    IntervalTooSmall,
    #[error("COUNT must be >= 1")]
    CountTooSmall,
}

#[derive(Debug, Clone, Default)]
pub struct RRuleBuilder {
    parts: HashMap<&'static str, String>,
    timezone: Option<String>,
}

impl RRuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn freq(mut self, value: &str) -> Self {
        self.parts.insert("FREQ", value.to_string());
        self
    }

    pub fn secondly() -> Self {
        Self::new().freq("SECONDLY")
    }
    pub fn minutely() -> Self {
        Self::new().freq("MINUTELY")
    }
    pub fn hourly() -> Self {
        Self::new().freq("HOURLY")
    }
    pub fn daily() -> Self {
        Self::new().freq("DAILY")
    }
    pub fn weekly() -> Self {
        Self::new().freq("WEEKLY")
    }
    pub fn monthly() -> Self {
        Self::new().freq("MONTHLY")
    }
    pub fn yearly() -> Self {
        Self::new().freq("YEARLY")
    }

    pub fn interval(mut self, n: u32) -> Result<Self, RRuleBuilderError> {
        if n < 1 {
            return Err(RRuleBuilderError::IntervalTooSmall);
        }
        self.parts.insert("INTERVAL", n.to_string());
        Ok(self)
    }

    /// Sets COUNT; clears UNTIL (RFC 5545 §3.8.5.3: mutually exclusive).
    pub fn count(mut self, n: u32) -> Result<Self, RRuleBuilderError> {
        if n < 1 {
            return Err(RRuleBuilderError::CountTooSmall);
        }
        self.parts.insert("COUNT", n.to_string());
        self.parts.remove("UNTIL");
        Ok(self)
    }

    /// Sets UNTIL (must be UTC); clears COUNT.
    pub fn until(mut self, at: DateTime<Utc>) -> Self {
        self.parts.insert("UNTIL", at.format("%Y%m%dT%H%M%SZ").to_string());
        self.parts.remove("COUNT");
        self
    }

    pub fn by_second(mut self, seconds: &[u32]) -> Self {
        self.parts.insert("BYSECOND", join(seconds));
        self
    }

    pub fn by_minute(mut self, minutes: &[u32]) -> Self {
        self.parts.insert("BYMINUTE", join(minutes));
        self
    }

    pub fn by_hour(mut self, hours: &[u32]) -> Self {
        self.parts.insert("BYHOUR", join(hours));
        self
    }

    pub fn by_weekday(mut self, days: &[&str]) -> Self {
        let formatted: Vec<String> = days
            .iter()
            .map(|d| d.to_ascii_uppercase().chars().take(2).collect())
            .collect();
        self.parts.insert("BYDAY", formatted.join(","));
        self
    }

    pub fn by_monthday(mut self, days: &[i32]) -> Self {
        self.parts.insert("BYMONTHDAY", join(days));
        self
    }

    pub fn by_month(mut self, months: &[u32]) -> Self {
        self.parts.insert("BYMONTH", join(months));
        self
    }

    /// Shortcut for BYHOUR/BYMINUTE/BYSECOND.
    pub fn at(self, hour: u32, minute: u32, second: u32) -> Self {
        self.by_hour(&[hour]).by_minute(&[minute]).by_second(&[second])
    }

    /// Attach an IANA zone name — kept alongside the rule, never inside it.
    pub fn timezone(mut self, tz_name: impl Into<String>) -> Self {
        self.timezone = Some(tz_name.into());
        self
    }

    /// Returns `(rrule_body, timezone)`.
    pub fn build(self) -> Result<(String, Option<String>), RRuleBuilderError> {
        if !self.parts.contains_key("FREQ") {
            return Err(RRuleBuilderError::MissingFreq);
        }
        let body = FIELD_ORDER
            .iter()
            .filter_map(|key| self.parts.get(key).map(|v| format!("{key}={v}")))
            .collect::<Vec<_>>()
            .join(";");
        Ok((body, self.timezone))
    }
}

fn join<T: ToString>(values: &[T]) -> String {
    values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn builds_canonical_field_order() {
        let (body, _) = RRuleBuilder::daily()
            .interval(2)
            .unwrap()
            .by_hour(&[9])
            .build()
            .unwrap();
        assert_eq!(body, "FREQ=DAILY;INTERVAL=2;BYHOUR=9");
    }

    #[test]
    fn count_and_until_are_mutually_exclusive() {
        let until = Utc.with_ymd_and_hms(2026, 12, 31, 0, 0, 0).unwrap();
        let (body, _) = RRuleBuilder::daily()
            .count(5)
            .unwrap()
            .until(until)
            .build()
            .unwrap();
        assert!(body.contains("UNTIL="));
        assert!(!body.contains("COUNT="));

        let (body2, _) = RRuleBuilder::daily()
            .until(until)
            .count(5)
            .unwrap()
            .build()
            .unwrap();
        assert!(body2.contains("COUNT="));
        assert!(!body2.contains("UNTIL="));
    }

    #[test]
    fn missing_freq_is_rejected() {
        let result = RRuleBuilder::new().build();
        assert_eq!(result, Err(RRuleBuilderError::MissingFreq));
    }

    #[test]
    fn interval_must_be_at_least_one() {
        let result = RRuleBuilder::daily().interval(0);
        assert_eq!(result, Err(RRuleBuilderError::IntervalTooSmall));
    }

    #[test]
    fn count_must_be_at_least_one() {
        let result = RRuleBuilder::daily().count(0);
        assert_eq!(result, Err(RRuleBuilderError::CountTooSmall));
    }

    #[test]
    fn timezone_is_carried_separately_from_body() {
        let (body, tz) = RRuleBuilder::daily()
            .at(9, 0, 0)
            .timezone("Europe/Berlin")
            .build()
            .unwrap();
        assert_eq!(body, "FREQ=DAILY;BYSECOND=0;BYMINUTE=0;BYHOUR=9");
        assert_eq!(tz.as_deref(), Some("Europe/Berlin"));
    }
}
