use chrono::{DateTime, Duration, Local, Utc};
use serde::{Deserialize, Serialize};

use logsieve_types::SessionPredicate;

/// How far back the "recent" preset reaches
pub const RECENT_WINDOW_MINUTES: i64 = 20;

/// Inclusive time window, or "current session only"
///
/// Each bound has its own enabled flag, so switching a bound off keeps its
/// date for when it is switched back on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRange {
    /// Overrides both bounds when set
    pub is_current_session_only: bool,
    pub is_start_enabled: bool,
    pub start: Option<DateTime<Utc>>,
    pub is_end_enabled: bool,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub const DEFAULT: DateRange = DateRange {
        is_current_session_only: false,
        is_start_enabled: false,
        start: None,
        is_end_enabled: false,
        end: None,
    };

    /// Bounds that are given are enabled
    pub fn between(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self {
            is_current_session_only: false,
            is_start_enabled: start.is_some(),
            start,
            is_end_enabled: end.is_some(),
            end,
        }
    }

    pub fn current_session() -> Self {
        Self {
            is_current_session_only: true,
            ..Self::DEFAULT
        }
    }

    /// The last few minutes up to now
    pub fn recent(now: DateTime<Utc>) -> Self {
        Self::between(Some(now - Duration::minutes(RECENT_WINDOW_MINUTES)), None)
    }

    /// Since local midnight
    pub fn today(now: DateTime<Utc>) -> Self {
        let local = now.with_timezone(&Local);
        let start = local
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
            .map(|midnight| midnight.with_timezone(&Utc))
            .unwrap_or(now);
        Self::between(Some(start), None)
    }

    /// Lower bound in effect, if any
    pub fn active_start(&self) -> Option<DateTime<Utc>> {
        self.start.filter(|_| self.is_start_enabled)
    }

    /// Upper bound in effect, if any
    pub fn active_end(&self) -> Option<DateTime<Utc>> {
        self.end.filter(|_| self.is_end_enabled)
    }

    /// Set the lower bound and switch it on
    pub fn set_start(&mut self, start: DateTime<Utc>) {
        self.start = Some(start);
        self.is_start_enabled = true;
    }

    /// Set the upper bound and switch it on
    pub fn set_end(&mut self, end: DateTime<Utc>) {
        self.end = Some(end);
        self.is_end_enabled = true;
    }

    /// Bound test ignoring the session flag; disabled or absent bounds are open
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.active_start().is_none_or(|start| timestamp >= start)
            && self.active_end().is_none_or(|end| timestamp <= end)
    }

    pub fn allows<S>(&self, timestamp: DateTime<Utc>, session: &S) -> bool
    where
        S: SessionPredicate + ?Sized,
    {
        if self.is_current_session_only {
            session.is_in_current_session(timestamp)
        } else {
            self.contains(timestamp)
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_default_is_unbounded() {
        let range = DateRange::default();
        assert!(range.is_default());
        assert!(range.contains(at(0)));
        assert!(range.contains(at(23)));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let range = DateRange::between(Some(at(10)), Some(at(12)));
        assert!(range.contains(at(10)));
        assert!(range.contains(at(11)));
        assert!(range.contains(at(12)));
        assert!(!range.contains(at(9)));
        assert!(!range.contains(at(13)));
    }

    #[test]
    fn test_open_ended_bounds() {
        let from = DateRange::between(Some(at(10)), None);
        assert!(from.contains(at(23)));
        assert!(!from.contains(at(9)));

        let until = DateRange::between(None, Some(at(10)));
        assert!(until.contains(at(0)));
        assert!(!until.contains(at(11)));
    }

    #[test]
    fn test_session_flag_overrides_bounds() {
        let range = DateRange {
            is_current_session_only: true,
            ..DateRange::between(Some(at(10)), Some(at(12)))
        };
        let session = |ts: DateTime<Utc>| ts >= at(20);
        assert!(range.allows(at(21), &session));
        assert!(!range.allows(at(11), &session));
    }

    #[test]
    fn test_recent_preset() {
        let now = at(12);
        let range = DateRange::recent(now);
        assert!(range.contains(now));
        assert!(range.contains(now - Duration::minutes(19)));
        assert!(!range.contains(now - Duration::minutes(21)));
        assert!(!range.is_default());
    }

    #[test]
    fn test_today_preset_starts_before_now() {
        let now = Utc::now();
        let range = DateRange::today(now);
        let start = range.start.unwrap();
        assert!(start <= now);
        assert!(now - start <= Duration::hours(25));
        assert!(range.end.is_none());
    }

    #[test]
    fn test_disabled_bound_keeps_its_date() {
        let mut range = DateRange::between(Some(at(10)), Some(at(12)));
        range.is_start_enabled = false;
        assert!(range.contains(at(3)));
        assert!(!range.contains(at(13)));
        assert_eq!(range.start, Some(at(10)));
        assert_eq!(range.active_start(), None);
        assert!(!range.is_default());

        range.is_start_enabled = true;
        assert!(!range.contains(at(3)));
        assert!(range.contains(at(10)));
    }

    #[test]
    fn test_set_bound_enables_it() {
        let mut range = DateRange::default();
        range.set_end(at(8));
        assert!(range.is_end_enabled);
        assert!(!range.is_start_enabled);
        assert!(range.contains(at(8)));
        assert!(!range.contains(at(9)));
    }
}
