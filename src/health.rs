//! Scanner freshness: the dashboard reports the scanner healthy while its
//! status row was touched within the last 15 minutes.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};

use crate::config::HEALTHY_WINDOW_SECS;

/// `scanner_status.last_run` as stored. The column may be a DATE, a
/// TIMESTAMP or a TIMESTAMPTZ depending on how the scanner's schema was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastRun {
    Date(NaiveDate),
    /// TIMESTAMP without zone, taken as UTC.
    Naive(NaiveDateTime),
    Utc(DateTime<Utc>),
}

impl LastRun {
    /// Pure dates become midnight UTC of that day.
    pub fn to_utc(self) -> DateTime<Utc> {
        match self {
            LastRun::Date(d) => d.and_time(chrono::NaiveTime::MIN).and_utc(),
            LastRun::Naive(dt) => dt.and_utc(),
            LastRun::Utc(dt) => dt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannerHealth {
    pub healthy: bool,
    /// Normalized last run. None when there is no status row or it is NULL.
    pub last_run: Option<DateTime<Utc>>,
}

impl ScannerHealth {
    pub fn evaluate(last_run: Option<LastRun>, now: DateTime<Utc>) -> Self {
        let Some(last_run) = last_run.map(LastRun::to_utc) else {
            return Self { healthy: false, last_run: None };
        };
        let healthy = now - last_run < TimeDelta::seconds(HEALTHY_WINDOW_SECS);
        Self { healthy, last_run: Some(last_run) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn absent_status_is_unhealthy_without_last_run() {
        let h = ScannerHealth::evaluate(None, now());
        assert!(!h.healthy);
        assert!(h.last_run.is_none());
    }

    #[test]
    fn five_minutes_old_is_healthy() {
        let last = now() - TimeDelta::minutes(5);
        let h = ScannerHealth::evaluate(Some(LastRun::Utc(last)), now());
        assert!(h.healthy);
        assert_eq!(h.last_run, Some(last));
    }

    #[test]
    fn freshness_boundary_is_strict() {
        let just_inside = now() - TimeDelta::seconds(899);
        let at_limit = now() - TimeDelta::seconds(900);
        let stale = now() - TimeDelta::hours(2);
        assert!(ScannerHealth::evaluate(Some(LastRun::Utc(just_inside)), now()).healthy);
        assert!(!ScannerHealth::evaluate(Some(LastRun::Utc(at_limit)), now()).healthy);
        assert!(!ScannerHealth::evaluate(Some(LastRun::Utc(stale)), now()).healthy);
    }

    #[test]
    fn date_normalizes_to_midnight_utc() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(LastRun::Date(date).to_utc(), expected);

        // Just after midnight the date-only value is still fresh.
        let h = ScannerHealth::evaluate(Some(LastRun::Date(date)), expected + TimeDelta::minutes(3));
        assert!(h.healthy);
        assert_eq!(h.last_run, Some(expected));
    }

    #[test]
    fn naive_timestamp_is_read_as_utc() {
        let naive = NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(11, 50, 0)
            .unwrap();
        let h = ScannerHealth::evaluate(Some(LastRun::Naive(naive)), now());
        assert!(h.healthy);
        assert_eq!(h.last_run, Some(Utc.with_ymd_and_hms(2024, 3, 10, 11, 50, 0).unwrap()));
    }
}
