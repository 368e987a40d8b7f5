//! Range selectors and the date windows derived from them.

use chrono::{DateTime, Days, Months, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

/// Granularity requested by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeSelector {
    Daily,
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl RangeSelector {
    /// Parse a query parameter. Absent or unknown values select `Monthly`.
    pub fn from_param(param: Option<&str>) -> Self {
        match param.map(|p| p.trim().to_ascii_lowercase()).as_deref() {
            Some("daily") => RangeSelector::Daily,
            Some("weekly") => RangeSelector::Weekly,
            Some("monthly") => RangeSelector::Monthly,
            Some("yearly") => RangeSelector::Yearly,
            _ => RangeSelector::Monthly,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RangeSelector::Daily => "daily",
            RangeSelector::Weekly => "weekly",
            RangeSelector::Monthly => "monthly",
            RangeSelector::Yearly => "yearly",
        }
    }

    /// How a chart series over this range is split into buckets.
    pub fn bucketing(self) -> Bucketing {
        match self {
            RangeSelector::Daily => Bucketing::SingleDay,
            RangeSelector::Weekly => Bucketing::Days { cap: 7 },
            RangeSelector::Monthly => Bucketing::Days { cap: 31 },
            RangeSelector::Yearly => Bucketing::Months,
        }
    }
}

/// Bucketing strategy for a chart series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucketing {
    /// One bucket for the first day of the window.
    SingleDay,
    /// One bucket per calendar day, at most `cap` of them.
    Days { cap: usize },
    /// One bucket per calendar month.
    Months,
}

/// The `[start, end]` window every sub-query of a request is filtered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    /// Compute the window for `range` ending at `now`.
    ///
    /// `start` is midnight (UTC) of the day one period before `now`. Calendar
    /// month arithmetic clamps to the end of shorter months, so 31 March
    /// minus one month is 28 (or 29) February.
    pub fn compute(range: RangeSelector, now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let start_day = match range {
            RangeSelector::Daily => today.checked_sub_days(Days::new(1)),
            RangeSelector::Weekly => today.checked_sub_days(Days::new(7)),
            RangeSelector::Monthly => today.checked_sub_months(Months::new(1)),
            RangeSelector::Yearly => today.checked_sub_months(Months::new(12)),
        }
        .unwrap_or(NaiveDate::MIN);

        Self {
            start: midnight(start_day),
            end: now,
        }
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }
}

fn midnight(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Timelike};

    const ALL: [RangeSelector; 4] = [
        RangeSelector::Daily,
        RangeSelector::Weekly,
        RangeSelector::Monthly,
        RangeSelector::Yearly,
    ];

    fn samples() -> Vec<DateTime<Utc>> {
        vec![
            Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 31, 23, 59, 59).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 10, 26, 1, 30, 0).unwrap(),
        ]
    }

    #[test]
    fn test_from_param() {
        assert_eq!(RangeSelector::from_param(Some("daily")), RangeSelector::Daily);
        assert_eq!(RangeSelector::from_param(Some("Weekly")), RangeSelector::Weekly);
        assert_eq!(RangeSelector::from_param(Some("yearly")), RangeSelector::Yearly);
        assert_eq!(RangeSelector::from_param(Some("monthly")), RangeSelector::Monthly);
        assert_eq!(RangeSelector::from_param(Some("hourly")), RangeSelector::Monthly);
        assert_eq!(RangeSelector::from_param(Some("")), RangeSelector::Monthly);
        assert_eq!(RangeSelector::from_param(None), RangeSelector::Monthly);
    }

    #[test]
    fn test_window_is_monotonic_and_ends_now() {
        for now in samples() {
            for range in ALL {
                let w = DateWindow::compute(range, now);
                assert!(w.start <= w.end, "{:?} at {}", range, now);
                assert_eq!(w.end, now);
                assert_eq!(w.start.time(), NaiveTime::MIN);
                assert_eq!(w.start.nanosecond(), 0);
            }
        }
    }

    #[test]
    fn test_window_lengths() {
        for now in samples() {
            let daily = DateWindow::compute(RangeSelector::Daily, now);
            let span = daily.end - daily.start;
            assert!(span >= Duration::days(0) && span <= Duration::days(2));

            let weekly = DateWindow::compute(RangeSelector::Weekly, now);
            let span = weekly.end - weekly.start;
            assert!(span >= Duration::days(6) && span <= Duration::days(8));

            let monthly = DateWindow::compute(RangeSelector::Monthly, now);
            let span = monthly.end - monthly.start;
            assert!(span >= Duration::days(27) && span <= Duration::days(32));

            let yearly = DateWindow::compute(RangeSelector::Yearly, now);
            let span = yearly.end - yearly.start;
            assert!(span >= Duration::days(364) && span <= Duration::days(367));
        }
    }

    #[test]
    fn test_weekly_window_start() {
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap();
        let w = DateWindow::compute(RangeSelector::Weekly, now);
        assert_eq!(w.start, Utc.with_ymd_and_hms(2025, 3, 8, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_month_arithmetic_clamps() {
        let now = Utc.with_ymd_and_hms(2025, 3, 31, 18, 0, 0).unwrap();
        let w = DateWindow::compute(RangeSelector::Monthly, now);
        assert_eq!(w.start, Utc.with_ymd_and_hms(2025, 2, 28, 0, 0, 0).unwrap());

        let leap = Utc.with_ymd_and_hms(2024, 2, 29, 9, 0, 0).unwrap();
        let w = DateWindow::compute(RangeSelector::Yearly, leap);
        assert_eq!(w.start, Utc.with_ymd_and_hms(2023, 2, 28, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_truncation_is_idempotent() {
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 14, 22, 5).unwrap();
        let w = DateWindow::compute(RangeSelector::Weekly, now);
        assert_eq!(midnight(w.start.date_naive()), w.start);
    }

    #[test]
    fn test_contains_is_inclusive() {
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap();
        let w = DateWindow::compute(RangeSelector::Weekly, now);
        assert!(w.contains(w.start));
        assert!(w.contains(w.end));
        assert!(!w.contains(w.start - Duration::nanoseconds(1)));
        assert!(!w.contains(w.end + Duration::nanoseconds(1)));
    }

    #[test]
    fn test_range_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RangeSelector::Yearly).unwrap(), "\"yearly\"");
        assert_eq!(RangeSelector::default().as_str(), "monthly");
    }
}
