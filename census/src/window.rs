use std::fmt::Display;

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::Serialize;

const API_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Half-open time range `[since, until)` used to filter listed commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub since: DateTime<Utc>,
    pub until: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn new(since: DateTime<Utc>, until: Option<DateTime<Utc>>) -> Self {
        TimeWindow { since, until }
    }

    pub fn last_days(now: DateTime<Utc>, days: u32) -> Self {
        TimeWindow::new(now - Duration::days(i64::from(days)), None)
    }

    pub fn since_param(&self) -> String {
        self.since.format(API_TIME_FORMAT).to_string()
    }

    pub fn contains(&self, date: &DateTime<Utc>) -> bool {
        *date >= self.since && self.until.map_or(true, |until| *date < until)
    }

    pub fn until_param(&self) -> Option<String> {
        self.until.map(|until| until.format(API_TIME_FORMAT).to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quarter {
    pub year: i32,
    pub quarter: u32,
}

impl Quarter {
    pub fn new(year: i32, quarter: u32) -> Option<Self> {
        (1..=4).contains(&quarter).then(|| Quarter { year, quarter })
    }

    pub fn containing<T: TimeZone>(date: &DateTime<T>) -> Self {
        Quarter {
            year: date.year(),
            quarter: (date.month() - 1) / 3 + 1,
        }
    }

    pub fn previous(self) -> Self {
        match self.quarter {
            1 => Quarter {
                year: self.year - 1,
                quarter: 4,
            },
            quarter => Quarter {
                year: self.year,
                quarter: quarter - 1,
            },
        }
    }

    pub fn next(self) -> Self {
        match self.quarter {
            4 => Quarter {
                year: self.year + 1,
                quarter: 1,
            },
            quarter => Quarter {
                year: self.year,
                quarter: quarter + 1,
            },
        }
    }

    pub fn start(self) -> DateTime<Utc> {
        let month = (self.quarter - 1) * 3 + 1;
        Utc.with_ymd_and_hms(self.year, month, 1, 0, 0, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// From the first day of the quarter to the first day of the next one.
    pub fn window(self) -> TimeWindow {
        TimeWindow::new(self.start(), Some(self.next().start()))
    }
}

impl Display for Quarter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} Q{}", self.year, self.quarter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_window_bounds() {
        let window = Quarter::new(2025, 4).unwrap().window();
        assert_eq!(window.since_param(), "2025-10-01T00:00:00Z");
        assert_eq!(window.until_param().unwrap(), "2026-01-01T00:00:00Z");

        let window = Quarter::new(2025, 2).unwrap().window();
        assert_eq!(window.since_param(), "2025-04-01T00:00:00Z");
        assert_eq!(window.until_param().unwrap(), "2025-07-01T00:00:00Z");
    }

    #[test]
    fn consecutive_quarters_do_not_overlap() {
        let q2 = Quarter::new(2025, 2).unwrap().window();
        let q3 = Quarter::new(2025, 3).unwrap().window();
        let boundary = Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap();
        assert!(!q2.contains(&boundary));
        assert!(q3.contains(&boundary));
        assert!(q2.contains(&(boundary - Duration::seconds(1))));
        assert!(TimeWindow::last_days(boundary, 7).contains(&boundary));
    }

    #[test]
    fn previous_quarter_wraps_year() {
        let now = Utc.with_ymd_and_hms(2026, 2, 10, 12, 0, 0).unwrap();
        let current = Quarter::containing(&now);
        assert_eq!(current, Quarter::new(2026, 1).unwrap());
        assert_eq!(current.previous(), Quarter::new(2025, 4).unwrap());
        assert_eq!(Quarter::new(2025, 3).unwrap().previous(), Quarter::new(2025, 2).unwrap());
    }

    #[test]
    fn invalid_quarter() {
        assert_eq!(Quarter::new(2025, 0), None);
        assert_eq!(Quarter::new(2025, 5), None);
    }

    #[test]
    fn last_days_window() {
        let now = Utc.with_ymd_and_hms(2025, 3, 8, 6, 30, 0).unwrap();
        let window = TimeWindow::last_days(now, 7);
        assert_eq!(window.since_param(), "2025-03-01T06:30:00Z");
        assert_eq!(window.until_param(), None);
    }
}
