use crate::error::CoreError;
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// A calendar month over which orders are ranked or exported.
///
/// Months are 1-based (January = 1). Membership is decided on the UTC calendar date
/// of the order's `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ReportingPeriod {
    year: i32,
    month: u32,
}

impl ReportingPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self, CoreError> {
        if !(1..=12).contains(&month) {
            return Err(CoreError::InvalidPeriod(format!("month {month} is outside 1-12")));
        }
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(CoreError::InvalidPeriod(format!("year {year} is out of range")));
        }
        Ok(Self { year, month })
    }

    /// The period containing the given instant.
    pub fn containing(at: DateTime<Utc>) -> Self {
        Self { year: at.year(), month: at.month() }
    }

    pub fn current() -> Self {
        Self::containing(Utc::now())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        at.year() == self.year && at.month() == self.month
    }

    /// Half-open `[start, end)` instant range, for pushing the filter down to storage.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let next = self.next();
        (first_instant(self.year, self.month), first_instant(next.year, next.month))
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// The years offered by the period filter: this one and the `count - 1` before it.
    pub fn recent_years(&self, count: usize) -> Vec<i32> {
        (0..count as i32).map(|i| self.year - i).collect()
    }
}

fn first_instant(year: i32, month: u32) -> DateTime<Utc> {
    // `new` validated the year, and the first of any month at midnight is unambiguous in UTC.
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl fmt::Display for ReportingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for ReportingPeriod {
    type Err = CoreError;

    /// Parses `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| CoreError::InvalidPeriod(format!("expected YYYY-MM, got '{s}'")))?;
        let year = year
            .parse::<i32>()
            .map_err(|_| CoreError::InvalidPeriod(format!("bad year in '{s}'")))?;
        let month = month
            .parse::<u32>()
            .map_err(|_| CoreError::InvalidPeriod(format!("bad month in '{s}'")))?;
        Self::new(year, month)
    }
}
