//! Calendar-month bucketing of a reporting period.
//!
//! A bucket covers `[first instant of month, first instant of next month)`.
//! A period yields one bucket per calendar month it touches, so a same-day
//! period yields exactly one.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;
use crate::AnalyticsResult;

// ---------------------------------------------------------------------------
// Types — YearMonth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    /// 1-based month
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> AnalyticsResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(AnalyticsError::DateError(format!(
                "month {month} is outside 1..=12"
            )));
        }
        Ok(YearMonth { year, month })
    }

    /// Month containing the given instant.
    pub fn of(at: DateTime<Utc>) -> Self {
        YearMonth {
            year: at.year(),
            month: at.month(),
        }
    }

    /// Months since year 0, used for calendar-month differences.
    pub fn index(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    fn from_index(index: i64) -> AnalyticsResult<Self> {
        let year = i32::try_from(index.div_euclid(12))
            .map_err(|_| AnalyticsError::DateError(format!("month index {index} out of range")))?;
        Ok(YearMonth {
            year,
            month: index.rem_euclid(12) as u32 + 1,
        })
    }

    pub fn add_months(&self, months: i64) -> AnalyticsResult<Self> {
        Self::from_index(self.index() + months)
    }

    pub fn next(&self) -> AnalyticsResult<Self> {
        self.add_months(1)
    }

    /// Calendar months from `self` to `later` (negative if `later` is earlier).
    pub fn months_until(&self, later: &YearMonth) -> i64 {
        later.index() - self.index()
    }

    /// First instant of the month.
    pub fn start(&self) -> AnalyticsResult<DateTime<Utc>> {
        Utc.with_ymd_and_hms(self.year, self.month, 1, 0, 0, 0)
            .single()
            .ok_or_else(|| {
                AnalyticsError::DateError(format!(
                    "cannot build start of {}-{:02}",
                    self.year, self.month
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Types — MonthBucket
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthBucket {
    pub month: YearMonth,
    /// Inclusive lower bound
    pub start: DateTime<Utc>,
    /// Exclusive upper bound (first instant of the next month)
    pub end: DateTime<Utc>,
}

impl MonthBucket {
    pub fn for_month(month: YearMonth) -> AnalyticsResult<Self> {
        Ok(MonthBucket {
            month,
            start: month.start()?,
            end: month.next()?.start()?,
        })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }

    pub fn year(&self) -> i32 {
        self.month.year
    }

    pub fn month_number(&self) -> u32 {
        self.month.month
    }
}

// ---------------------------------------------------------------------------
// Types — Period
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    /// Fails with `InvalidPeriod` when `start > end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> AnalyticsResult<Self> {
        if start > end {
            return Err(AnalyticsError::InvalidPeriod { start, end });
        }
        Ok(Period { start, end })
    }

    /// The `window_months` calendar months ending with the month of `as_of`,
    /// inclusive of that month.
    pub fn trailing(as_of: DateTime<Utc>, window_months: u32) -> AnalyticsResult<Self> {
        if window_months == 0 {
            return Err(AnalyticsError::invalid_input(
                "window_months",
                "must be at least 1",
            ));
        }
        let first = YearMonth::of(as_of).add_months(-(window_months as i64 - 1))?;
        Period::new(first.start()?, as_of)
    }

    pub fn buckets(&self) -> AnalyticsResult<Vec<MonthBucket>> {
        generate_months(self.start, self.end)
    }

    pub fn first_month(&self) -> YearMonth {
        YearMonth::of(self.start)
    }

    pub fn last_month(&self) -> YearMonth {
        YearMonth::of(self.end)
    }
}

// ---------------------------------------------------------------------------
// Function: generate_months
// ---------------------------------------------------------------------------

/// Ordered month buckets from `start`'s month through `end`'s month.
pub fn generate_months(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> AnalyticsResult<Vec<MonthBucket>> {
    if start > end {
        return Err(AnalyticsError::InvalidPeriod { start, end });
    }

    let first = YearMonth::of(start);
    let last = YearMonth::of(end);
    let count = first.months_until(&last) + 1;

    let mut buckets = Vec::with_capacity(count as usize);
    let mut current = first;
    for _ in 0..count {
        buckets.push(MonthBucket::for_month(current)?);
        current = current.next()?;
    }
    Ok(buckets)
}
