//! Business-day calendar
//!
//! Date-only arithmetic over a week with one fixed rest day. All dates are
//! `NaiveDate` values interpreted in UTC, so there is no local-time drift.
//!
//! Counting convention: `business_days_between(from, to)` counts the working
//! days in the half-open range `(from, to]` (negated when `to` is earlier).
//! This makes `add_business_days` and `business_days_between` inverses:
//!
//! ```
//! use chrono::NaiveDate;
//! use prodtrack::domain::BusinessCalendar;
//!
//! let cal = BusinessCalendar::default();
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let end = cal.add_business_days(start, 13);
//! assert_eq!(cal.business_days_between(start, end), 13);
//! ```

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Calendar that skips a single weekly rest day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessCalendar {
    rest_day: Weekday,
}

impl Default for BusinessCalendar {
    fn default() -> Self {
        Self::new(Weekday::Sun)
    }
}

impl BusinessCalendar {
    /// Creates a calendar with the given rest day
    pub fn new(rest_day: Weekday) -> Self {
        Self { rest_day }
    }

    /// Returns the rest day
    pub fn rest_day(&self) -> Weekday {
        self.rest_day
    }

    /// Returns true if the date is a working day
    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        date.weekday() != self.rest_day
    }

    /// Advances `start` until `n` working days have been counted.
    ///
    /// `n = 0` returns `start` unchanged, even when `start` is a rest day.
    /// For `n >= 1` the result is always a working day.
    pub fn add_business_days(&self, start: NaiveDate, n: u32) -> NaiveDate {
        let mut current = start;
        let mut counted = 0;
        while counted < n {
            current = next_day(current);
            if self.is_business_day(current) {
                counted += 1;
            }
        }
        current
    }

    /// Walks back from `end` until `n` working days have been counted.
    ///
    /// Mirror image of [`add_business_days`](Self::add_business_days); used to
    /// lay out compressed deadlines backwards from a fixed delivery date.
    pub fn subtract_business_days(&self, end: NaiveDate, n: u32) -> NaiveDate {
        let mut current = end;
        let mut counted = 0;
        while counted < n {
            current = prev_day(current);
            if self.is_business_day(current) {
                counted += 1;
            }
        }
        current
    }

    /// Signed number of working days from `from` to `to`.
    ///
    /// Positive when `to` is later, negative when it is earlier, zero when
    /// equal. Counts whole weeks arithmetically so long spans stay cheap.
    pub fn business_days_between(&self, from: NaiveDate, to: NaiveDate) -> i64 {
        if to < from {
            return -self.business_days_between(to, from);
        }

        let span = (to - from).num_days();
        let full_weeks = span / 7;
        let mut count = full_weeks * 6;

        // Remainder is at most six days, each checked individually
        let mut cursor = from + Days::new((full_weeks * 7) as u64);
        for _ in 0..(span % 7) {
            cursor = next_day(cursor);
            if self.is_business_day(cursor) {
                count += 1;
            }
        }

        count
    }
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(NaiveDate::MAX)
}

fn prev_day(date: NaiveDate) -> NaiveDate {
    date.pred_opt().unwrap_or(NaiveDate::MIN)
}
