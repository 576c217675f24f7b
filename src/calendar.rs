//! Date arithmetic for the month grid and the tracked range.

use crate::models::DateKey;
use chrono::{Datelike, Local, Months, NaiveDate};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Header row of the grid. Column 0 is Sunday.
pub const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

pub fn date_key(date: NaiveDate) -> DateKey {
    DateKey::from_date(date)
}

/// Column of `date` in the grid, 0 = Sunday.
pub fn weekday_index(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_sunday()
}

/// Every day from `epoch` through `today`, inclusive. Empty when `today`
/// is before `epoch`.
pub fn tracked_range(epoch: NaiveDate, today: NaiveDate) -> Vec<NaiveDate> {
    epoch.iter_days().take_while(|day| *day <= today).collect()
}

#[derive(Debug, Error)]
#[error("invalid month `{0}`, expected YYYY-MM")]
pub struct InvalidMonth(pub String);

/// The month shown in the calendar. Always anchored on its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DisplayMonth {
    first: NaiveDate,
}

impl DisplayMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|first| Self { first })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            first: date - chrono::Duration::days(i64::from(date.day0())),
        }
    }

    pub fn current() -> Self {
        Self::containing(Local::now().date_naive())
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    /// One date per day of the month, ascending.
    pub fn days(&self) -> Vec<NaiveDate> {
        let month = self.first.month();
        self.first
            .iter_days()
            .take_while(|day| day.month() == month)
            .collect()
    }

    /// Blank cells before day 1 so weekdays line up with the header.
    pub fn leading_blanks(&self) -> u32 {
        weekday_index(self.first)
    }

    /// Moves by `delta` months. Stays put only at the edge of the
    /// representable date range.
    pub fn navigate(&self, delta: i32) -> Self {
        let months = Months::new(delta.unsigned_abs());
        let moved = if delta >= 0 {
            self.first.checked_add_months(months)
        } else {
            self.first.checked_sub_months(months)
        };
        moved.map(|first| Self { first }).unwrap_or(*self)
    }

    pub fn prev(&self) -> Self {
        self.navigate(-1)
    }

    pub fn next(&self) -> Self {
        self.navigate(1)
    }
}

impl fmt::Display for DisplayMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for DisplayMonth {
    type Err = InvalidMonth;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidMonth(text.to_string());
        let (year, month) = text.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}
