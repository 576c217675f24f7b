use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};
use thiserror::Error;

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Canonical `YYYY-MM-DD` identifier of a tracked calendar day.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateKey(String);

#[derive(Debug, Error)]
#[error("invalid date `{0}`, expected YYYY-MM-DD")]
pub struct InvalidDateKey(pub String);

impl DateKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.format(DATE_KEY_FORMAT).to_string())
    }

    /// Parses and re-renders the date so equal days always share one key.
    pub fn parse(text: &str) -> Result<Self, InvalidDateKey> {
        NaiveDate::parse_from_str(text.trim(), DATE_KEY_FORMAT)
            .map(Self::from_date)
            .map_err(|_| InvalidDateKey(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DateKey {
    type Error = InvalidDateKey;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DateKey> for String {
    fn from(key: DateKey) -> Self {
        key.0
    }
}

/// Smoke-free flag per day. A missing key reads as `false`.
pub type CheckedMap = BTreeMap<DateKey, bool>;

/// One row change delivered by the change feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub date: DateKey,
    pub checked: bool,
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub date: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    pub month: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_days: usize,
    pub clean_days: usize,
    pub saved_money: u64,
    pub savings_goal: u64,
    pub goal_progress: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleResponse {
    pub date: DateKey,
    pub checked: bool,
    pub summary: Summary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayCell {
    pub date: DateKey,
    pub day: u32,
    /// 0 = Sunday.
    pub weekday: u32,
    pub checked: bool,
    pub today: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MonthResponse {
    pub month: String,
    pub prev: String,
    pub next: String,
    pub leading_blanks: u32,
    pub days: Vec<DayCell>,
    pub summary: Summary,
}
