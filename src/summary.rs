use crate::calendar::{DisplayMonth, date_key, tracked_range, weekday_index};
use crate::models::{CheckedMap, DayCell, MonthResponse, Summary};
use chrono::{Datelike, Local, NaiveDate};

/// Won saved per smoke-free day.
pub const DAILY_SAVING: u64 = 5_000;
/// What the savings are for.
pub const SAVINGS_GOAL: u64 = 3_000_000;

/// Checked days across the whole map, whatever month is on screen.
pub fn clean_days(checked: &CheckedMap) -> usize {
    checked.values().filter(|value| **value).count()
}

pub fn saved_money(clean_days: usize) -> u64 {
    (clean_days as u64).saturating_mul(DAILY_SAVING)
}

pub fn build_summary(epoch: NaiveDate, checked: &CheckedMap) -> Summary {
    build_summary_at(Local::now().date_naive(), epoch, checked)
}

pub fn build_summary_at(today: NaiveDate, epoch: NaiveDate, checked: &CheckedMap) -> Summary {
    let clean_days = clean_days(checked);
    let saved_money = saved_money(clean_days);

    Summary {
        total_days: tracked_range(epoch, today).len(),
        clean_days,
        saved_money,
        savings_goal: SAVINGS_GOAL,
        goal_progress: (saved_money as f64 / SAVINGS_GOAL as f64).min(1.0),
    }
}

pub fn build_month(month: DisplayMonth, epoch: NaiveDate, checked: &CheckedMap) -> MonthResponse {
    build_month_at(Local::now().date_naive(), month, epoch, checked)
}

pub fn build_month_at(
    today: NaiveDate,
    month: DisplayMonth,
    epoch: NaiveDate,
    checked: &CheckedMap,
) -> MonthResponse {
    let days = month
        .days()
        .into_iter()
        .map(|date| {
            let key = date_key(date);
            DayCell {
                checked: checked.get(&key).copied().unwrap_or(false),
                date: key,
                day: date.day(),
                weekday: weekday_index(date),
                today: date == today,
            }
        })
        .collect();

    MonthResponse {
        month: month.to_string(),
        prev: month.prev().to_string(),
        next: month.next().to_string(),
        leading_blanks: month.leading_blanks(),
        days,
        summary: build_summary_at(today, epoch, checked),
    }
}

/// `35000` -> `35,000`.
pub fn format_amount(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    out
}
