//! Month grid of the events calendar
use arsenal_db::events::EventInfo;
use chrono::{Datelike, Duration, NaiveDate, Weekday};

pub struct Day {
    pub date: NaiveDate,
    // Padding days of the neighbouring months are shown greyed out
    pub in_month: bool,
    pub events: Vec<EventInfo>,
}

impl Day {
    pub fn number(&self) -> u32 {
        self.date.day()
    }
}

/// A month laid out in weeks starting on Monday
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub weeks: Vec<Vec<Day>>,
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

impl MonthGrid {
    /// First and last day shown, padding included. `None` for an invalid month.
    pub fn bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let (ny, nm) = next_month(year, month);
        let last = NaiveDate::from_ymd_opt(ny, nm, 1)?.pred_opt()?;
        let start = first - Duration::days(first.weekday().num_days_from_monday() as i64);
        let end = last + Duration::days(6 - last.weekday().num_days_from_monday() as i64);
        Some((start, end))
    }

    /// Place every event on each day it spans.
    pub fn new(year: i32, month: u32, events: &[EventInfo]) -> Option<Self> {
        let (start, end) = Self::bounds(year, month)?;
        let mut weeks = Vec::new();
        let mut week = Vec::with_capacity(7);
        let mut date = start;
        while date <= end {
            week.push(Day {
                date,
                in_month: date.month() == month,
                events: events.iter().filter(|e| e.spans(date)).cloned().collect(),
            });
            if date.weekday() == Weekday::Sun {
                weeks.push(std::mem::take(&mut week));
            }
            date = date.succ_opt()?;
        }
        Some(Self { year, month, weeks })
    }

    pub fn title(&self) -> String {
        format!("{} {}", MONTH_NAMES[(self.month - 1) as usize], self.year)
    }

    pub fn prev(&self) -> (i32, u32) {
        if self.month == 1 {
            (self.year - 1, 12)
        } else {
            (self.year, self.month - 1)
        }
    }

    pub fn next(&self) -> (i32, u32) {
        next_month(self.year, self.month)
    }
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}
