//! Read-only projections over the journal.
//!
//! Every function here is pure: journal snapshot plus an explicit reference
//! date in, derived numbers out. "No data" is always a zero or an empty
//! structure, never an error, so render paths stay unconditional.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::journal::Journal;
use crate::model::{hour_of, Outcome};

/// Upper bound on the backward streak walk. Protects against pathological
/// documents (duplicated decades of history) ever stalling a render.
pub const STREAK_WALK_LIMIT: u32 = 366;

/// Classification of one calendar day for grid coloring. Both outcome flags
/// set means a mixed day; neither set means the day is absent from the log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayCell {
    pub has_events: bool,
    pub has_success: bool,
    pub has_failure: bool,
}

/// Which events a heatmap counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeatmapFilter {
    AllEvents,
    FailuresOnly,
}

/// Count of success events whose date falls in the given year/month.
pub fn monthly_success_count(journal: &Journal, year: i32, month: u32) -> u32 {
    journal
        .days()
        .filter(|(date, _)| date.year() == year && date.month() == month)
        .flat_map(|(_, events)| events)
        .filter(|e| e.outcome.is_success())
        .count() as u32
}

pub fn calendar_cell(journal: &Journal, date: NaiveDate) -> DayCell {
    let mut cell = DayCell::default();
    for event in journal.events_on(date) {
        cell.has_events = true;
        match event.outcome {
            Outcome::Success => cell.has_success = true,
            Outcome::Failure => cell.has_failure = true,
        }
    }
    cell
}

/// `matrix[weekday][hour]` event counts, weekday 0=Sunday..6=Saturday.
/// Weekday comes from the event's date, hour from the leading `HH` of its
/// time; events with unparseable times are skipped.
pub fn hour_day_heatmap(journal: &Journal, filter: HeatmapFilter) -> [[u32; 24]; 7] {
    let mut matrix = [[0u32; 24]; 7];
    for (date, events) in journal.days() {
        let weekday = date.weekday().num_days_from_sunday() as usize;
        for event in events {
            if filter == HeatmapFilter::FailuresOnly && event.outcome.is_success() {
                continue;
            }
            if let Some(hour) = hour_of(&event.time) {
                matrix[weekday][hour as usize] += 1;
            }
        }
    }
    matrix
}

/// All-events count per hour of day; the column sums of the heatmap.
pub fn hour_histogram(journal: &Journal) -> [u32; 24] {
    let mut buckets = [0u32; 24];
    for (_, events) in journal.days() {
        for event in events {
            if let Some(hour) = hour_of(&event.time) {
                buckets[hour as usize] += 1;
            }
        }
    }
    buckets
}

/// Consecutive trailing days with at least one event and zero failures,
/// walking backward from `today`.
///
/// A day with a failure ends the walk at 0 additional days. An empty day
/// ends the walk too, with one exception: an empty `today` is skipped
/// without breaking, because checking the streak before logging anything on
/// the current day must not zero it out.
pub fn current_streak(journal: &Journal, today: NaiveDate) -> u32 {
    let mut streak = 0u32;
    let mut day = today;
    for _ in 0..STREAK_WALK_LIMIT {
        let events = journal.events_on(day);
        if events.is_empty() {
            if day != today {
                break;
            }
        } else if events.iter().any(|e| e.outcome == Outcome::Failure) {
            break;
        } else {
            streak += 1;
        }
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

/// Render data for one month's calendar grid: a cell per day plus the
/// weekday of the 1st (0=Sunday) for leading blank alignment. `None` only
/// for an invalid year/month pair.
#[derive(Debug, Clone, Serialize)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub leading_blanks: u32,
    pub cells: Vec<DayCell>,
}

pub fn calendar_month(journal: &Journal, year: i32, month: u32) -> Option<MonthGrid> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let days_in_month = (next_first - first).num_days() as u32;
    let cells = (1..=days_in_month)
        .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
        .map(|date| calendar_cell(journal, date))
        .collect();
    Some(MonthGrid {
        year,
        month,
        leading_blanks: first.weekday().num_days_from_sunday(),
        cells,
    })
}
