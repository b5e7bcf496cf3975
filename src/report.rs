//! Trailing-window report over the journal.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::journal::Journal;
use crate::model::{Awareness, Event, Outcome, Quantity};

/// One flattened entry in a report, annotated with its partition date.
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub date: NaiveDate,
    pub time: String,
    pub outcome: Outcome,
    pub quantity: Quantity,
    pub awareness: Awareness,
    pub note: String,
    #[serde(rename = "recordedAt")]
    pub recorded_at: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WindowReport {
    pub window_days: u32,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub success_count: u32,
    pub failure_count: u32,
    /// Rounded percent of successes among counted outcomes; 0 when empty.
    pub success_rate_percent: u32,
    /// Rounded percent of entries with an anticipatory signal. Entries with
    /// unknown awareness count against the rate.
    pub awareness_rate_percent: u32,
    /// Most recent first, by `recordedAt`.
    pub entries: Vec<ReportEntry>,
}

/// Builds the report for the trailing `days`-day window ending at `today`
/// inclusive. A zero-day window is legal and empty.
pub fn window_report(journal: &Journal, today: NaiveDate, days: u32) -> WindowReport {
    let from = if days == 0 {
        today
    } else {
        today
            .checked_sub_days(Days::new(u64::from(days) - 1))
            .unwrap_or(NaiveDate::MIN)
    };

    let mut entries: Vec<ReportEntry> = Vec::new();
    if days > 0 {
        for (date, events) in journal.days() {
            if date < from || date > today {
                continue;
            }
            for event in events {
                entries.push(flatten(date, event));
            }
        }
    }
    entries.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));

    let success_count = entries.iter().filter(|e| e.outcome.is_success()).count() as u32;
    let failure_count = entries.len() as u32 - success_count;
    let aware_count = entries.iter().filter(|e| e.awareness == Awareness::Yes).count() as u32;

    WindowReport {
        window_days: days,
        from,
        to: today,
        success_count,
        failure_count,
        success_rate_percent: rounded_percent(success_count, success_count + failure_count),
        awareness_rate_percent: rounded_percent(aware_count, entries.len() as u32),
        entries,
    }
}

fn flatten(date: NaiveDate, event: &Event) -> ReportEntry {
    ReportEntry {
        date,
        time: event.time.clone(),
        outcome: event.outcome,
        quantity: event.quantity,
        awareness: event.awareness,
        note: event.note.clone(),
        recorded_at: event.recorded_at,
    }
}

fn rounded_percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((f64::from(part) / f64::from(whole)) * 100.0).round() as u32
}
