//! The event log: one ordered list of events per calendar date.
//!
//! Ordering rules matter here. Appends re-sort the day by time (stable, so
//! equal times keep insertion order); updates replace in place and do NOT
//! re-sort, which means an edited time keeps its display slot until the next
//! append touches that day. Deleting the last event of a day removes the date
//! key entirely; a date key never maps to an empty list.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{CoreError, Event};

/// Canonical history, partitioned by date. Serializes transparently as
/// `{ "YYYY-MM-DD": [Event, ...] }`; `BTreeMap` keeps date iteration in
/// ascending (chronological) order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Journal {
    days: BTreeMap<NaiveDate, Vec<Event>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an event to the date's list, creating the list if needed, then
    /// re-sorts the day by time ascending. The sort is stable: events with
    /// equal times stay in insertion (recordedAt) order.
    pub fn append(&mut self, date: NaiveDate, event: Event) {
        let day = self.days.entry(date).or_default();
        day.push(event);
        day.sort_by(|a, b| a.time.cmp(&b.time));
    }

    /// Replaces the event at `date`+`index` in place. No re-sort.
    pub fn update(&mut self, date: NaiveDate, index: usize, event: Event) -> Result<(), CoreError> {
        let day = self.days.get_mut(&date).ok_or(CoreError::OutOfRange {
            date,
            index,
            len: 0,
        })?;
        let len = day.len();
        let slot = day.get_mut(index).ok_or(CoreError::OutOfRange { date, index, len })?;
        *slot = event;
        Ok(())
    }

    /// Removes the event at `date`+`index`, returning it. Removes the date
    /// key when its list empties.
    pub fn delete(&mut self, date: NaiveDate, index: usize) -> Result<Event, CoreError> {
        let day = self.days.get_mut(&date).ok_or(CoreError::OutOfRange {
            date,
            index,
            len: 0,
        })?;
        if index >= day.len() {
            return Err(CoreError::OutOfRange {
                date,
                index,
                len: day.len(),
            });
        }
        let removed = day.remove(index);
        if day.is_empty() {
            self.days.remove(&date);
        }
        Ok(removed)
    }

    /// Events for a date; empty slice when the date is absent, never an
    /// error. Removed dates are indistinguishable from never-logged ones.
    pub fn events_on(&self, date: NaiveDate) -> &[Event] {
        self.days.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Indexed lookup with the same bounds reporting as `update` and
    /// `delete`.
    pub fn event_at(&self, date: NaiveDate, index: usize) -> Result<&Event, CoreError> {
        let day = self.events_on(date);
        day.get(index).ok_or(CoreError::OutOfRange {
            date,
            index,
            len: day.len(),
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.days.contains_key(&date)
    }

    /// Dates with at least one event, ascending.
    pub fn all_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    /// (date, events) pairs, ascending by date.
    pub fn days(&self) -> impl Iterator<Item = (NaiveDate, &[Event])> {
        self.days.iter().map(|(date, events)| (*date, events.as_slice()))
    }

    /// Adopts a whole day from another document. Empty lists are dropped to
    /// keep the no-empty-key invariant regardless of what the peer sent.
    pub fn insert_day(&mut self, date: NaiveDate, events: Vec<Event>) {
        if !events.is_empty() {
            self.days.insert(date, events);
        }
    }

    pub fn into_days(self) -> BTreeMap<NaiveDate, Vec<Event>> {
        self.days
    }

    pub fn total_days(&self) -> usize {
        self.days.len()
    }

    pub fn total_events(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}
