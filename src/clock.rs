//! Time source seam. Everything that reads "now" goes through this trait so
//! streaks, month views and reports are reproducible under test.

use chrono::{DateTime, NaiveDate, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    fn epoch_ms(&self) -> u64 {
        self.now().timestamp_millis().max(0) as u64
    }

    /// Wire-form `HH:MM` of the current time.
    fn hhmm(&self) -> String {
        self.now().format("%H:%M").to_string()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Pinned clock for tests and replays.
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}
