//! The session: one explicit owner for the journal, the prize shelf and the
//! draw machine, driven by discrete commands.
//!
//! Mutations commit to the local store before control returns; remote sync
//! is a separate best-effort pass the caller awaits when convenient. All
//! derivations hang off `snapshot()` and the view queries, so rendering
//! never touches internals.

use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate};
use rand::Rng;
use serde::Serialize;

use crate::clock::Clock;
use crate::config::Config;
use crate::derive::{self, HeatmapFilter, MonthGrid};
use crate::journal::Journal;
use crate::logging::{log, obj, v_str, v_u64, Domain, Level};
use crate::model::{Awareness, CoreError, Event, Outcome, Quantity};
use crate::progression;
use crate::remote::Remote;
use crate::report::{window_report, WindowReport};
use crate::retry::RetryConfig;
use crate::reward::{DrawMachine, DrawState, Prize, Shelf, TransitionError};
use crate::store::LocalStore;
use crate::sync::SyncEngine;

/// User-entered fields of an event; the session stamps `recordedAt`.
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub time: String,
    pub outcome: Outcome,
    pub quantity: Quantity,
    pub awareness: Awareness,
    pub note: String,
}

impl EventDraft {
    /// One-keystroke draft: outcome only, everything else defaulted.
    pub fn quick(outcome: Outcome, time: String) -> Self {
        Self {
            time,
            outcome,
            quantity: Quantity::default(),
            awareness: Awareness::default(),
            note: String::new(),
        }
    }

    /// Draft carrying an existing entry's fields, for edits that change only
    /// some of them. `recordedAt` never carries over; the session stamps
    /// anew.
    pub fn from_event(event: &Event) -> Self {
        Self {
            time: event.time.clone(),
            outcome: event.outcome,
            quantity: event.quantity,
            awareness: event.awareness,
            note: event.note.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Command {
    Log { date: NaiveDate, draft: EventDraft },
    QuickLog { outcome: Outcome },
    Edit { date: NaiveDate, index: usize, draft: EventDraft },
    Delete { date: NaiveDate, index: usize },
    AcknowledgeDraw,
}

/// What a handled command did, for the caller's follow-up decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    pub mutated: bool,
    /// A success append armed the draw machine; the caller owns the
    /// presentational delay and the resolve call.
    pub draw_armed: bool,
}

/// Render-ready projection of the whole session.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub today: NaiveDate,
    pub monthly_success: u32,
    pub current_streak: u32,
    pub total_xp: u64,
    /// 1-indexed for display.
    pub level: u64,
    pub level_title: &'static str,
    pub xp_into_level: u64,
    pub level_size: u64,
    pub draw_phase: &'static str,
    pub pending_prize: Option<&'static str>,
    pub collection_size: usize,
    pub recent_prizes: Vec<String>,
    pub today_events: Vec<Event>,
}

pub struct Session {
    journal: Journal,
    shelf: Shelf,
    draw: DrawMachine,
    store: LocalStore,
    sync: SyncEngine,
    clock: Box<dyn Clock>,
    cfg: Config,
    last_recorded_ms: u64,
}

impl Session {
    pub fn open(
        cfg: Config,
        clock: Box<dyn Clock>,
        remote: Box<dyn Remote + Send + Sync>,
    ) -> Result<Self> {
        let mut store = LocalStore::open(&cfg.sqlite_path)?;
        let journal = store.load_journal()?;
        let shelf = store.load_shelf()?;
        // recordedAt stays monotonic across restarts.
        let last_recorded_ms = journal
            .days()
            .flat_map(|(_, events)| events)
            .map(|e| e.recorded_at)
            .max()
            .unwrap_or(0);
        let sync = SyncEngine::new(
            remote,
            cfg.user_id.clone(),
            RetryConfig::for_sync(cfg.sync_max_retries),
        );
        log(
            Level::Info,
            Domain::System,
            "session_open",
            obj(&[
                ("db", v_str(&cfg.sqlite_path)),
                ("days", v_u64(journal.total_days() as u64)),
                ("events", v_u64(journal.total_events() as u64)),
                ("prizes", v_u64(shelf.len() as u64)),
            ]),
        );
        Ok(Self {
            journal,
            shelf,
            draw: DrawMachine::new(),
            store,
            sync,
            clock,
            cfg,
            last_recorded_ms,
        })
    }

    /// Applies one command. Validation and stale-index failures come back as
    /// [`CoreError`] values inside the `anyhow` chain before anything
    /// changes. A failed local save after an accepted change also returns
    /// `Err`, with the in-memory document ahead of disk until the next
    /// successful save.
    pub fn handle(&mut self, cmd: Command) -> Result<Applied> {
        match cmd {
            Command::Log { date, draft } => self.log_event(date, draft),
            Command::QuickLog { outcome } => {
                let draft = EventDraft::quick(outcome, self.clock.hhmm());
                let today = self.clock.today();
                self.log_event(today, draft)
            }
            Command::Edit { date, index, draft } => {
                let event = self.event_from_draft(draft)?;
                self.journal.update(date, index, event)?;
                self.store.save_journal(&self.journal)?;
                log(
                    Level::Info,
                    Domain::Journal,
                    "edit",
                    obj(&[("date", v_str(&date.to_string())), ("index", v_u64(index as u64))]),
                );
                Ok(Applied { mutated: true, draw_armed: false })
            }
            Command::Delete { date, index } => {
                let removed = self.journal.delete(date, index)?;
                self.store.save_journal(&self.journal)?;
                log(
                    Level::Info,
                    Domain::Journal,
                    "delete",
                    obj(&[
                        ("date", v_str(&date.to_string())),
                        ("index", v_u64(index as u64)),
                        ("outcome", v_str(removed.outcome.as_str())),
                        ("day_remains", v_u64(self.journal.events_on(date).len() as u64)),
                    ]),
                );
                Ok(Applied { mutated: true, draw_armed: false })
            }
            Command::AcknowledgeDraw => {
                self.draw.acknowledge().map_err(|e| anyhow!(e.msg))?;
                Ok(Applied { mutated: false, draw_armed: false })
            }
        }
    }

    fn log_event(&mut self, date: NaiveDate, draft: EventDraft) -> Result<Applied> {
        let event = self.event_from_draft(draft)?;
        let success = event.outcome.is_success();
        self.journal.append(date, event);
        self.store.save_journal(&self.journal)?;
        let draw_armed = success && self.draw.trigger();
        log(
            Level::Info,
            Domain::Journal,
            "append",
            obj(&[
                ("date", v_str(&date.to_string())),
                ("success", serde_json::Value::Bool(success)),
                ("day_events", v_u64(self.journal.events_on(date).len() as u64)),
                ("draw_armed", serde_json::Value::Bool(draw_armed)),
            ]),
        );
        Ok(Applied { mutated: true, draw_armed })
    }

    fn event_from_draft(&mut self, draft: EventDraft) -> Result<Event, CoreError> {
        let event = Event {
            time: draft.time,
            outcome: draft.outcome,
            quantity: draft.quantity,
            awareness: draft.awareness,
            note: draft.note,
            recorded_at: self.next_recorded_ms(),
        };
        event.validate()?;
        Ok(event)
    }

    /// Strictly increasing even when the clock ties within a millisecond.
    fn next_recorded_ms(&mut self) -> u64 {
        let now = self.clock.epoch_ms();
        self.last_recorded_ms = now.max(self.last_recorded_ms + 1);
        self.last_recorded_ms
    }

    /// `Drawing → Resolved` with the caller's random source. The shelf keeps
    /// the prize even if the local write fails; a drawn prize is never lost
    /// to storage trouble, only possibly not yet backed up.
    pub fn resolve_draw<R: Rng>(&mut self, rng: &mut R) -> Result<&'static Prize, TransitionError> {
        let prize = self.draw.resolve(rng)?;
        self.shelf.record(prize.id);
        if let Err(err) = self.store.save_shelf(&self.shelf) {
            log(
                Level::Warn,
                Domain::Reward,
                "shelf_save_failed",
                obj(&[("prize", v_str(prize.id)), ("error", v_str(&err.to_string()))]),
            );
        }
        log(
            Level::Info,
            Domain::Reward,
            "draw_resolved",
            obj(&[
                ("prize", v_str(prize.id)),
                ("rarity", v_u64(u64::from(prize.rarity_tier))),
                ("collection", v_u64(self.shelf.len() as u64)),
            ]),
        );
        Ok(prize)
    }

    // ---- sync ----

    /// Startup pass: pull, merge, adopt, push back, and persist whatever the
    /// merge changed locally. Anonymous sessions skip all of it.
    pub async fn sync_startup(&mut self) {
        let merged = self.sync.reconcile(&mut self.journal, &mut self.shelf).await;
        if let Some(stats) = merged {
            if stats.adopted_days > 0 {
                if let Err(err) = self.store.save_journal(&self.journal) {
                    log(
                        Level::Warn,
                        Domain::Store,
                        "merged_journal_save_failed",
                        obj(&[("error", v_str(&err.to_string()))]),
                    );
                }
            }
            if let Err(err) = self.store.save_shelf(&self.shelf) {
                log(
                    Level::Warn,
                    Domain::Store,
                    "shelf_save_failed",
                    obj(&[("error", v_str(&err.to_string()))]),
                );
            }
        }
    }

    /// Best-effort push of both documents; failures are logged, never
    /// surfaced.
    pub async fn sync_push(&mut self) {
        self.sync.push_journal(&self.journal).await;
        self.sync.push_shelf(&self.shelf).await;
    }

    // ---- views ----

    pub fn snapshot(&self) -> Snapshot {
        let today = self.clock.today();
        let xp = progression::total_xp(&self.journal);
        let level = progression::level_of(xp);
        Snapshot {
            today,
            monthly_success: derive::monthly_success_count(&self.journal, today.year(), today.month()),
            current_streak: derive::current_streak(&self.journal, today),
            total_xp: xp,
            level: level + 1,
            level_title: progression::level_title(level),
            xp_into_level: progression::xp_into_level(xp),
            level_size: progression::LEVEL_SIZE,
            draw_phase: self.draw.state().phase(),
            pending_prize: match self.draw.state() {
                DrawState::Resolved { prize_id } => Some(*prize_id),
                _ => None,
            },
            collection_size: self.shelf.len(),
            recent_prizes: self.shelf.collection.iter().take(5).cloned().collect(),
            today_events: self.journal.events_on(today).to_vec(),
        }
    }

    pub fn calendar(&self, year: i32, month: u32) -> Option<MonthGrid> {
        derive::calendar_month(&self.journal, year, month)
    }

    pub fn heatmap(&self, filter: HeatmapFilter) -> [[u32; 24]; 7] {
        derive::hour_day_heatmap(&self.journal, filter)
    }

    pub fn histogram(&self) -> [u32; 24] {
        derive::hour_histogram(&self.journal)
    }

    pub fn report(&self, days: u32) -> WindowReport {
        window_report(&self.journal, self.clock.today(), days)
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn shelf(&self) -> &Shelf {
        &self.shelf
    }

    pub fn draw_state(&self) -> &DrawState {
        self.draw.state()
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crate::clock::FixedClock;
    use crate::remote::NullRemote;

    fn test_session(dir: &tempfile::TempDir) -> Session {
        let cfg = Config {
            sqlite_path: dir
                .path()
                .join("habitlog.sqlite")
                .to_string_lossy()
                .into_owned(),
            remote_base: None,
            user_id: None,
            draw_delay_ms: 0,
            sync_max_retries: 0,
            report_days: 30,
        };
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 12, 14, 30, 0).unwrap());
        Session::open(cfg, Box::new(clock), Box::new(NullRemote)).unwrap()
    }

    #[test]
    fn test_recorded_at_strictly_increases_under_a_frozen_clock() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = test_session(&dir);
        session.handle(Command::QuickLog { outcome: Outcome::Success }).unwrap();
        session.handle(Command::QuickLog { outcome: Outcome::Failure }).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 3, 12).unwrap();
        let stamps: Vec<u64> = session
            .journal()
            .events_on(today)
            .iter()
            .map(|e| e.recorded_at)
            .collect();
        assert_eq!(stamps.len(), 2);
        assert!(stamps[0] < stamps[1], "ties must break upward: {:?}", stamps);
    }

    #[test]
    fn test_quick_log_fills_defaults_from_the_clock() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = test_session(&dir);
        session.handle(Command::QuickLog { outcome: Outcome::Success }).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 3, 12).unwrap();
        let event = &session.journal().events_on(today)[0];
        assert_eq!(event.time, "14:30");
        assert_eq!(event.quantity, Quantity::Medium);
        assert_eq!(event.awareness, Awareness::Unknown);
        assert_eq!(event.note, "");
    }

    #[test]
    fn test_invalid_time_mutates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = test_session(&dir);
        let date = NaiveDate::from_ymd_opt(2024, 3, 12).unwrap();
        let draft = EventDraft {
            time: "25:99".to_string(),
            outcome: Outcome::Success,
            quantity: Quantity::Medium,
            awareness: Awareness::Unknown,
            note: String::new(),
        };
        let err = session.handle(Command::Log { date, draft }).unwrap_err();
        assert!(err.to_string().contains("invalid input"), "{}", err);
        assert!(session.journal().is_empty());
        assert_eq!(session.draw_state(), &DrawState::Idle);
    }
}
