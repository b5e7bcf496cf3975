//! Reconciliation behavior: merge precedence, digest-gated pushes, the
//! anonymous no-op path and remote-failure degradation, exercised against
//! in-memory remotes.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;

use habitlog::journal::Journal;
use habitlog::model::{Awareness, Event, Outcome, Quantity};
use habitlog::remote::{NullRemote, Remote};
use habitlog::retry::RetryConfig;
use habitlog::reward::Shelf;
use habitlog::sync::{document_digest, merge_journal, MergeStats, SyncEngine};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn event(time: &str, note: &str) -> Event {
    Event {
        time: time.to_string(),
        outcome: Outcome::Success,
        quantity: Quantity::Medium,
        awareness: Awareness::Unknown,
        note: note.to_string(),
        recorded_at: 1,
    }
}

/// Serves fixed documents and counts pushes.
struct FixtureRemote {
    journal: Option<Journal>,
    shelf: Option<Shelf>,
    journal_pushes: Arc<AtomicU32>,
    shelf_pushes: Arc<AtomicU32>,
}

impl FixtureRemote {
    fn empty() -> Self {
        Self {
            journal: None,
            shelf: None,
            journal_pushes: Arc::new(AtomicU32::new(0)),
            shelf_pushes: Arc::new(AtomicU32::new(0)),
        }
    }
}

#[async_trait]
impl Remote for FixtureRemote {
    async fn fetch_journal(&self, _user_id: &str) -> Result<Option<Journal>> {
        Ok(self.journal.clone())
    }

    async fn push_journal(&self, _user_id: &str, _journal: &Journal) -> Result<()> {
        self.journal_pushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch_shelf(&self, _user_id: &str) -> Result<Option<Shelf>> {
        Ok(self.shelf.clone())
    }

    async fn push_shelf(&self, _user_id: &str, _shelf: &Shelf) -> Result<()> {
        self.shelf_pushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Every call fails, as when the network is down.
struct FailingRemote;

#[async_trait]
impl Remote for FailingRemote {
    async fn fetch_journal(&self, _user_id: &str) -> Result<Option<Journal>> {
        Err(anyhow!("connect timeout"))
    }

    async fn push_journal(&self, _user_id: &str, _journal: &Journal) -> Result<()> {
        Err(anyhow!("connect timeout"))
    }

    async fn fetch_shelf(&self, _user_id: &str) -> Result<Option<Shelf>> {
        Err(anyhow!("connect timeout"))
    }

    async fn push_shelf(&self, _user_id: &str, _shelf: &Shelf) -> Result<()> {
        Err(anyhow!("connect timeout"))
    }
}

fn engine_with(remote: FixtureRemote, user: Option<&str>) -> SyncEngine {
    SyncEngine::new(
        Box::new(remote),
        user.map(str::to_string),
        RetryConfig::for_sync(0),
    )
}

#[test]
fn merge_precedence_local_wins_per_day() {
    let mut local = Journal::new();
    local.append(date("2024-01-01"), event("08:00", "local"));

    let mut remote = Journal::new();
    remote.append(date("2024-01-01"), event("09:00", "remote"));
    remote.append(date("2024-01-02"), event("10:00", "remote-only"));

    let stats = merge_journal(&mut local, remote);
    assert_eq!((stats.conflicting_days, stats.adopted_days), (1, 1));

    let day1 = local.events_on(date("2024-01-01"));
    assert_eq!(day1.len(), 1);
    assert_eq!(day1[0].note, "local", "conflicting day kept verbatim");
    assert_eq!(local.events_on(date("2024-01-02"))[0].note, "remote-only");
}

#[tokio::test]
async fn reconcile_adopts_remote_days_and_shelf() {
    let mut remote_journal = Journal::new();
    remote_journal.append(date("2024-01-02"), event("10:00", "from-remote"));
    let mut remote_shelf = Shelf::default();
    remote_shelf.record("lion");

    let remote = FixtureRemote {
        journal: Some(remote_journal),
        shelf: Some(remote_shelf),
        ..FixtureRemote::empty()
    };
    let mut engine = engine_with(remote, Some("user-1"));

    let mut journal = Journal::new();
    journal.append(date("2024-01-01"), event("08:00", "mine"));
    let mut shelf = Shelf::default();

    let stats = engine.reconcile(&mut journal, &mut shelf).await.unwrap();
    assert_eq!(stats.adopted_days, 1);
    assert_eq!(journal.total_days(), 2);
    assert_eq!(shelf.collection, vec!["lion".to_string()]);
}

#[tokio::test]
async fn reconcile_keeps_a_nonempty_local_shelf() {
    let mut remote_shelf = Shelf::default();
    remote_shelf.record("rocket");
    let remote = FixtureRemote {
        shelf: Some(remote_shelf),
        ..FixtureRemote::empty()
    };
    let mut engine = engine_with(remote, Some("user-1"));

    let mut journal = Journal::new();
    let mut shelf = Shelf::default();
    shelf.record("fire-truck");

    engine.reconcile(&mut journal, &mut shelf).await.unwrap();
    assert_eq!(
        shelf.collection,
        vec!["fire-truck".to_string()],
        "local draws must never be overwritten"
    );
}

#[tokio::test]
async fn anonymous_session_never_talks_to_the_remote() {
    let remote = FixtureRemote::empty();
    let pushes = remote.journal_pushes.clone();
    let mut engine = engine_with(remote, None);

    let mut journal = Journal::new();
    journal.append(date("2024-01-01"), event("08:00", "mine"));
    let mut shelf = Shelf::default();

    assert!(engine.reconcile(&mut journal, &mut shelf).await.is_none());
    assert!(!engine.push_journal(&journal).await);
    assert_eq!(pushes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unchanged_documents_are_not_repushed() {
    let remote = FixtureRemote::empty();
    let pushes = remote.journal_pushes.clone();
    let mut engine = engine_with(remote, Some("user-1"));

    let mut journal = Journal::new();
    journal.append(date("2024-01-01"), event("08:00", "a"));

    assert!(engine.push_journal(&journal).await);
    assert!(engine.push_journal(&journal).await, "skip still reports remote as current");
    assert_eq!(pushes.load(Ordering::SeqCst), 1, "identical content must not be re-sent");

    journal.append(date("2024-01-01"), event("09:00", "b"));
    assert!(engine.push_journal(&journal).await);
    assert_eq!(pushes.load(Ordering::SeqCst), 2, "mutation invalidates the digest");
}

#[tokio::test]
async fn an_unreachable_remote_degrades_to_local_only() {
    let mut engine = SyncEngine::new(
        Box::new(FailingRemote),
        Some("user-1".to_string()),
        RetryConfig::for_sync(0),
    );

    let mut journal = Journal::new();
    journal.append(date("2024-01-01"), event("08:00", "mine"));
    let before = journal.clone();
    let mut shelf = Shelf::default();

    let stats = engine.reconcile(&mut journal, &mut shelf).await;
    assert_eq!(stats, Some(MergeStats::default()), "reconcile completes with nothing merged");
    assert_eq!(journal, before, "local journal stays authoritative");
    assert!(shelf.is_empty(), "no shelf appears out of a dead remote");

    assert!(!engine.push_journal(&journal).await, "a failed push reports, never errors");
    assert!(!engine.push_shelf(&shelf).await);
}

#[tokio::test]
async fn null_remote_round_trips_nothing() {
    let mut engine = SyncEngine::new(
        Box::new(NullRemote),
        Some("user-1".to_string()),
        RetryConfig::for_sync(0),
    );
    let mut journal = Journal::new();
    journal.append(date("2024-01-01"), event("08:00", "a"));
    let mut shelf = Shelf::default();

    let stats = engine.reconcile(&mut journal, &mut shelf).await.unwrap();
    assert_eq!(stats.adopted_days, 0);
    assert_eq!(journal.total_days(), 1, "stub remote leaves local state alone");
}

#[test]
fn digest_is_stable_for_equal_content() {
    let mut a = Journal::new();
    a.append(date("2024-01-01"), event("08:00", "x"));
    let mut b = Journal::new();
    b.append(date("2024-01-01"), event("08:00", "x"));
    assert_eq!(document_digest(&a), document_digest(&b));

    b.append(date("2024-01-02"), event("09:00", "y"));
    assert_ne!(document_digest(&a), document_digest(&b));
}
