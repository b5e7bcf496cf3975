//! Reconciliation against the remote document store.
//!
//! Merging is shallow, at the date-key level: local days win wholesale,
//! remote-only days are adopted. Two devices editing the same day offline
//! will resolve to the local side on whichever device pushes next; that
//! limitation is inherited and documented, not repaired here.
//!
//! Pushes are best-effort and digest-gated: an unchanged document is not
//! re-sent, and a failed push only logs. The next successful local mutation
//! pushes the full current document again anyway.

use sha2::{Digest, Sha256};

use crate::journal::Journal;
use crate::logging::{log, obj, v_str, v_u64, Domain, Level};
use crate::model::CoreError;
use crate::remote::Remote;
use crate::retry::{retry_async, RetryConfig};
use crate::reward::Shelf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Remote-only days copied into the local journal.
    pub adopted_days: usize,
    /// Days present on both sides, kept local wholesale.
    pub conflicting_days: usize,
}

/// Shallow date-key merge: local days take precedence, remote-only days are
/// adopted entirely.
pub fn merge_journal(local: &mut Journal, remote: Journal) -> MergeStats {
    let mut stats = MergeStats::default();
    for (date, events) in remote.into_days() {
        if local.contains(date) {
            stats.conflicting_days += 1;
        } else {
            local.insert_day(date, events);
            stats.adopted_days += 1;
        }
    }
    stats
}

/// Content digest of a document's canonical serialization. Journal keys live
/// in a `BTreeMap`, so equal documents always serialize identically.
pub fn document_digest<T: serde::Serialize>(doc: &T) -> String {
    let body = serde_json::to_vec(doc).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&body);
    hex::encode(hasher.finalize())
}

pub struct SyncEngine {
    remote: Box<dyn Remote + Send + Sync>,
    user_id: Option<String>,
    retry: RetryConfig,
    pushed_journal_digest: Option<String>,
    pushed_shelf_digest: Option<String>,
}

impl SyncEngine {
    pub fn new(
        remote: Box<dyn Remote + Send + Sync>,
        user_id: Option<String>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            remote,
            user_id,
            retry,
            pushed_journal_digest: None,
            pushed_shelf_digest: None,
        }
    }

    /// Without an identity every sync call is a no-op.
    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none()
    }

    /// Startup reconciliation: fetch, merge remote-only days, adopt a remote
    /// shelf when the local one is empty, then push the merged state back.
    /// Returns the journal merge stats, or `None` in anonymous mode.
    pub async fn reconcile(&mut self, journal: &mut Journal, shelf: &mut Shelf) -> Option<MergeStats> {
        if self.is_anonymous() {
            return None;
        }

        let mut stats = MergeStats::default();
        if let Some(remote_journal) = self.pull_journal().await {
            stats = merge_journal(journal, remote_journal);
            log(
                Level::Info,
                Domain::Sync,
                "journal_merged",
                obj(&[
                    ("adopted_days", v_u64(stats.adopted_days as u64)),
                    ("conflicting_days", v_u64(stats.conflicting_days as u64)),
                    ("total_days", v_u64(journal.total_days() as u64)),
                ]),
            );
        }

        // The shelf has no per-key structure to merge; whole document, local
        // non-empty wins.
        if shelf.is_empty() {
            if let Some(remote_shelf) = self.pull_shelf().await {
                if !remote_shelf.is_empty() {
                    log(
                        Level::Info,
                        Domain::Sync,
                        "shelf_adopted",
                        obj(&[("prizes", v_u64(remote_shelf.len() as u64))]),
                    );
                    *shelf = remote_shelf;
                }
            }
        }

        self.push_journal(journal).await;
        self.push_shelf(shelf).await;
        Some(stats)
    }

    pub async fn pull_journal(&self) -> Option<Journal> {
        let user = self.user_id.clone()?;
        let fetched =
            retry_async(&self.retry, "journal_fetch", || self.remote.fetch_journal(&user)).await;
        match fetched {
            Ok(doc) => doc,
            Err(err) => {
                self.log_unavailable("journal_fetch", &err);
                None
            }
        }
    }

    pub async fn pull_shelf(&self) -> Option<Shelf> {
        let user = self.user_id.clone()?;
        let fetched =
            retry_async(&self.retry, "shelf_fetch", || self.remote.fetch_shelf(&user)).await;
        match fetched {
            Ok(doc) => doc,
            Err(err) => {
                self.log_unavailable("shelf_fetch", &err);
                None
            }
        }
    }

    /// Best-effort full-document push. Returns true when the remote is known
    /// to hold the current document (freshly pushed or digest-unchanged).
    pub async fn push_journal(&mut self, journal: &Journal) -> bool {
        let user = match self.user_id.clone() {
            Some(user) => user,
            None => return false,
        };
        let digest = document_digest(journal);
        if self.pushed_journal_digest.as_deref() == Some(digest.as_str()) {
            log(
                Level::Debug,
                Domain::Sync,
                "journal_push_skipped",
                obj(&[("digest", v_str(&digest[..12]))]),
            );
            return true;
        }
        let pushed =
            retry_async(&self.retry, "journal_push", || self.remote.push_journal(&user, journal))
                .await;
        match pushed {
            Ok(()) => {
                log(
                    Level::Info,
                    Domain::Sync,
                    "journal_pushed",
                    obj(&[
                        ("days", v_u64(journal.total_days() as u64)),
                        ("events", v_u64(journal.total_events() as u64)),
                    ]),
                );
                self.pushed_journal_digest = Some(digest);
                true
            }
            Err(err) => {
                self.log_unavailable("journal_push", &err);
                false
            }
        }
    }

    pub async fn push_shelf(&mut self, shelf: &Shelf) -> bool {
        let user = match self.user_id.clone() {
            Some(user) => user,
            None => return false,
        };
        let digest = document_digest(shelf);
        if self.pushed_shelf_digest.as_deref() == Some(digest.as_str()) {
            return true;
        }
        let pushed =
            retry_async(&self.retry, "shelf_push", || self.remote.push_shelf(&user, shelf)).await;
        match pushed {
            Ok(()) => {
                log(
                    Level::Info,
                    Domain::Sync,
                    "shelf_pushed",
                    obj(&[("prizes", v_u64(shelf.len() as u64))]),
                );
                self.pushed_shelf_digest = Some(digest);
                true
            }
            Err(err) => {
                self.log_unavailable("shelf_push", &err);
                false
            }
        }
    }

    fn log_unavailable(&self, op: &str, err: &anyhow::Error) {
        let reason = CoreError::RemoteUnavailable {
            detail: err.to_string(),
        };
        log(
            Level::Warn,
            Domain::Sync,
            "remote_unavailable",
            obj(&[("op", v_str(op)), ("error", v_str(&reason.to_string()))]),
        );
    }
}
