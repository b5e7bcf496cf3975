//! Remote document store seam.
//!
//! The core only knows this trait; the storage medium behind it is somebody
//! else's problem. Without an identity + base URL the session runs on
//! `NullRemote` and every sync call is a successful no-op.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::Config;
use crate::journal::Journal;
use crate::reward::Shelf;

#[async_trait]
pub trait Remote {
    async fn fetch_journal(&self, user_id: &str) -> Result<Option<Journal>>;
    async fn push_journal(&self, user_id: &str, journal: &Journal) -> Result<()>;
    async fn fetch_shelf(&self, user_id: &str) -> Result<Option<Shelf>>;
    async fn push_shelf(&self, user_id: &str, shelf: &Shelf) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteKind {
    Http,
    Null,
}

impl RemoteKind {
    /// The live remote needs both a base URL and an identity; anything less
    /// runs local-only on the stub.
    pub fn detect(cfg: &Config) -> Self {
        match (&cfg.remote_base, &cfg.user_id) {
            (Some(_), Some(_)) => RemoteKind::Http,
            _ => RemoteKind::Null,
        }
    }

    pub fn build(self, cfg: &Config) -> Box<dyn Remote + Send + Sync> {
        match self {
            RemoteKind::Http => {
                let base = cfg.remote_base.clone().unwrap_or_default();
                Box::new(HttpRemote::new(base))
            }
            RemoteKind::Null => Box::new(NullRemote),
        }
    }
}

// Stub implementation to make local-only mode explicit.
pub struct NullRemote;

#[async_trait]
impl Remote for NullRemote {
    async fn fetch_journal(&self, _user_id: &str) -> Result<Option<Journal>> {
        Ok(None)
    }

    async fn push_journal(&self, _user_id: &str, _journal: &Journal) -> Result<()> {
        Ok(())
    }

    async fn fetch_shelf(&self, _user_id: &str) -> Result<Option<Shelf>> {
        Ok(None)
    }

    async fn push_shelf(&self, _user_id: &str, _shelf: &Shelf) -> Result<()> {
        Ok(())
    }
}

/// JSON-over-HTTP document store: one document per URL, GET to fetch
/// (404 = absent), PUT to replace wholesale.
pub struct HttpRemote {
    client: Client,
    base: String,
}

impl HttpRemote {
    pub fn new(base: String) -> Self {
        Self {
            client: Client::new(),
            base,
        }
    }

    fn doc_url(&self, user_id: &str, doc: &str) -> String {
        format!("{}/u/{}/{}", self.base.trim_end_matches('/'), user_id, doc)
    }

    async fn fetch_doc<T: DeserializeOwned>(&self, user_id: &str, doc: &str) -> Result<Option<T>> {
        let url = self.doc_url(user_id, doc);
        let resp = self.client.get(&url).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(anyhow!("remote fetch {} failed: {}", doc, resp.status()));
        }
        Ok(Some(resp.json().await?))
    }

    async fn push_doc<T: Serialize + Sync>(&self, user_id: &str, doc: &str, body: &T) -> Result<()> {
        let url = self.doc_url(user_id, doc);
        let resp = self.client.put(&url).json(body).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("remote push {} failed: {}", doc, resp.status()));
        }
        Ok(())
    }
}

#[async_trait]
impl Remote for HttpRemote {
    async fn fetch_journal(&self, user_id: &str) -> Result<Option<Journal>> {
        self.fetch_doc(user_id, crate::store::DOC_JOURNAL).await
    }

    async fn push_journal(&self, user_id: &str, journal: &Journal) -> Result<()> {
        self.push_doc(user_id, crate::store::DOC_JOURNAL, journal).await
    }

    async fn fetch_shelf(&self, user_id: &str) -> Result<Option<Shelf>> {
        self.fetch_doc(user_id, crate::store::DOC_SHELF).await
    }

    async fn push_shelf(&self, user_id: &str, shelf: &Shelf) -> Result<()> {
        self.push_doc(user_id, crate::store::DOC_SHELF, shelf).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_url_normalizes_trailing_slash() {
        let remote = HttpRemote::new("https://sync.example/api/".to_string());
        assert_eq!(
            remote.doc_url("u-123", "journal"),
            "https://sync.example/api/u/u-123/journal"
        );
    }

    #[tokio::test]
    async fn test_null_remote_is_silent() {
        let remote = NullRemote;
        assert!(remote.fetch_journal("anyone").await.unwrap().is_none());
        remote.push_journal("anyone", &Journal::new()).await.unwrap();
        assert!(remote.fetch_shelf("anyone").await.unwrap().is_none());
        remote.push_shelf("anyone", &Shelf::default()).await.unwrap();
    }

    #[test]
    fn test_remote_kind_requires_identity_and_base() {
        let mut cfg = Config {
            sqlite_path: ":memory:".to_string(),
            remote_base: Some("https://sync.example".to_string()),
            user_id: None,
            draw_delay_ms: 0,
            sync_max_retries: 1,
            report_days: 30,
        };
        assert_eq!(RemoteKind::detect(&cfg), RemoteKind::Null, "base without identity");
        cfg.user_id = Some("u-9".to_string());
        assert_eq!(RemoteKind::detect(&cfg), RemoteKind::Http);
        cfg.remote_base = None;
        assert_eq!(RemoteKind::detect(&cfg), RemoteKind::Null, "identity without base");
    }
}
