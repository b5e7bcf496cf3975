//! Local persistence: a single-file SQLite document store.
//!
//! Documents are whole JSON bodies keyed by name, written atomically per
//! row. A body that no longer parses is moved to a quarantine table and the
//! load recovers as an empty document, so a corrupted file never bricks the
//! app and never silently destroys what was there.

use anyhow::Result;
use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::journal::Journal;
use crate::logging::{log, obj, ts_epoch_ms, v_str, Domain, Level};
use crate::model::CoreError;
use crate::reward::Shelf;

pub const DOC_JOURNAL: &str = "journal";
pub const DOC_SHELF: &str = "rewards";

pub struct LocalStore {
    conn: Connection,
}

impl LocalStore {
    pub fn open(path: &str) -> Result<Self> {
        let store = Self {
            conn: Connection::open(path)?,
        };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS documents (
                name TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS documents_quarantine (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                body TEXT NOT NULL,
                quarantined_at INTEGER NOT NULL
            );
            COMMIT;",
        )?;
        Ok(())
    }

    pub fn load_journal(&mut self) -> Result<Journal> {
        self.load_document(DOC_JOURNAL)
    }

    pub fn save_journal(&self, journal: &Journal) -> Result<()> {
        self.save_document(DOC_JOURNAL, journal)
    }

    pub fn load_shelf(&mut self) -> Result<Shelf> {
        self.load_document(DOC_SHELF)
    }

    pub fn save_shelf(&self, shelf: &Shelf) -> Result<()> {
        self.save_document(DOC_SHELF, shelf)
    }

    /// Rows kept aside after failing to parse; recovery tooling reads these.
    pub fn quarantined_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents_quarantine", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn load_document<T: DeserializeOwned + Default>(&mut self, name: &str) -> Result<T> {
        let body = match self.read_body(name)? {
            Some(body) => body,
            None => return Ok(T::default()),
        };
        match serde_json::from_str(&body) {
            Ok(doc) => Ok(doc),
            Err(err) => {
                let reason = CoreError::MalformedPersistedData {
                    doc: name.to_string(),
                    detail: err.to_string(),
                };
                log(
                    Level::Warn,
                    Domain::Store,
                    "malformed_document",
                    obj(&[("doc", v_str(name)), ("error", v_str(&reason.to_string()))]),
                );
                self.quarantine(name, &body)?;
                Ok(T::default())
            }
        }
    }

    fn save_document<T: Serialize>(&self, name: &str, doc: &T) -> Result<()> {
        let body = serde_json::to_string(doc)?;
        self.conn.execute(
            "INSERT INTO documents (name, body, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
            params![name, body, ts_epoch_ms() as i64],
        )?;
        Ok(())
    }

    fn read_body(&self, name: &str) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT body FROM documents WHERE name = ?1")?;
        let mut rows = stmt.query(params![name])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Moves a bad body aside and clears the live row in one transaction.
    fn quarantine(&mut self, name: &str, body: &str) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO documents_quarantine (name, body, quarantined_at) VALUES (?1, ?2, ?3)",
            params![name, body, ts_epoch_ms() as i64],
        )?;
        tx.execute("DELETE FROM documents WHERE name = ?1", params![name])?;
        tx.commit()?;
        Ok(())
    }
}
