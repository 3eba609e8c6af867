//! SQLite-backed persistent state for the bot.
//!
//! One database file holds a `bot_state` key/value table and the
//! `sync_state` table carrying the Matrix `/sync` position per user, so a
//! restart resumes where the previous run stopped instead of replaying
//! the room backlog.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{BotError, Result};

const BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS bot_state (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS sync_state (
        user_id TEXT PRIMARY KEY,
        filter_id TEXT,
        next_batch TEXT,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
];

/// Persistent state store.
///
/// Thread-safe via an internal `Mutex<Connection>`; writes are serialized
/// and WAL mode keeps readers unblocked on the SQLite side.
pub struct StateStore {
    conn: Mutex<Connection>,
}

impl StateStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let conn = Connection::open(path).map_err(storage_err)?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(storage_err)?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(storage_err)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(storage_err)?;
        for statement in SCHEMA {
            conn.execute(statement, []).map_err(storage_err)?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Store a `bot_state` value, replacing any existing one.
    pub fn put_state(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO bot_state (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                 value = excluded.value,
                 updated_at = CURRENT_TIMESTAMP",
            params![key, value],
        )
        .map_err(storage_err)?;
        Ok(())
    }

    /// Read a `bot_state` value.
    pub fn get_state(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT value FROM bot_state WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(storage_err)
    }

    /// Persist the `/sync` position for `user_id`.
    pub fn save_next_batch(&self, user_id: &str, next_batch: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sync_state (user_id, next_batch) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET
                 next_batch = excluded.next_batch,
                 updated_at = CURRENT_TIMESTAMP",
            params![user_id, next_batch],
        )
        .map_err(storage_err)?;
        Ok(())
    }

    /// Load the stored `/sync` position for `user_id`.
    pub fn load_next_batch(&self, user_id: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT next_batch FROM sync_state WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(storage_err)
        .map(Option::flatten)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| BotError::Storage("connection lock poisoned".into()))
    }
}

fn storage_err(err: rusqlite::Error) -> BotError {
    BotError::Storage(err.to_string())
}
