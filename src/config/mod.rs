//! Key-value settings storage backed by SQLite.
//!
//! Command-line flags win over stored settings; stored settings win over
//! built-in defaults. Only the keys in [`KEYS`] are accepted.

use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use std::sync::{Mutex, PoisonError};

/// Endpoint for the HTTP remover.
pub const REMOVER_ENDPOINT: &str = "remover.endpoint";
/// Bearer token for the HTTP remover.
pub const REMOVER_API_KEY: &str = "remover.api_key";
/// Removal timeout in seconds.
pub const REMOVER_TIMEOUT_SECS: &str = "remover.timeout_secs";
/// Colour tolerance for the chroma remover.
pub const CHROMA_TOLERANCE: &str = "chroma.tolerance";
/// Directory downloads are saved into.
pub const DOWNLOAD_DIR: &str = "download.dir";

pub const KEYS: &[&str] = &[
    REMOVER_ENDPOINT,
    REMOVER_API_KEY,
    REMOVER_TIMEOUT_SECS,
    CHROMA_TOLERANCE,
    DOWNLOAD_DIR,
];

/// Persistent key-value settings store.
pub struct Config {
    conn: Mutex<Connection>,
}

impl Config {
    /// Open or create the config table in the given database.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("failed to open config database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS config (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .context("failed to create config table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get a config value by key.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stmt = conn.prepare("SELECT value FROM config WHERE key = ?1")?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Get a value and parse it, naming the key on failure.
    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key)? {
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|e| anyhow::anyhow!("invalid value for {key} ({raw:?}): {e}")),
            None => Ok(None),
        }
    }

    /// Set a config value (upsert). Unknown keys are refused.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        check_key(key)?;
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    /// Remove a config key. Unknown keys are refused.
    pub fn remove(&self, key: &str) -> Result<()> {
        check_key(key)?;
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute("DELETE FROM config WHERE key = ?1", [key])?;
        Ok(())
    }

    /// All stored pairs, sorted by key.
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stmt = conn.prepare("SELECT key, value FROM config ORDER BY key ASC")?;
        let pairs = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pairs)
    }
}

fn check_key(key: &str) -> Result<()> {
    if !KEYS.contains(&key) {
        bail!("unknown config key: {key} (known: {})", KEYS.join(", "));
    }
    Ok(())
}
