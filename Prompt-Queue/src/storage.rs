use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::error;

/// Key under which the last-used [`BatchConfig`](crate::BatchConfig) is kept.
pub const LAST_CONFIG_KEY: &str = "generation-config";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key         TEXT PRIMARY KEY,
    value_json  TEXT NOT NULL,
    updated_at  DATETIME DEFAULT CURRENT_TIMESTAMP
);
"#;

/// A small JSON key-value store backed by SQLite.
///
/// Every operation swallows its own failures: errors are logged, writes
/// become no-ops and reads return `None`. Only [`open()`](Self::open) can fail.
pub struct LocalStore {
    conn: Mutex<Connection>,
}

impl LocalStore {
    /// Open (or create) the store. Pass `None` for an in-memory store.
    pub fn open(path: Option<&Path>) -> crate::Result<Self> {
        let conn = open_database(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = self.try_set(key, value) {
            error!(key, error = %format!("{:#}", e), "Local store set error");
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(e) => {
                error!(key, error = %format!("{:#}", e), "Local store get error");
                None
            }
        }
    }

    pub fn remove(&self, key: &str) {
        let result = self.lock().and_then(|conn| {
            conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
                .context("Failed to delete key")
        });
        if let Err(e) = result {
            error!(key, error = %format!("{:#}", e), "Local store remove error");
        }
    }

    pub fn clear(&self) {
        let result = self.lock().and_then(|conn| {
            conn.execute("DELETE FROM kv", [])
                .context("Failed to clear store")
        });
        if let Err(e) = result {
            error!(error = %format!("{:#}", e), "Local store clear error");
        }
    }

    pub fn has(&self, key: &str) -> bool {
        let result = self.lock().and_then(|conn| {
            conn.query_row("SELECT 1 FROM kv WHERE key = ?1", params![key], |_| Ok(()))
                .optional()
                .context("Failed to look up key")
        });
        match result {
            Ok(found) => found.is_some(),
            Err(e) => {
                error!(key, error = %format!("{:#}", e), "Local store has error");
                false
            }
        }
    }

    fn try_set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value).context("Failed to serialize value")?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv (key, value_json) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json,
                                            updated_at = CURRENT_TIMESTAMP",
            params![key, json],
        )
        .context("Failed to write key")?;
        Ok(())
    }

    fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value_json FROM kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read key")?;
        drop(conn);

        match raw {
            Some(json) if !json.is_empty() => {
                let value = serde_json::from_str(&json)
                    .with_context(|| format!("Stored value for '{}' is not valid JSON", key))?;
                Ok(Some(value))
            }
            _ => Ok(None),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Local store mutex poisoned: {}", e))
    }
}

fn open_database(path: Option<&Path>) -> Result<Connection> {
    let conn = match path {
        Some(p) => Connection::open(p).context("Failed to open local store")?,
        None => Connection::open_in_memory().context("Failed to open in-memory store")?,
    };

    conn.execute_batch("PRAGMA busy_timeout = 5000;")
        .context("Failed to set PRAGMA options")?;
    conn.execute_batch(SCHEMA)
        .context("Failed to create store schema")?;

    Ok(conn)
}
