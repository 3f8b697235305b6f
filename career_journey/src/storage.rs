//! Storage Module
//!
//! Durable key-value persistence for the progression stores.
//! Every store writes its full state as one JSON document under its own key
//! after each mutation and reads it back once when it is opened.
//!
//! Failures never reach the stores' callers: `load_json` falls back to
//! `None` and `save_json` / `clear_key` log a warning and move on.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

// ============================================================
// STORAGE KEYS
// ============================================================

pub const ACHIEVEMENTS_KEY: &str = "achievements";
pub const PROGRESS_KEY: &str = "progress";
pub const COURSE_KEY: &str = "course";
pub const USER_KEY: &str = "user";

/// Every key owned by the progression stores
pub const ALL_KEYS: [&str; 4] = [ACHIEVEMENTS_KEY, PROGRESS_KEY, COURSE_KEY, USER_KEY];

// ============================================================
// ERRORS
// ============================================================

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Storage lock poisoned")]
    Poisoned,

    #[error("Storage is read-only")]
    ReadOnly,
}

// ============================================================
// KEY-VALUE STORE TRAIT
// ============================================================

/// A durable string key-value store
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Handle shared by every store of one journey
pub type SharedStore = Arc<dyn KeyValueStore>;

// ============================================================
// SQLITE STORE
// ============================================================

/// SQLite-backed key-value store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a file-backed store
    pub fn new(db_path: Option<PathBuf>) -> Result<Self, StorageError> {
        let path = db_path.unwrap_or_else(|| PathBuf::from("career_journey.db"));
        log::debug!("[STORAGE] Opening database at {}", path.display());
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store for testing
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), StorageError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.conn()?;
        let value = conn
            .query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM kv_store WHERE key = ?1", [key])?;
        Ok(())
    }
}

// ============================================================
// IN-MEMORY STORE
// ============================================================

/// Map-backed store used by tests and throwaway sessions
#[derive(Default)]
pub struct InMemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
    read_only: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every write until switched back
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, StorageError> {
        self.entries.lock().map_err(|_| StorageError::Poisoned)
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StorageError::ReadOnly);
        }
        Ok(())
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.entries()?.remove(key);
        Ok(())
    }
}

// ============================================================
// JSON HELPERS
// ============================================================

/// Read and decode the document under `key`.
///
/// Missing keys, backend failures and malformed payloads all yield `None`;
/// the latter two are logged.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            log::warn!("[STORAGE] Failed to load '{}': {}", key, e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("[STORAGE] Ignoring malformed payload under '{}': {}", key, e);
            None
        }
    }
}

/// Encode and write `value` under `key`, logging any failure
pub fn save_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) {
    let result = serde_json::to_string(value)
        .map_err(StorageError::from)
        .and_then(|raw| store.set(key, &raw));

    if let Err(e) = result {
        log::warn!("[STORAGE] Failed to save '{}': {}", key, e);
    }
}

/// Remove `key`, logging any failure
pub fn clear_key(store: &dyn KeyValueStore, key: &str) {
    if let Err(e) = store.remove(key) {
        log::warn!("[STORAGE] Failed to clear '{}': {}", key, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_sqlite_set_get_remove() {
        let store = SqliteStore::in_memory().unwrap();

        assert_eq!(store.get("missing").unwrap(), None);

        store.set("course", "{\"a\":1}").unwrap();
        store.set("course", "{\"a\":2}").unwrap();
        assert_eq!(store.get("course").unwrap().as_deref(), Some("{\"a\":2}"));

        store.remove("course").unwrap();
        assert_eq!(store.get("course").unwrap(), None);
    }

    #[test]
    fn test_sqlite_file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journey.db");

        {
            let store = SqliteStore::new(Some(path.clone())).unwrap();
            store.set("user", "{\"fullName\":\"Ada\"}").unwrap();
        }

        let reopened = SqliteStore::new(Some(path)).unwrap();
        assert_eq!(
            reopened.get("user").unwrap().as_deref(),
            Some("{\"fullName\":\"Ada\"}")
        );
    }

    #[test]
    fn test_json_helpers() {
        let store = InMemoryStore::new();
        let sample = Sample {
            name: "lineworker".to_string(),
            count: 3,
        };

        save_json(&store, "sample", &sample);
        let loaded: Option<Sample> = load_json(&store, "sample");
        assert_eq!(loaded, Some(sample));

        clear_key(&store, "sample");
        let cleared: Option<Sample> = load_json(&store, "sample");
        assert!(cleared.is_none());
    }

    #[test]
    fn test_malformed_payload_loads_as_none() {
        let store = InMemoryStore::new();
        store.set("sample", "not json at all").unwrap();

        let loaded: Option<Sample> = load_json(&store, "sample");
        assert!(loaded.is_none());
    }

    #[test]
    fn test_read_only_store_swallows_saves() {
        let store = InMemoryStore::new();
        store.set_read_only(true);

        save_json(&store, "sample", &Sample { name: "x".to_string(), count: 1 });
        assert!(matches!(store.set("k", "v"), Err(StorageError::ReadOnly)));
        assert_eq!(store.get("sample").unwrap(), None);
    }
}
