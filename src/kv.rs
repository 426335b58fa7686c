//! Asynchronous key-value persistence.
//!
//! Every piece of application state lives as a JSON string under a
//! well-known key (see the `*_KEY` constants and `*_key` helpers).  The
//! [`KeyValueStore`] trait is the only storage contract the rest of the
//! crate sees: `get`/`set`/`remove` on single keys, nothing more.  There is
//! no multi-key atomicity and no locking; "ownership" of a key is purely a
//! naming convention.
//!
//! Three implementations:
//! - [`MemoryStore`]: a HashMap, for tests and `--ephemeral` runs.
//! - [`SqliteStore`]: a single `kv` table in SQLite, the durable default.
//! - [`FaultStore`]: wraps another store and fails a chosen write, so the
//!   intermediate states of multi-key operations are reachable in tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Key layout
// ---------------------------------------------------------------------------

/// Global user directory: array of `{username, password}`.
pub const USERS_KEY: &str = "users";
/// Active session copy: single `{username, password}`.
pub const ACTIVE_USER_KEY: &str = "user";
/// Global append-only post collection.
pub const PHOTOS_KEY: &str = "photos";

/// Per-user friend list key.
pub fn friends_key(username: &str) -> String {
    format!("friends_{username}")
}

/// Per-user incoming friend request key.
pub fn friend_requests_key(username: &str) -> String {
    format!("friend_requests_{username}")
}

/// Per-user outgoing friend request key.
pub fn sent_requests_key(username: &str) -> String {
    format!("sent_requests_{username}")
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    Io(std::io::Error),
    /// A stored value failed to parse as the expected shape.  Distinct from
    /// a missing key, which callers treat as the empty collection.
    Corrupt { key: String, detail: String },
    /// An injected failure from [`FaultStore`].
    Fault(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Sqlite(e) => write!(f, "sqlite error: {e}"),
            StoreError::Io(e) => write!(f, "io error: {e}"),
            StoreError::Corrupt { key, detail } => {
                write!(f, "corrupt value under key {key}: {detail}")
            }
            StoreError::Fault(msg) => write!(f, "injected fault: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Sqlite(e)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// Asynchronous string-keyed persistent store.  Single-key operations only;
/// callers sequence their own multi-key writes and live with the
/// consequences of a failure between them.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the raw value under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete `key`.  Deleting an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Shared handle to a store, as held by the web layer and session state.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Decode a JSON array value, treating a missing key as empty and a
/// malformed value as [`StoreError::Corrupt`].
pub fn decode_list<T: DeserializeOwned>(
    key: &str,
    raw: Option<String>,
) -> Result<Vec<T>, StoreError> {
    match raw {
        None => Ok(Vec::new()),
        Some(s) => serde_json::from_str(&s).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            detail: e.to_string(),
        }),
    }
}

/// Decode a single JSON value, treating a missing key as `None`.
pub fn decode_value<T: DeserializeOwned>(
    key: &str,
    raw: Option<String>,
) -> Result<Option<T>, StoreError> {
    match raw {
        None => Ok(None),
        Some(s) => serde_json::from_str(&s)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                key: key.to_string(),
                detail: e.to_string(),
            }),
    }
}

/// Serialize a value for storage.
pub fn encode_value<T: Serialize>(key: &str, value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Corrupt {
        key: key.to_string(),
        detail: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// HashMap-backed store.  State dies with the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.lock().remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SQLite store
// ---------------------------------------------------------------------------

/// Default database filename inside the data directory.
pub fn db_path(data_dir: &Path) -> PathBuf {
    data_dir.join("moment.db")
}

/// SQLite-backed store: one `kv` table mapping key to JSON value.  The
/// operations here are short single-row statements, run directly on the
/// connection under a mutex.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a database at the given path. Creates schema if needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;
        Ok(store)
    }

    /// Create an in-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> Result<(), StoreError> {
        self.lock().execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock();
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.lock().execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.lock()
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fault-injecting store
// ---------------------------------------------------------------------------

/// Wraps another store and fails exactly one chosen write.
///
/// Multi-key mutations are sequences of independent writes with no rollback;
/// this wrapper makes each intermediate state reachable on demand.  Write
/// numbering is 1-based and counts `set` calls only; reads and removes pass
/// through untouched, as do writes before and after the chosen one.
pub struct FaultStore {
    inner: SharedStore,
    fail_on_write: usize,
    writes_seen: AtomicUsize,
}

impl FaultStore {
    /// Fail the `n`th `set` call (1-based); everything else passes through.
    pub fn failing_on_write(inner: SharedStore, n: usize) -> Self {
        Self {
            inner,
            fail_on_write: n,
            writes_seen: AtomicUsize::new(0),
        }
    }

    /// Number of `set` calls observed so far, including the failed one.
    pub fn writes_seen(&self) -> usize {
        self.writes_seen.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl KeyValueStore for FaultStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let n = self.writes_seen.fetch_add(1, Ordering::Relaxed) + 1;
        if n == self.fail_on_write {
            return Err(StoreError::Fault(format!(
                "write #{n} to {key} failed by configuration"
            )));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.get("missing").await.unwrap().is_none());

        store.set("users", "[]").await.unwrap();
        assert_eq!(store.get("users").await.unwrap().as_deref(), Some("[]"));

        store.remove("users").await.unwrap();
        assert!(store.get("users").await.unwrap().is_none());
        // removing an absent key is fine
        store.remove("users").await.unwrap();
    }

    #[tokio::test]
    async fn sqlite_store_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = db_path(tmp.path());

        let store = SqliteStore::open(&path).unwrap();
        store.set("user", r#"{"username":"alice"}"#).await.unwrap();
        store.set("user", r#"{"username":"bob"}"#).await.unwrap();
        drop(store);

        // Values survive a reopen, and the second set replaced the first.
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(
            store.get("user").await.unwrap().as_deref(),
            Some(r#"{"username":"bob"}"#)
        );
        store.remove("user").await.unwrap();
        assert!(store.get("user").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sqlite_in_memory_store_works() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set("photos", "[]").await.unwrap();
        assert_eq!(store.get("photos").await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn fault_store_fails_only_the_chosen_write() {
        let inner: SharedStore = Arc::new(MemoryStore::new());
        let store = FaultStore::failing_on_write(Arc::clone(&inner), 2);

        store.set("a", "1").await.unwrap();
        let err = store.set("b", "2").await.unwrap_err();
        assert!(matches!(err, StoreError::Fault(_)));
        store.set("c", "3").await.unwrap();

        // The failed write never reached the inner store.
        assert_eq!(inner.get("a").await.unwrap().as_deref(), Some("1"));
        assert!(inner.get("b").await.unwrap().is_none());
        assert_eq!(inner.get("c").await.unwrap().as_deref(), Some("3"));
        assert_eq!(store.writes_seen(), 3);
    }

    #[test]
    fn decode_list_defaults_missing_to_empty() {
        let list: Vec<String> = decode_list("friends_alice", None).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn decode_list_rejects_malformed_values() {
        let err = decode_list::<String>("friends_alice", Some("{not json".into())).unwrap_err();
        match err {
            StoreError::Corrupt { key, .. } => assert_eq!(key, "friends_alice"),
            other => panic!("expected Corrupt, got {other:?}"),
        }
    }

    #[test]
    fn key_helpers_match_layout() {
        assert_eq!(friends_key("alice"), "friends_alice");
        assert_eq!(friend_requests_key("alice"), "friend_requests_alice");
        assert_eq!(sent_requests_key("alice"), "sent_requests_alice");
    }
}
