// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable key/value store backed by a single SQLite table.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::AppError;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv_store (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);";

/// Thread-safe handle to the key/value table. Clones share one connection.
#[derive(Clone)]
pub struct KvStore {
    conn: Arc<Mutex<Connection>>,
}

impl KvStore {
    /// Open (or create) a store file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        tracing::info!(path = %path.display(), "Opened local store");
        Self::bootstrap(conn)
    }

    /// Store that lives only as long as the process.
    pub fn open_in_memory() -> Result<Self, AppError> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> Result<Self, AppError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.conn
            .lock()
            .map_err(|_| AppError::Storage("Local store lock poisoned".to_string()))
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let value = self
            .lock()?
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.lock()?.execute(
            "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Read-modify-write `key` under one connection guard and transaction.
    ///
    /// `edit` sees the current value; returning `Some` stores a new value,
    /// `None` leaves the row untouched. Returns whether a value was written.
    pub fn update<F>(&self, key: &str, edit: F) -> Result<bool, AppError>
    where
        F: FnOnce(Option<&str>) -> Result<Option<String>, AppError>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let current: Option<String> = tx
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        let Some(next) = edit(current.as_deref())? else {
            return Ok(false);
        };
        tx.execute(
            "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, next],
        )?;
        tx.commit()?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set() {
        let store = KvStore::open_in_memory().unwrap();
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "one").unwrap();
        store.set("k", "two").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn test_update_sees_current_value() {
        let store = KvStore::open_in_memory().unwrap();

        let wrote = store
            .update("k", |current| {
                assert_eq!(current, None);
                Ok(Some("1".to_string()))
            })
            .unwrap();
        assert!(wrote);

        let wrote = store
            .update("k", |current| Ok(current.map(|v| format!("{v}+1"))))
            .unwrap();
        assert!(wrote);
        assert_eq!(store.get("k").unwrap().as_deref(), Some("1+1"));

        assert!(!store.update("k", |_| Ok(None)).unwrap());
        assert_eq!(store.get("k").unwrap().as_deref(), Some("1+1"));
    }

    #[test]
    fn test_failed_update_leaves_value() {
        let store = KvStore::open_in_memory().unwrap();
        store.set("k", "keep").unwrap();

        let result = store.update("k", |_| Err(AppError::Storage("refused".to_string())));
        assert!(matches!(result, Err(AppError::Storage(_))));
        assert_eq!(store.get("k").unwrap().as_deref(), Some("keep"));
    }

    #[test]
    fn test_concurrent_updates_do_not_lose_writes() {
        let store = KvStore::open_in_memory().unwrap();
        store.set("n", "0").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        store
                            .update("n", |current| {
                                let n: u32 = current.unwrap_or("0").parse().unwrap();
                                Ok(Some((n + 1).to_string()))
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get("n").unwrap().as_deref(), Some("200"));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trip.db");

        KvStore::open(&path).unwrap().set("k", "[]").unwrap();
        let reopened = KvStore::open(&path).unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("[]"));
    }
}
