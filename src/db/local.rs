// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local durable backend.
//!
//! The whole collection is one JSON blob under a single key. The store is not
//! observable, so every write is followed by a [`ChangeNotifier`] broadcast and
//! interested parties re-read through `subscribe`.
//!
//! Each read-modify-write runs under one connection guard in a single SQLite
//! transaction, so the planner's concurrently spawned saves cannot drop each
//! other's days. There is no compare-and-swap against other processes sharing
//! the file: their writes interleave last-write-wins.
//!
//! A blob that cannot be parsed is read as absent (the seed is shown), but is
//! never overwritten: writes against it fail with [`AppError::Storage`].

use tokio::sync::broadcast;

use super::backend::{BackendKind, DayBackend, ErrorCallback, SnapshotCallback, Subscription};
use super::kv::KvStore;
use super::notify::ChangeNotifier;
use super::LOCAL_STORAGE_KEY;
use crate::error::AppError;
use crate::models::Day;

/// Local key/value backed implementation of [`DayBackend`].
#[derive(Clone)]
pub struct LocalBackend {
    store: KvStore,
    notifier: ChangeNotifier,
    key: String,
}

impl LocalBackend {
    pub fn new(store: KvStore, notifier: ChangeNotifier) -> Self {
        Self {
            store,
            notifier,
            key: LOCAL_STORAGE_KEY.to_string(),
        }
    }

    /// Open the store file, falling back to an in-memory store if it cannot be
    /// opened.
    pub fn open_or_memory(path: &str) -> Result<Self, AppError> {
        let store = match KvStore::open(path) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!(path, error = %e, "Local store unavailable, using in-memory store");
                KvStore::open_in_memory()?
            }
        };
        Ok(Self::new(store, ChangeNotifier::default()))
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// First-run collection: a single empty day dated today.
    pub fn seed() -> Vec<Day> {
        vec![Day::today()]
    }

    /// Read the stored collection. Unparsable data is treated as absent.
    fn read(&self) -> Result<Option<Vec<Day>>, AppError> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(None);
        };
        match serde_json::from_str::<Vec<Day>>(&raw) {
            Ok(days) => Ok(Some(days)),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Stored itinerary is corrupt, ignoring it");
                Ok(None)
            }
        }
    }

    /// Current collection, bootstrapping the seed on first run.
    fn load_or_seed(&self) -> Result<Vec<Day>, AppError> {
        let mut seeded = None;
        self.store.update(&self.key, |current| {
            if current.is_some() {
                return Ok(None);
            }
            let seed = Self::seed();
            let raw = serde_json::to_string(&seed)?;
            seeded = Some(seed);
            Ok(Some(raw))
        })?;

        if let Some(seed) = seeded {
            tracing::info!(key = %self.key, "Wrote default itinerary");
            return Ok(seed);
        }
        Ok(self.read()?.unwrap_or_else(Self::seed))
    }

    /// Apply `edit` to the stored collection and write it back. An absent
    /// key gives `edit` nothing to work on; unparsable data is an error.
    fn modify<F>(&self, edit: F) -> Result<Option<usize>, AppError>
    where
        F: FnOnce(Option<Vec<Day>>) -> Option<Vec<Day>>,
    {
        let mut count = None;
        self.store.update(&self.key, |current| {
            let days = current.map(parse_stored).transpose()?;
            let Some(days) = edit(days) else {
                return Ok(None);
            };
            count = Some(days.len());
            Ok(Some(serde_json::to_string(&days)?))
        })?;
        Ok(count)
    }
}

fn parse_stored(raw: &str) -> Result<Vec<Day>, AppError> {
    serde_json::from_str(raw).map_err(|e| {
        AppError::Storage(format!(
            "Stored itinerary is unreadable, refusing to overwrite it: {e}"
        ))
    })
}

impl DayBackend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    /// One synchronous read; nothing to tear down afterwards.
    async fn subscribe(&self, on_change: SnapshotCallback, on_error: ErrorCallback) -> Subscription {
        match self.load_or_seed() {
            Ok(days) => on_change(days),
            Err(e) => {
                tracing::error!(error = %e, "Failed to read local store");
                on_change(Self::seed());
                on_error(e);
            }
        }
        Subscription::detached()
    }

    async fn save(&self, day: &Day) -> Result<(), AppError> {
        let count = self.modify(|days| {
            let mut days = days.unwrap_or_default();
            match days.iter_mut().find(|d| d.id == day.id) {
                Some(existing) => *existing = day.clone(),
                None => days.push(day.clone()),
            }
            Some(days)
        })?;
        tracing::debug!(day_id = %day.id, count = ?count, "Saved day locally");

        self.notifier.notify();
        Ok(())
    }

    async fn delete(&self, day_id: &str) -> Result<(), AppError> {
        let count = self.modify(|days| {
            let mut days = days?;
            days.retain(|d| d.id != day_id);
            Some(days)
        })?;
        let Some(count) = count else {
            return Ok(());
        };
        tracing::debug!(day_id, count, "Deleted day locally");

        self.notifier.notify();
        Ok(())
    }

    fn change_signal(&self) -> Option<broadcast::Receiver<()>> {
        Some(self.notifier.subscribe())
    }
}
