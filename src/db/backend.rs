// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Capability contract shared by the remote and local backends.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::{broadcast, oneshot};

use super::{FirestoreBackend, LocalBackend};
use crate::error::AppError;
use crate::models::Day;

/// Receives the full collection on every change.
pub type SnapshotCallback = Arc<dyn Fn(Vec<Day>) + Send + Sync>;

/// Receives subscription failures (reported once, never panics).
pub type ErrorCallback = Arc<dyn Fn(AppError) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Remote,
    Local,
}

/// Persistence operations every backend provides.
///
/// `subscribe` must deliver the current collection promptly (even if empty)
/// and again on every change. `save` upserts by id; `delete` of an absent id
/// is a no-op.
pub trait DayBackend: Send + Sync + 'static {
    fn kind(&self) -> BackendKind;

    fn subscribe(
        &self,
        on_change: SnapshotCallback,
        on_error: ErrorCallback,
    ) -> impl Future<Output = Subscription> + Send;

    fn save(&self, day: &Day) -> impl Future<Output = Result<(), AppError>> + Send;

    fn delete(&self, day_id: &str) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Process-wide "re-read now" signal for backends that cannot push.
    fn change_signal(&self) -> Option<broadcast::Receiver<()>> {
        None
    }
}

/// Handle returned by `subscribe`.
///
/// `unsubscribe` is idempotent and only affects this subscriber. Dropping the
/// handle also stops any background listener.
pub struct Subscription {
    active: Arc<AtomicBool>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

impl Subscription {
    pub(crate) fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
            shutdown: Mutex::new(None),
        }
    }

    /// Subscription with nothing to tear down.
    pub fn detached() -> Self {
        Self::new()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn unsubscribe(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            if let Some(tx) = self.shutdown.lock().ok().and_then(|mut s| s.take()) {
                let _ = tx.send(());
            }
        }
    }

    /// Wrap `on_change` so nothing is delivered after `unsubscribe`.
    pub(crate) fn gate(&self, on_change: SnapshotCallback) -> SnapshotCallback {
        let active = self.active.clone();
        Arc::new(move |days: Vec<Day>| {
            if active.load(Ordering::SeqCst) {
                on_change(days);
            }
        })
    }

    /// Receiver resolved when this subscription is cancelled or dropped.
    pub(crate) fn shutdown_signal(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        if let Ok(mut slot) = self.shutdown.lock() {
            *slot = Some(tx);
        }
        rx
    }
}

/// The active backend, chosen once by [`super::select_backend`].
#[derive(Clone)]
pub enum Backend {
    Remote(FirestoreBackend),
    Local(LocalBackend),
}

impl DayBackend for Backend {
    fn kind(&self) -> BackendKind {
        match self {
            Backend::Remote(b) => b.kind(),
            Backend::Local(b) => b.kind(),
        }
    }

    async fn subscribe(&self, on_change: SnapshotCallback, on_error: ErrorCallback) -> Subscription {
        match self {
            Backend::Remote(b) => b.subscribe(on_change, on_error).await,
            Backend::Local(b) => b.subscribe(on_change, on_error).await,
        }
    }

    async fn save(&self, day: &Day) -> Result<(), AppError> {
        match self {
            Backend::Remote(b) => b.save(day).await,
            Backend::Local(b) => b.save(day).await,
        }
    }

    async fn delete(&self, day_id: &str) -> Result<(), AppError> {
        match self {
            Backend::Remote(b) => b.delete(day_id).await,
            Backend::Local(b) => b.delete(day_id).await,
        }
    }

    fn change_signal(&self) -> Option<broadcast::Receiver<()>> {
        match self {
            Backend::Remote(b) => b.change_signal(),
            Backend::Local(b) => b.change_signal(),
        }
    }
}
