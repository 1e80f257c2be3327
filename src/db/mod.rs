// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistence layer: remote (Firestore) and local (SQLite) backends.

pub mod backend;
pub mod firestore;
pub mod kv;
pub mod local;
pub mod notify;

pub use backend::{Backend, BackendKind, DayBackend, ErrorCallback, SnapshotCallback, Subscription};
pub use firestore::FirestoreBackend;
pub use kv::KvStore;
pub use local::LocalBackend;
pub use notify::ChangeNotifier;

use crate::config::Config;
use crate::error::AppError;

/// Collection names as constants.
pub mod collections {
    /// One document per day, keyed by day id
    pub const TRAVEL_PLANS: &str = "travel_plans";
}

/// Key of the serialized collection in the local store.
pub const LOCAL_STORAGE_KEY: &str = "beijing_travel_data";

/// Outcome of backend selection at startup.
pub struct BackendSelection {
    pub backend: Backend,
    /// Why the remote backend was configured but not used.
    pub fallback_reason: Option<String>,
}

/// Pick the backend for the lifetime of the process.
///
/// Complete remote credentials select Firestore; if the client cannot be
/// constructed the local store is used instead and the failure recorded.
/// Anything less than complete credentials selects the local store directly.
pub async fn select_backend(config: &Config) -> Result<BackendSelection, AppError> {
    if config.remote.is_complete() {
        match FirestoreBackend::new(&config.remote.project_id, &config.collection).await {
            Ok(remote) => {
                tracing::info!(project = %config.remote.project_id, "Using remote backend");
                return Ok(BackendSelection {
                    backend: Backend::Remote(remote),
                    fallback_reason: None,
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "Remote backend unavailable, falling back to local store");
                let local = LocalBackend::open_or_memory(&config.local_store_path)?;
                return Ok(BackendSelection {
                    backend: Backend::Local(local),
                    fallback_reason: Some(e.to_string()),
                });
            }
        }
    }

    tracing::info!(path = %config.local_store_path, "No remote credentials, using local store");
    let local = LocalBackend::open_or_memory(&config.local_store_path)?;
    Ok(BackendSelection {
        backend: Backend::Local(local),
        fallback_reason: None,
    })
}
