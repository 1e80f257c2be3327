// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed remote backend.
//!
//! Every day is one document keyed by its id. Subscribers always receive the
//! whole collection: each listen event triggers a fresh query rather than
//! forwarding the delta. Writes are point writes and never touch local state;
//! the listener observes their effect and re-delivers.

use firestore::{FirestoreListenEvent, FirestoreListenerTarget, FirestoreMemListenStateStorage};
use tokio::sync::{mpsc, oneshot};

use super::backend::{BackendKind, DayBackend, ErrorCallback, SnapshotCallback, Subscription};
use super::collections;
use crate::error::AppError;
use crate::models::Day;

/// Listen target id; each listener has its own stream so one id suffices.
const LISTEN_TARGET: FirestoreListenerTarget = FirestoreListenerTarget::new(17_u32);

/// Firestore remote backend.
#[derive(Clone)]
pub struct FirestoreBackend {
    client: Option<firestore::FirestoreDb>,
    collection: String,
}

impl FirestoreBackend {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str, collection: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id, collection).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, collection, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
            collection: collection.to_string(),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str, collection: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            collection,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
            collection: collection.to_string(),
        })
    }

    /// Create an offline client for testing.
    ///
    /// Writes fail and subscriptions report a listener error.
    pub fn new_mock() -> Self {
        Self {
            client: None,
            collection: collections::TRAVEL_PLANS.to_string(),
        }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Fetch a single day by id.
    pub async fn get_day(&self, day_id: &str) -> Result<Option<Day>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(self.collection.as_str())
            .obj()
            .one(day_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch the whole collection.
    pub async fn list_days(&self) -> Result<Vec<Day>, AppError> {
        fetch_snapshot(self.get_client()?, &self.collection).await
    }
}

async fn fetch_snapshot(
    client: &firestore::FirestoreDb,
    collection: &str,
) -> Result<Vec<Day>, AppError> {
    client
        .fluent()
        .select()
        .from(collection)
        .obj()
        .query()
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

fn is_collection_change(event: &FirestoreListenEvent) -> bool {
    matches!(
        event,
        FirestoreListenEvent::DocumentChange(_)
            | FirestoreListenEvent::DocumentDelete(_)
            | FirestoreListenEvent::DocumentRemove(_)
    )
}

/// Deliver the initial snapshot, then re-deliver on every change until
/// `shutdown` fires (or its sender is dropped).
async fn run_listener(
    client: firestore::FirestoreDb,
    collection: String,
    deliver: SnapshotCallback,
    mut shutdown: oneshot::Receiver<()>,
) -> Result<(), AppError> {
    deliver(fetch_snapshot(&client, &collection).await?);

    let mut listener = client
        .create_listener(FirestoreMemListenStateStorage::new())
        .await
        .map_err(|e| AppError::Listener(format!("Failed to create listener: {}", e)))?;

    client
        .fluent()
        .select()
        .from(collection.as_str())
        .listen()
        .add_target(LISTEN_TARGET, &mut listener)
        .map_err(|e| AppError::Listener(format!("Failed to add listen target: {}", e)))?;

    let (changed_tx, mut changed_rx) = mpsc::unbounded_channel::<()>();
    listener
        .start(move |event| {
            let changed_tx = changed_tx.clone();
            async move {
                if is_collection_change(&event) {
                    let _ = changed_tx.send(());
                }
                Ok(())
            }
        })
        .await
        .map_err(|e| AppError::Listener(format!("Failed to start listener: {}", e)))?;

    tracing::info!(collection = %collection, "Listening for itinerary changes");

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = changed_rx.recv() => {
                if changed.is_none() {
                    break;
                }
                // Coalesce bursts (a save touches one doc but may emit several events).
                while changed_rx.try_recv().is_ok() {}
                match fetch_snapshot(&client, &collection).await {
                    Ok(days) => deliver(days),
                    Err(e) => tracing::warn!(error = %e, "Failed to refresh snapshot after change"),
                }
            }
        }
    }

    listener
        .shutdown()
        .await
        .map_err(|e| AppError::Listener(format!("Failed to stop listener: {}", e)))?;
    tracing::debug!(collection = %collection, "Listener stopped");
    Ok(())
}

impl DayBackend for FirestoreBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    async fn subscribe(&self, on_change: SnapshotCallback, on_error: ErrorCallback) -> Subscription {
        let subscription = Subscription::new();

        let client = match self.get_client() {
            Ok(client) => client.clone(),
            Err(e) => {
                tracing::error!(error = %e, "Cannot subscribe to itinerary changes");
                on_error(AppError::Listener(e.to_string()));
                return subscription;
            }
        };

        let deliver = subscription.gate(on_change);
        let shutdown = subscription.shutdown_signal();
        let collection = self.collection.clone();

        tokio::spawn(async move {
            if let Err(e) = run_listener(client, collection, deliver, shutdown).await {
                tracing::error!(error = %e, "Itinerary listener failed");
                on_error(e);
            }
        });

        subscription
    }

    async fn save(&self, day: &Day) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(self.collection.as_str())
            .document_id(&day.id)
            .object(day)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        tracing::debug!(day_id = %day.id, "Saved day to Firestore");
        Ok(())
    }

    async fn delete(&self, day_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(self.collection.as_str())
            .document_id(day_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        tracing::debug!(day_id, "Deleted day from Firestore");
        Ok(())
    }
}
