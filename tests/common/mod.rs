// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use itinerary_planner::config::Config;
use itinerary_planner::db::{Backend, ChangeNotifier, FirestoreBackend, KvStore, LocalBackend};
use itinerary_planner::routes::create_router;
use itinerary_planner::services::Planner;
use itinerary_planner::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Connect to the emulator using a collection unique to this test.
#[allow(dead_code)]
pub async fn test_remote(collection: &str) -> FirestoreBackend {
    FirestoreBackend::new("test-project", collection)
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Collection name that no other test run shares.
#[allow(dead_code)]
pub fn unique_collection(prefix: &str) -> String {
    format!("{prefix}_{}", uuid::Uuid::new_v4().simple())
}

/// Local backend on a throwaway in-memory store.
#[allow(dead_code)]
pub fn test_local() -> LocalBackend {
    LocalBackend::new(
        KvStore::open_in_memory().expect("in-memory store"),
        ChangeNotifier::default(),
    )
}

/// Create a started test app over an in-memory local store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub async fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let planner = Planner::new(Backend::Local(test_local()));
    planner.start().await;

    let state = Arc::new(AppState {
        config: Config::test_default(),
        planner,
        fallback_reason: None,
    });

    (create_router(state.clone()), state)
}

/// Build a request with an optional JSON body.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
