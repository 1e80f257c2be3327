// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Itinerary Planner API Server
//!
//! Serves a day-by-day trip itinerary kept in Firestore when credentials are
//! configured, or in a local SQLite store otherwise.

use itinerary_planner::{config::Config, db::select_backend, services::Planner, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Itinerary Planner API");

    let selection = select_backend(&config).await?;
    let planner = Planner::new(selection.backend);
    planner.start().await;

    // Persistence failures are already logged; surface them once more with
    // the backend they came from.
    let mut failures = planner.failures();
    let backend_kind = planner.status().backend;
    tokio::spawn(async move {
        while let Ok(failure) = failures.recv().await {
            tracing::warn!(
                backend = ?backend_kind,
                operation = %failure.operation,
                day_id = ?failure.day_id,
                "Itinerary change not persisted"
            );
        }
    });

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        planner: planner.clone(),
        fallback_reason: selection.fallback_reason,
    });

    // Build router
    let app = itinerary_planner::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    planner.stop();
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("itinerary_planner=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
