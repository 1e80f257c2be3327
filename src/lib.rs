// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Itinerary planner: day-by-day trip plans with reservation reminders.
//!
//! This crate provides the backend API for editing itinerary days and their
//! activities, persisted either to Firestore or to a local SQLite store.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Backend;
use services::Planner;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub planner: Planner<Backend>,
    /// Set when remote credentials were present but the remote backend failed.
    pub fallback_reason: Option<String>,
}
