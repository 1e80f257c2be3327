// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Remote credentials are optional: when the required ones are missing the
//! planner runs against the local store.

use std::env;

const DEFAULT_COLLECTION: &str = "travel_plans";
const DEFAULT_LOCAL_STORE_PATH: &str = "itinerary.db";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";
const DEFAULT_PORT: u16 = 8080;

/// Credentials for the remote document store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Web API key (required)
    pub api_key: String,
    /// GCP / Firebase project ID (required)
    pub project_id: String,
    pub auth_domain: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
}

impl RemoteConfig {
    /// All required credential fields are present.
    ///
    /// There is no partial-credential mode: anything less means local.
    pub fn is_complete(&self) -> bool {
        !self.api_key.is_empty() && !self.project_id.is_empty()
    }

    fn from_env() -> Self {
        Self {
            api_key: env_trimmed("FIREBASE_API_KEY"),
            project_id: env_trimmed("FIREBASE_PROJECT_ID"),
            auth_domain: env_trimmed("FIREBASE_AUTH_DOMAIN"),
            storage_bucket: env_trimmed("FIREBASE_STORAGE_BUCKET"),
            messaging_sender_id: env_trimmed("FIREBASE_MESSAGING_SENDER_ID"),
            app_id: env_trimmed("FIREBASE_APP_ID"),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub remote: RemoteConfig,
    /// Remote collection holding one document per day
    pub collection: String,
    /// SQLite file backing the local store
    pub local_store_path: String,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
}

impl Config {
    /// Config for testing: no remote credentials, default names.
    pub fn test_default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            collection: DEFAULT_COLLECTION.to_string(),
            local_store_path: DEFAULT_LOCAL_STORE_PATH.to_string(),
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            port: DEFAULT_PORT,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let port = match env::var("PORT") {
            Ok(raw) if !raw.trim().is_empty() => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT", raw.clone()))?,
            _ => DEFAULT_PORT,
        };

        Ok(Self {
            remote: RemoteConfig::from_env(),
            collection: env_or("ITINERARY_COLLECTION", DEFAULT_COLLECTION),
            local_store_path: env_or("LOCAL_STORE_PATH", DEFAULT_LOCAL_STORE_PATH),
            frontend_url: env_or("FRONTEND_URL", DEFAULT_FRONTEND_URL),
            port,
        })
    }
}

fn env_trimmed(name: &str) -> String {
    env::var(name)
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

fn env_or(name: &str, default: &str) -> String {
    let value = env_trimmed(name);
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1:?}")]
    Invalid(&'static str, String),
}
