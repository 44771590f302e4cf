// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use crate::models::NextOrderPolicy;
use std::env;
use std::time::Duration;

/// Which document store backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    /// In-process store; data is lost on restart.
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    pub store_backend: StoreBackend,
    /// Poll interval for live feeds on backends without push delivery
    pub subscription_poll_interval: Duration,
    /// How the admin document form picks a default order value
    pub document_next_order: NextOrderPolicy,

    // --- Secrets ---
    /// Signing key for session tokens issued after identity-provider sign-in
    pub session_signing_key: Vec<u8>,
    /// Site-wide access gate credentials; `None` disables the gate
    pub access_gate: Option<GateCredentials>,
    /// Passphrase for the admin area; `None` disables the admin area entirely
    pub admin_passphrase: Option<String>,
}

/// Shared username/password for the site-wide basic-auth gate.
#[derive(Debug, Clone)]
pub struct GateCredentials {
    pub username: String,
    pub password: String,
}

impl Config {
    /// Config for tests: memory store, gate disabled, known admin passphrase.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:3000".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            subscription_poll_interval: Duration::from_secs(5),
            document_next_order: NextOrderPolicy::CurrentMax,
            session_signing_key: b"test_session_key_32_bytes_min!!".to_vec(),
            access_gate: None,
            admin_passphrase: Some("test_admin_passphrase".to_string()),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let store_backend = match env::var("STORE_BACKEND").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            Ok("firestore") | Err(_) => StoreBackend::Firestore,
            Ok(_) => return Err(ConfigError::Invalid("STORE_BACKEND")),
        };

        let document_next_order = match env::var("DOCUMENT_NEXT_ORDER").as_deref() {
            Ok("max_plus_one") => NextOrderPolicy::MaxPlusOne,
            Ok("max") | Err(_) => NextOrderPolicy::CurrentMax,
            Ok(_) => return Err(ConfigError::Invalid("DOCUMENT_NEXT_ORDER")),
        };

        let access_gate = match (
            non_empty_var("ACCESS_GATE_USERNAME"),
            non_empty_var("ACCESS_GATE_PASSWORD"),
        ) {
            (Some(username), Some(password)) => Some(GateCredentials { username, password }),
            (None, None) => None,
            _ => return Err(ConfigError::Invalid("ACCESS_GATE_USERNAME/ACCESS_GATE_PASSWORD")),
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            store_backend,
            subscription_poll_interval: Duration::from_secs(
                env::var("SUBSCRIPTION_POLL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5),
            ),
            document_next_order,

            session_signing_key: env::var("SESSION_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("SESSION_SIGNING_KEY"))?
                .into_bytes(),
            access_gate,
            admin_passphrase: non_empty_var("ADMIN_PASSPHRASE"),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("SESSION_SIGNING_KEY", "test_session_key_32_bytes_min!!");
        env::set_var("STORE_BACKEND", "memory");
        env::set_var("DOCUMENT_NEXT_ORDER", "max_plus_one");
        env::set_var("ADMIN_PASSPHRASE", "  open sesame ");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.document_next_order, NextOrderPolicy::MaxPlusOne);
        assert_eq!(config.admin_passphrase.as_deref(), Some("open sesame"));
        assert_eq!(config.port, 8080);
    }
}
