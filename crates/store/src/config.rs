//! Store configuration.

use std::env;

use common::{
    DatabaseConfig, DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_DATABASE_URL, DEFAULT_MAX_CONNECTIONS,
    DEFAULT_MIN_CONNECTIONS,
};

/// Store configuration.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// Connection pool and command settings
    pub database: DatabaseConfig,
}

impl StoreConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let url = env::var("STORE_DATABASE_URL")
            .or_else(|_| env::var("DATABASE_URL"))
            .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        Self {
            database: DatabaseConfig {
                url,
                raw_url: env::var("STORE_RAW_DATABASE_URL").ok(),
                max_connections: env::var("STORE_DB_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_MAX_CONNECTIONS),
                min_connections: env::var("STORE_DB_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_MIN_CONNECTIONS),
                command_timeout_secs: env::var("STORE_COMMAND_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS),
            },
        }
    }
}
