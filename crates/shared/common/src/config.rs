//! Shared configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_DATABASE_URL, DEFAULT_MAX_CONNECTIONS,
    DEFAULT_MIN_CONNECTIONS,
};

/// Database configuration.
///
/// `url` backs the persistence context; `raw_url` backs the raw command
/// connection and falls back to `url` when unset.
#[derive(Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default)]
    pub raw_url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub command_timeout_secs: u64,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"[REDACTED]")
            .field("raw_url", &self.raw_url.as_ref().map(|_| "[REDACTED]"))
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("command_timeout_secs", &self.command_timeout_secs)
            .finish()
    }
}

impl DatabaseConfig {
    /// URL used for the raw command connection.
    pub fn raw_url(&self) -> &str {
        self.raw_url.as_deref().unwrap_or(&self.url)
    }

    /// Default timeout applied to raw commands; zero disables it.
    pub fn command_timeout(&self) -> Option<Duration> {
        (self.command_timeout_secs > 0).then(|| Duration::from_secs(self.command_timeout_secs))
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            raw_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
        }
    }
}
