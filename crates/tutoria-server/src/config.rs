//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tutoria_shared::constants::{DEFAULT_HTTP_PORT, DEFAULT_STORE_TIMEOUT_MS};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP / WebSocket (axum) server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Filesystem path of the SQLite history database.
    /// Env: `DATABASE_PATH`
    /// Default: platform data directory (see `tutoria_store::Database::new`).
    pub database_path: Option<PathBuf>,

    /// Timeout applied to every persistence call; expiry surfaces as
    /// `StoreUnavailable` instead of hanging the session.
    /// Env: `STORE_TIMEOUT_MS`
    /// Default: `2000`
    pub store_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: None,
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(
                    value = %addr,
                    "Invalid HTTP_ADDR, using default"
                );
            }
        }

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            config.database_path = Some(PathBuf::from(path));
        }

        if let Ok(val) = std::env::var("STORE_TIMEOUT_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                config.store_timeout = Duration::from_millis(ms);
            } else {
                tracing::warn!(
                    value = %val,
                    "Invalid STORE_TIMEOUT_MS, using default"
                );
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.database_path, None);
        assert_eq!(config.store_timeout, Duration::from_millis(2000));
    }
}
