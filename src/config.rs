//! Configuration module for tripdesk.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::time::Duration;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port for the web server (default: 8080)
    pub http_port: u16,
    /// Path to the SQLite database file (default: "tripdesk.db")
    pub db_path: String,
    /// Read-only SQLite connections shared by concurrent reads (default: 4)
    pub db_readers: usize,
    /// Token admin requests must present. `None` rejects every admin request.
    pub admin_token: Option<String>,
    /// Items per category in the dashboard's recent-activity lists (default: 5)
    pub recent_limit: usize,
    /// Upper bound on one dashboard aggregation (default: 30s, `None` = unbounded)
    pub stats_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            db_path: "tripdesk.db".to_string(),
            db_readers: crate::db::DEFAULT_READERS,
            admin_token: None,
            recent_limit: 5,
            stats_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `TRIPDESK_HTTP_PORT`: HTTP port (default: 8080)
    /// - `TRIPDESK_DB_PATH`: Database file path (default: "tripdesk.db")
    /// - `TRIPDESK_DB_READERS`: Read connections, at least 1 (default: 4)
    /// - `TRIPDESK_ADMIN_TOKEN`: Admin bearer/cookie token (default: unset)
    /// - `TRIPDESK_RECENT_LIMIT`: Recent items per category (default: 5)
    /// - `TRIPDESK_STATS_TIMEOUT_SECS`: Aggregation timeout, 0 disables (default: 30)
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(port) = lookup("TRIPDESK_HTTP_PORT").and_then(|s| s.parse().ok()) {
            cfg.http_port = port;
        }

        if let Some(db_path) = lookup("TRIPDESK_DB_PATH") {
            cfg.db_path = db_path;
        }

        if let Some(readers) = lookup("TRIPDESK_DB_READERS")
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&n| n > 0)
        {
            cfg.db_readers = readers;
        }

        cfg.admin_token = lookup("TRIPDESK_ADMIN_TOKEN")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        if let Some(limit) = lookup("TRIPDESK_RECENT_LIMIT").and_then(|s| s.parse().ok()) {
            cfg.recent_limit = limit;
        }

        if let Some(secs) = lookup("TRIPDESK_STATS_TIMEOUT_SECS").and_then(|s| s.parse::<u64>().ok()) {
            cfg.stats_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        cfg
    }
}
