//! Runtime configuration from environment variables with code defaults.
//! CLI flags override these after parsing; nothing here touches the network.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_STATE_DIR: &str = ".libris";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the library API server.
    pub api_url: String,
    /// Directory holding the persisted token pair and profile cache.
    pub state_dir: PathBuf,
    /// Defensive per-request timeout; the upstream contract specifies none.
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let api_url = std::env::var("LIBRIS_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let state_dir = std::env::var("LIBRIS_STATE_DIR").unwrap_or_else(|_| DEFAULT_STATE_DIR.to_string());
        let timeout_secs = std::env::var("LIBRIS_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self {
            api_url,
            state_dir: PathBuf::from(state_dir),
            http_timeout: Duration::from_secs(timeout_secs),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            http_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}
