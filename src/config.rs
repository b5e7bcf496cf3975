//! Environment-driven configuration. Every knob is an env var with a
//! default; there are no config files.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    /// Local SQLite document store path.
    pub sqlite_path: String,
    /// Remote document store base URL; unset means local-only.
    pub remote_base: Option<String>,
    /// Opaque identity for remote sync; unset means anonymous (sync no-ops).
    pub user_id: Option<String>,
    /// Presentational suspense before a draw resolves. Zero is valid.
    pub draw_delay_ms: u64,
    /// Bounded retries per remote push/fetch attempt.
    pub sync_max_retries: u32,
    /// Default trailing window for the report command.
    pub report_days: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            sqlite_path: env::var("SQLITE_PATH").unwrap_or_else(|_| "habitlog.sqlite".to_string()),
            remote_base: env::var("REMOTE_BASE").ok().filter(|v| !v.is_empty()),
            user_id: env::var("USER_ID").ok().filter(|v| !v.is_empty()),
            draw_delay_ms: env::var("DRAW_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1200),
            sync_max_retries: env::var("SYNC_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            report_days: env::var("REPORT_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        }
    }
}
