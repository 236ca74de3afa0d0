// Configuration constants, loaded from the environment (or .env) with defaults.

use std::env;
use std::time::Duration;

lazy_static::lazy_static! {
    pub static ref GEMINI_API_URL: String = env::var("GEMINI_API_URL").unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string());
    pub static ref GEMINI_MODEL: String = env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-pro".to_string());
    pub static ref TEMPLATES_DIR: String = env::var("NUTRILOG_TEMPLATES_DIR").unwrap_or_else(|_| "templates".to_string());
    /// Idle time after which a browser session (and its meal log) is dropped.
    pub static ref SESSION_IDLE_TTL: Duration = Duration::from_secs(
        env::var("NUTRILOG_SESSION_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60 * 60),
    );
    pub static ref STATIC_DIR: String = env::var("NUTRILOG_STATIC_DIR").unwrap_or_else(|_| "static".to_string());
}

/// Name of the cookie that carries the browser session id.
pub const SESSION_COOKIE: &str = "nutrilog_session";
