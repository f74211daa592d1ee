//! Backend and server configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Missing or placeholder Supabase settings are not an error: the admin
//! server still starts, but every guarded page redirects to login and
//! sign-in reports that the backend is not configured.

use std::path::PathBuf;

pub const SUPABASE_URL_VAR: &str = "SUPABASE_URL";
pub const SUPABASE_ANON_KEY_VAR: &str = "SUPABASE_ANON_KEY";

/// Values shipped in `.env.example`; treated as unset.
pub const PLACEHOLDER_URL: &str = "your_supabase_project_url";
pub const PLACEHOLDER_ANON_KEY: &str = "your_supabase_anon_key";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;

// =============================================================================
// SUPABASE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

/// Connection settings for the hosted auth backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    /// Where the signed-in session is persisted between runs.
    pub session_file: Option<PathBuf>,
    pub timeouts: HttpTimeouts,
}

impl SupabaseConfig {
    /// Build from environment variables.
    ///
    /// - `SUPABASE_URL`, `SUPABASE_ANON_KEY`: connection settings
    /// - `SUPABASE_SESSION_FILE`: optional session persistence path
    /// - `SUPABASE_REQUEST_TIMEOUT_SECS`: default 30
    /// - `SUPABASE_CONNECT_TIMEOUT_SECS`: default 10
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            url: std::env::var(SUPABASE_URL_VAR).ok(),
            anon_key: std::env::var(SUPABASE_ANON_KEY_VAR).ok(),
            session_file: std::env::var("SUPABASE_SESSION_FILE")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            timeouts: HttpTimeouts {
                request_secs: env_parse("SUPABASE_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
                connect_secs: env_parse("SUPABASE_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
            },
        }
    }

    /// Config with explicit connection settings and defaults elsewhere.
    #[must_use]
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            anon_key: Some(anon_key.into()),
            session_file: None,
            timeouts: HttpTimeouts::default(),
        }
    }

    /// Configuration Status: both settings present, non-blank, not the
    /// shipped placeholders, and the URL uses an HTTP(S) scheme.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        is_configured(self.url.as_deref(), self.anon_key.as_deref())
    }

    /// Base URL without a trailing slash, if configured.
    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        if !self.is_configured() {
            return None;
        }
        self.url.as_deref().map(|u| u.trim().trim_end_matches('/'))
    }
}

/// Pure form of [`SupabaseConfig::is_configured`].
#[must_use]
pub fn is_configured(url: Option<&str>, anon_key: Option<&str>) -> bool {
    let (Some(url), Some(key)) = (url, anon_key) else {
        return false;
    };
    if url.trim().is_empty() || key.trim().is_empty() {
        return false;
    }
    if url == PLACEHOLDER_URL || key == PLACEHOLDER_ANON_KEY {
        return false;
    }
    reqwest::Url::parse(url.trim()).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

// =============================================================================
// SERVER
// =============================================================================

/// Listen address for the admin server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
}

impl ServerConfig {
    /// Build from `BIND_ADDR` (default `127.0.0.1`) and `PORT` (default 3000).
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            port: env_parse("PORT", DEFAULT_PORT),
        }
    }

    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Parse a boolean flag; unrecognised values read as unset.
pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
