//! Supabase GoTrue client — password sign-in, sign-out, persisted session.
//!
//! Thin HTTP wrapper for `/auth/v1/token` and `/auth/v1/logout`. Pure
//! parsing in `parse_session_response` and `error_message` for testability.
//!
//! STORAGE
//! =======
//! The signed-in session is cached in memory and, when a session file is
//! configured, written as JSON so a restart resumes the same session. The
//! store validates whatever comes back; this module never judges expiry.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::{AUTH_CHANGE_CAPACITY, AuthBackend, AuthChange, AuthError, AuthEvent};
use crate::config::SupabaseConfig;
use crate::session::{Session, now_secs};

// =============================================================================
// CLIENT
// =============================================================================

pub struct SupabaseAuth {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    session_file: Option<PathBuf>,
    current: Mutex<Option<Session>>,
    events: broadcast::Sender<AuthChange>,
}

impl SupabaseAuth {
    /// Build a client from a configured [`SupabaseConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotConfigured`] if the configuration does not
    /// pass the configuration check, or [`AuthError::HttpClientBuild`] if
    /// the HTTP client cannot be constructed.
    pub fn new(config: &SupabaseConfig) -> Result<Self, AuthError> {
        let (Some(base_url), Some(anon_key)) = (config.base_url(), config.anon_key.as_deref()) else {
            return Err(AuthError::NotConfigured);
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| AuthError::HttpClientBuild(e.to_string()))?;
        let (events, _) = broadcast::channel(AUTH_CHANGE_CAPACITY);
        Ok(Self {
            http,
            base_url: base_url.to_owned(),
            anon_key: anon_key.trim().to_owned(),
            session_file: config.session_file.clone(),
            current: Mutex::new(None),
            events,
        })
    }

    fn token_url(&self) -> String {
        format!("{}/auth/v1/token?grant_type=password", self.base_url)
    }

    fn logout_url(&self) -> String {
        format!("{}/auth/v1/logout", self.base_url)
    }

    fn cached(&self) -> Option<Session> {
        self.current.lock().ok().and_then(|guard| guard.clone())
    }

    fn set_cached(&self, session: Option<Session>) {
        if let Ok(mut guard) = self.current.lock() {
            *guard = session;
        }
    }

    fn notify(&self, event: AuthEvent, session: Option<Session>) {
        // No receivers is fine: nobody is listening yet.
        let _ = self.events.send(AuthChange { event, session });
    }

    async fn revoke_remote(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .http
            .post(self.logout_url())
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        // An already-revoked or unknown token is as signed out as it gets.
        if response.status().is_success() || matches!(status, 401 | 403 | 404) {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(AuthError::Response { status, message: error_message(status, &text) })
    }
}

#[async_trait::async_trait]
impl AuthBackend for SupabaseAuth {
    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        if let Some(session) = self.cached() {
            return Ok(Some(session));
        }
        let Some(path) = &self.session_file else {
            return Ok(None);
        };
        let session = load_session(path).await?;
        if session.is_some() {
            self.set_cached(session.clone());
        }
        Ok(session)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let response = self
            .http
            .post(self.token_url())
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(AuthError::Response { status, message: error_message(status, &text) });
        }

        let session = parse_session_response(&text, now_secs())?;
        if let Some(path) = &self.session_file {
            if let Err(e) = save_session(path, &session).await {
                warn!(error = %e, "session not persisted; keeping it in memory only");
            }
        }
        self.set_cached(Some(session.clone()));
        debug!("password sign-in accepted");
        self.notify(AuthEvent::SignedIn, Some(session));
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let session = match self.cached() {
            Some(session) => Some(session),
            None => match &self.session_file {
                Some(path) => load_session(path).await.unwrap_or_default(),
                None => None,
            },
        };

        let remote = match session.as_ref().map(|s| s.access_token.trim()) {
            Some(token) if !token.is_empty() => self.revoke_remote(token).await,
            _ => Ok(()),
        };

        // Local state is cleared even when the remote revoke failed.
        self.set_cached(None);
        if let Some(path) = &self.session_file {
            if let Err(e) = clear_session(path).await {
                warn!(error = %e, "failed to remove persisted session");
            }
        }
        self.notify(AuthEvent::SignedOut, None);
        remote
    }
}

// =============================================================================
// PARSING
// =============================================================================

#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    #[serde(flatten)]
    session: Session,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Decode a `/token` response body, deriving `expires_at` from
/// `expires_in` when the backend omits it.
pub(crate) fn parse_session_response(body: &str, now_secs: i64) -> Result<Session, AuthError> {
    let resp: TokenResponse =
        serde_json::from_str(body).map_err(|e| {
            AuthError::Parse(format!("{:?} error at line {} column {}", e.classify(), e.line(), e.column()))
        })?;
    let mut session = resp.session;
    if session.expires_at.is_none() {
        session.expires_at = resp.expires_in.map(|secs| now_secs.saturating_add(secs));
    }
    Ok(session)
}

/// Pick the most descriptive message out of a GoTrue error body.
pub(crate) fn error_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error_description", "msg", "message", "error"] {
            if let Some(msg) = value.get(key).and_then(serde_json::Value::as_str) {
                if !msg.trim().is_empty() {
                    return msg.to_owned();
                }
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() { format!("auth request failed with status {status}") } else { trimmed.to_owned() }
}

// =============================================================================
// PERSISTENCE
// =============================================================================

pub(crate) async fn load_session(path: &Path) -> Result<Option<Session>, AuthError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| AuthError::Storage(format!("{}: {e}", path.display()))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AuthError::Storage(format!("{}: {e}", path.display()))),
    }
}

pub(crate) async fn save_session(path: &Path, session: &Session) -> Result<(), AuthError> {
    let json = serde_json::to_string(session).map_err(|e| AuthError::Storage(e.to_string()))?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| AuthError::Storage(format!("{}: {e}", path.display())))
}

pub(crate) async fn clear_session(path: &Path) -> Result<(), AuthError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AuthError::Storage(format!("{}: {e}", path.display()))),
    }
}

#[cfg(test)]
#[path = "supabase_test.rs"]
mod tests;
