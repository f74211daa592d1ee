//! Session model and the validity predicate shared by the store and guard.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity record mirrored from the auth backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend-assigned user identifier.
    pub id: Uuid,
    /// Email address, if the account has one.
    #[serde(default)]
    pub email: Option<String>,
}

/// Backend-issued authentication grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub user: Option<User>,
    /// Opaque bearer credential. Absent in the payload deserializes as empty.
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Expiry in epoch seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl Session {
    /// Validity against the current wall clock.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(now_millis())
    }

    /// A session is valid when it names a user, carries a non-blank access
    /// token, and has not reached its expiry (if it has one).
    #[must_use]
    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        if self.user.is_none() {
            return false;
        }
        if self.access_token.trim().is_empty() {
            return false;
        }
        match self.expires_at {
            Some(expires_at) => expires_at.saturating_mul(1000) > now_ms,
            None => true,
        }
    }
}

/// `is_valid` lifted over an optional session; `None` is never valid.
#[must_use]
pub fn is_valid(session: Option<&Session>) -> bool {
    session.is_some_and(Session::is_valid)
}

/// Current wall-clock time in epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

/// Current wall-clock time in epoch seconds.
#[must_use]
pub fn now_secs() -> i64 {
    now_millis() / 1000
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
