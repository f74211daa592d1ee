//! Auth backend contract consumed by the session store.
//!
//! DESIGN
//! ======
//! The store only talks to the hosted service through [`AuthBackend`], so it
//! can be driven by [`supabase::SupabaseAuth`] in production and by an
//! in-memory backend in tests. Auth changes are pushed over a
//! `tokio::sync::broadcast` channel; each subscriber gets its own receiver.

pub mod supabase;

use tokio::sync::broadcast;

use crate::session::Session;

/// Capacity of the auth-change broadcast channel. Auth changes are rare;
/// a lagging receiver only ever needs the latest one.
pub const AUTH_CHANGE_CAPACITY: usize = 16;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by auth backend operations. `Display` strings are shown
/// to the operator on the login page.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Connection settings are missing or placeholders; no call was made.
    #[error("Supabase is not configured")]
    NotConfigured,

    /// The HTTP request could not be completed.
    #[error("auth request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status.
    #[error("{message}")]
    Response { status: u16, message: String },

    /// The backend response body could not be decoded.
    #[error("auth response parse failed: {0}")]
    Parse(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// Reading or writing the persisted session failed.
    #[error("session storage error: {0}")]
    Storage(String),
}

// =============================================================================
// AUTH CHANGES
// =============================================================================

/// What happened on the backend side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
}

/// A pushed auth change carrying the candidate session (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

// =============================================================================
// CONTRACT
// =============================================================================

#[async_trait::async_trait]
pub trait AuthBackend: Send + Sync {
    /// One-shot fetch of the currently persisted session.
    async fn get_session(&self) -> Result<Option<Session>, AuthError>;

    /// Subscribe to pushed auth changes. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;

    /// Password sign-in. On success the new session arrives as an
    /// [`AuthEvent::SignedIn`] change, not as a return value.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<(), AuthError>;

    /// Sign out and purge the persisted session.
    async fn sign_out(&self) -> Result<(), AuthError>;
}

// =============================================================================
// TEST HELPERS
// =============================================================================
