//! Session store — the single authoritative auth state for the process.
//!
//! ARCHITECTURE
//! ============
//! Two producers publish state: the one-time initial session fetch and the
//! auth-change listener task. Both run the same validate-then-publish step.
//! `sign_in` / `sign_out` never publish; their effect arrives through the
//! auth-change stream, so the listener stays the only writer after startup.
//!
//! TRADE-OFFS
//! ==========
//! Pushed changes are last-writer-wins. The initial fetch is the exception:
//! if any change has been published since the subscription was taken, the
//! fetched session is older than what we already hold and is dropped
//! (including its purge, which could otherwise sign out a fresh login).

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::{AuthBackend, AuthChange, AuthError};
use crate::config::{SUPABASE_ANON_KEY_VAR, SUPABASE_URL_VAR};
use crate::session::{Session, User};

// =============================================================================
// AUTH STATE
// =============================================================================

/// Tri-state view of [`AuthState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    Loading,
    Authenticated,
    Unauthenticated,
}

/// Published auth state. Starts loading; `user` and `session` are either
/// both set (validated) or both empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<User>,
    pub session: Option<Session>,
    pub loading: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self { user: None, session: None, loading: true }
    }
}

impl AuthState {
    #[must_use]
    pub fn unauthenticated() -> Self {
        Self { user: None, session: None, loading: false }
    }

    /// Resolve a candidate session: valid sessions authenticate, anything
    /// else (missing, expired, blank token, no user) does not.
    #[must_use]
    pub fn resolve(candidate: Option<Session>) -> Self {
        match candidate {
            Some(session) if session.is_valid() => {
                let user = session.user.clone();
                Self { user, session: Some(session), loading: false }
            }
            _ => Self::unauthenticated(),
        }
    }

    #[must_use]
    pub fn status(&self) -> AuthStatus {
        if self.loading {
            AuthStatus::Loading
        } else if self.user.is_some() && self.session.is_some() {
            AuthStatus::Authenticated
        } else {
            AuthStatus::Unauthenticated
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.status() == AuthStatus::Authenticated
    }
}

// =============================================================================
// STORE
// =============================================================================

struct Shared {
    backend: Option<Arc<dyn AuthBackend>>,
    state: watch::Sender<AuthState>,
    /// Count of auth changes published so far. Held while publishing so the
    /// initial fetch can tell whether a change overtook it.
    epoch: Mutex<u64>,
}

impl Shared {
    fn publish_change(&self, change: AuthChange) {
        let next = AuthState::resolve(change.session);
        debug!(event = ?change.event, status = ?next.status(), "auth change");
        let Ok(mut epoch) = self.epoch.lock() else {
            return;
        };
        *epoch += 1;
        self.state.send_replace(next);
    }

    /// Publish the initial fetch result unless a change has landed since
    /// `seen`. Returns whether it was published.
    fn publish_initial(&self, seen: u64, next: AuthState) -> bool {
        let Ok(epoch) = self.epoch.lock() else {
            return false;
        };
        if *epoch != seen {
            return false;
        }
        self.state.send_replace(next);
        true
    }

    fn current_epoch(&self) -> u64 {
        self.epoch.lock().map_or(0, |e| *e)
    }
}

/// Owns the auth state and the auth-change subscription.
///
/// Construct one per process (or per test), call [`SessionStore::initialize`]
/// once, and [`SessionStore::teardown`] (or drop) on shutdown.
pub struct SessionStore {
    shared: Arc<Shared>,
    subscription: Mutex<Option<JoinHandle<()>>>,
}

impl SessionStore {
    /// `None` means the backend is not configured: the store resolves to
    /// unauthenticated and never makes a backend call.
    #[must_use]
    pub fn new(backend: Option<Arc<dyn AuthBackend>>) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            shared: Arc::new(Shared { backend, state, epoch: Mutex::new(0) }),
            subscription: Mutex::new(None),
        }
    }

    /// Configuration Status as seen by the store.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.shared.backend.is_some()
    }

    /// Snapshot of the latest published state.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.shared.state.borrow().clone()
    }

    /// Receiver notified on every publish.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<AuthState> {
        self.shared.state.subscribe()
    }

    /// Subscribe to auth changes, then resolve the current session.
    ///
    /// Never fails: fetch errors and invalid sessions resolve to
    /// unauthenticated. Only the first call subscribes.
    pub async fn initialize(&self) {
        let Some(backend) = self.shared.backend.clone() else {
            warn!(
                "auth backend not configured: set {SUPABASE_URL_VAR} and {SUPABASE_ANON_KEY_VAR} \
                 (e.g. in .env); the admin panel stays locked until then"
            );
            self.shared.state.send_replace(AuthState::unauthenticated());
            return;
        };

        let seen = {
            let Ok(mut slot) = self.subscription.lock() else {
                return;
            };
            if slot.is_some() {
                debug!("session store already initialized");
                return;
            }
            let rx = backend.subscribe();
            *slot = Some(spawn_listener(self.shared.clone(), rx));
            self.shared.current_epoch()
        };

        let next = match backend.get_session().await {
            Ok(candidate) => {
                let next = AuthState::resolve(candidate.clone());
                if candidate.is_some() && !next.is_authenticated() && self.shared.current_epoch() == seen {
                    info!("purging invalid stored session");
                    let backend = backend.clone();
                    tokio::spawn(async move {
                        if let Err(e) = backend.sign_out().await {
                            debug!(error = %e, "invalid session purge failed");
                        }
                    });
                }
                next
            }
            Err(e) => {
                warn!(error = %e, "error getting session");
                AuthState::unauthenticated()
            }
        };

        if self.shared.publish_initial(seen, next) {
            debug!(status = ?self.state().status(), "initial session resolved");
        } else {
            debug!("initial session superseded by a newer auth change");
        }
    }

    /// Release the auth-change subscription. Idempotent.
    pub fn teardown(&self) {
        let handle = match self.subscription.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            handle.abort();
            debug!("auth change subscription released");
        }
    }

    /// Password sign-in. State changes arrive via the auth-change stream.
    ///
    /// # Errors
    ///
    /// [`AuthError::NotConfigured`] without a backend call when unconfigured,
    /// otherwise whatever the backend reports.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let Some(backend) = &self.shared.backend else {
            return Err(AuthError::NotConfigured);
        };
        backend.sign_in_with_password(email, password).await
    }

    /// Sign out. No-op when unconfigured.
    ///
    /// # Errors
    ///
    /// Returns the backend error, if any. Local state still follows the
    /// backend's auth-change stream.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        match &self.shared.backend {
            Some(backend) => backend.sign_out().await,
            None => Ok(()),
        }
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn spawn_listener(shared: Arc<Shared>, mut rx: broadcast::Receiver<AuthChange>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(change) => shared.publish_change(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "auth change listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
