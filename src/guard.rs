//! Route guard — decides whether a protected view renders.
//!
//! Pure function of the latest published [`AuthState`] and the
//! Configuration Status; re-evaluated on every render.

use crate::session::is_valid;
use crate::store::AuthState;

pub const LOGIN_PATH: &str = "/login";

/// Navigation to another surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub to: String,
    /// Replace the current history entry instead of pushing a new one, so
    /// going back from login skips the guarded page.
    pub replace: bool,
}

/// Outcome of a single guarded render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// First resolution still pending; show a loading indicator.
    Loading,
    Redirect(Redirect),
    Render,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteGuard {
    configured: bool,
}

impl RouteGuard {
    #[must_use]
    pub fn new(configured: bool) -> Self {
        Self { configured }
    }

    #[must_use]
    pub fn login_path(&self) -> &'static str {
        LOGIN_PATH
    }

    /// Redirect to the login surface, replacing the guarded entry.
    #[must_use]
    pub fn to_login(&self) -> Redirect {
        Redirect { to: LOGIN_PATH.to_owned(), replace: true }
    }

    #[must_use]
    pub fn evaluate(&self, state: &AuthState) -> GuardDecision {
        evaluate(state, self.configured, LOGIN_PATH)
    }
}

/// Loading wins; then configuration, presence, and validity must all hold.
#[must_use]
pub fn evaluate(state: &AuthState, configured: bool, login_path: &str) -> GuardDecision {
    if state.loading {
        return GuardDecision::Loading;
    }
    let allowed = configured && state.user.is_some() && is_valid(state.session.as_ref());
    if allowed {
        GuardDecision::Render
    } else {
        GuardDecision::Redirect(Redirect { to: login_path.to_owned(), replace: true })
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
