//! Router assembly for the local admin server.
//!
//! SYSTEM CONTEXT
//! ==============
//! One [`SessionStore`] backs every request. Sign-in binds that session to
//! the signing browser through an HttpOnly cookie; admin pages take the
//! [`auth::Protected`] extractor, which checks the cookie and then runs the
//! route guard against the latest published state.

pub mod admin;
pub mod auth;

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::guard::RouteGuard;
use crate::store::SessionStore;

/// Shared router state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub guard: RouteGuard,
}

impl AppState {
    /// Guard configuration follows the store's Configuration Status.
    #[must_use]
    pub fn new(store: Arc<SessionStore>) -> Self {
        let guard = RouteGuard::new(store.is_configured());
        Self { store, guard }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(admin::index))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/admin", get(admin::dashboard))
        .route("/api/auth/state", get(auth::state))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
