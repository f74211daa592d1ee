//! Auth routes — login form, sign-in, sign-out, guard extractor.
//!
//! DESIGN
//! ======
//! The store holds one session for the whole process. A browser proves it
//! owns that session with an HttpOnly cookie carrying the session's access
//! token, issued on sign-in and cleared on sign-out. Requests without a
//! matching cookie are treated as signed out before the guard runs.

use std::time::Duration as StdDuration;

use axum::Form;
use axum::extract::{FromRef, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;
use tracing::{info, warn};

use super::AppState;
use crate::config::env_bool;
use crate::guard::{self, GuardDecision};
use crate::session::{Session, User};
use crate::store::{AuthState, AuthStatus, SessionStore};
use crate::views;

pub const ADMIN_PATH: &str = "/admin";
pub const SESSION_COOKIE: &str = "gallery_session";
const LOGGED_OUT_NOTICE: &str = "You have been successfully logged out.";
const NO_VALID_SESSION: &str = "Sign-in did not produce a valid session. Please try again.";

/// How long a form post waits for the auth-change stream to catch up
/// before answering.
const SETTLE_TIMEOUT: StdDuration = StdDuration::from_secs(2);

pub(crate) fn cookie_secure() -> bool {
    env_bool("COOKIE_SECURE").unwrap_or(false)
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(cookie_secure())
        .build()
}

fn cleared_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(cookie_secure())
        .max_age(Duration::ZERO)
        .build()
}

fn session_token(jar: &CookieJar) -> Option<&str> {
    jar.get(SESSION_COOKIE).map(Cookie::value).filter(|v| !v.is_empty())
}

/// Whether the request's cookie names the currently published session.
fn holds_session(jar: &CookieJar, auth: &AuthState) -> bool {
    match (session_token(jar), auth.session.as_ref()) {
        (Some(token), Some(session)) => session.access_token == token,
        _ => false,
    }
}

// =============================================================================
// GUARD EXTRACTOR
// =============================================================================

/// Signed-in user, present only when the request carries the session
/// cookie and the route guard renders.
/// Use as a handler parameter to protect the handler.
#[derive(Debug)]
pub struct Protected {
    pub user: User,
    pub session: Session,
}

/// The guard declined to render.
#[derive(Debug)]
pub enum GuardRejection {
    Loading,
    Redirect(guard::Redirect),
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        match self {
            // Ask the client to re-run the guard shortly.
            Self::Loading => (
                [("refresh", "1"), ("cache-control", "no-store")],
                Html(views::loading_page()),
            )
                .into_response(),
            // 303 replaces the guarded navigation rather than stacking on it.
            Self::Redirect(r) => Redirect::to(&r.to).into_response(),
        }
    }
}

impl<S> axum::extract::FromRequestParts<S> for Protected
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GuardRejection;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(token) = session_token(&jar) else {
            return Err(GuardRejection::Redirect(app.guard.to_login()));
        };

        let auth = app.store.state();
        match app.guard.evaluate(&auth) {
            GuardDecision::Loading => Err(GuardRejection::Loading),
            GuardDecision::Redirect(r) => Err(GuardRejection::Redirect(r)),
            GuardDecision::Render => match (auth.user, auth.session) {
                (Some(user), Some(session)) if session.access_token == token => Ok(Self { user, session }),
                _ => Err(GuardRejection::Redirect(app.guard.to_login())),
            },
        }
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    logged_out: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    email: String,
    password: String,
}

/// `GET /login` — login form; a browser already holding the session goes
/// straight to the admin panel.
pub async fn login_form(State(state): State<AppState>, jar: CookieJar, Query(query): Query<LoginQuery>) -> Response {
    let auth = state.store.state();
    if holds_session(&jar, &auth) && state.guard.evaluate(&auth) == GuardDecision::Render {
        return Redirect::to(ADMIN_PATH).into_response();
    }
    let notice = query.logged_out.is_some().then_some(LOGGED_OUT_NOTICE);
    Html(views::login_page(None, notice, "")).into_response()
}

/// `POST /login` — password sign-in; sets the session cookie once the new
/// session is published. Errors are shown inline.
pub async fn login(State(state): State<AppState>, jar: CookieJar, Form(form): Form<LoginForm>) -> Response {
    let email = form.email.trim();
    let mut rx = state.store.watch();
    rx.borrow_and_update();

    if let Err(e) = state.store.sign_in(email, &form.password).await {
        warn!(error = %e, "sign-in failed");
        return (StatusCode::UNAUTHORIZED, Html(views::login_page(Some(&e.to_string()), None, email))).into_response();
    }

    if tokio::time::timeout(SETTLE_TIMEOUT, rx.changed()).await.is_err() {
        warn!("auth state did not settle after sign-in");
    }
    let auth = state.store.state();
    match auth.session {
        Some(session) if state.guard.evaluate(&auth) == GuardDecision::Render => {
            info!(email, "admin signed in");
            (jar.add(session_cookie(session.access_token)), Redirect::to(ADMIN_PATH)).into_response()
        }
        _ => {
            warn!(email, status = ?auth.status(), "sign-in did not produce a valid session");
            (StatusCode::UNAUTHORIZED, Html(views::login_page(Some(NO_VALID_SESSION), None, email))).into_response()
        }
    }
}

/// `POST /logout` — sign out, clear the cookie, then back to the login form
/// with a notice. Browsers not holding the session are only sent to login.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let login_path = state.guard.login_path();
    if !holds_session(&jar, &state.store.state()) {
        return (jar.add(cleared_session_cookie()), Redirect::to(login_path)).into_response();
    }

    if let Err(e) = state.store.sign_out().await {
        warn!(error = %e, "sign-out reported an error");
    }
    settle(&state.store, |s| !s.is_authenticated()).await;
    (jar.add(cleared_session_cookie()), Redirect::to(&format!("{login_path}?logged_out=1"))).into_response()
}

/// Public view of the auth state. Never includes tokens.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthStateView {
    pub status: AuthStatus,
    pub user: Option<User>,
    pub expires_at: Option<i64>,
}

impl From<&AuthState> for AuthStateView {
    fn from(state: &AuthState) -> Self {
        Self {
            status: state.status(),
            user: state.user.clone(),
            expires_at: state.session.as_ref().and_then(|s| s.expires_at),
        }
    }
}

/// `GET /api/auth/state` — current published auth state, for the browser
/// holding the session.
pub async fn state(State(state): State<AppState>, jar: CookieJar) -> Result<Json<AuthStateView>, StatusCode> {
    let auth = state.store.state();
    if !holds_session(&jar, &auth) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(AuthStateView::from(&auth)))
}

/// Wait until the store publishes a state matching `pred`, bounded by
/// [`SETTLE_TIMEOUT`].
async fn settle(store: &SessionStore, pred: impl FnMut(&AuthState) -> bool) {
    let mut rx = store.watch();
    if tokio::time::timeout(SETTLE_TIMEOUT, rx.wait_for(pred)).await.is_err() {
        warn!("auth state did not settle before redirect");
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
