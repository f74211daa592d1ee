//! Admin panel routes. Every handler here takes [`Protected`].

use axum::response::{Html, Redirect};

use super::auth::{ADMIN_PATH, Protected};
use crate::views;

/// `GET /` — the admin server has no public pages of its own.
pub async fn index() -> Redirect {
    Redirect::to(ADMIN_PATH)
}

/// `GET /admin` — admin panel landing page.
pub async fn dashboard(auth: Protected) -> Html<String> {
    Html(views::admin_page(&auth.user))
}
