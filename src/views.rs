//! Server-rendered HTML for the login surface and the admin panel.
//!
//! Pages are Leptos views rendered to strings; text and attribute values
//! are escaped by the renderer.

use leptos::prelude::*;

use crate::session::User;

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:32rem;margin:4rem auto;padding:0 1rem}\
    .error{color:#b91c1c}.notice{color:#15803d}.avatar{display:inline-block;width:2.5rem;height:2.5rem;\
    border-radius:50%;background:#f59e0b;color:#fff;text-align:center;line-height:2.5rem;font-weight:600}";

/// Avatar initials: `first.last@…` → `FL`, otherwise the first letter of
/// the email, or `A` when there is no email.
#[must_use]
pub fn user_initials(user: &User) -> String {
    let Some(email) = user.email.as_deref().filter(|e| !e.is_empty()) else {
        return "A".into();
    };
    let local = email.split('@').next().unwrap_or_default();
    let parts: Vec<&str> = local.split('.').collect();
    if parts.len() >= 2 {
        let initials: String = parts[..2].iter().filter_map(|p| p.chars().next()).collect();
        if !initials.is_empty() {
            return initials.to_uppercase();
        }
    }
    email.chars().next().map(|c| c.to_uppercase().collect()).unwrap_or_else(|| "A".into())
}

#[component]
fn Shell(title: &'static str, children: Children) -> impl IntoView {
    view! {
        <html lang="en">
            <head>
                <meta charset="utf-8" />
                <title>{title}</title>
                <style>{STYLE}</style>
            </head>
            <body>{children()}</body>
        </html>
    }
}

fn render<V: IntoView>(page: impl FnOnce() -> V) -> String {
    let owner = Owner::new();
    let html = owner.with(|| page().to_html());
    format!("<!DOCTYPE html>{html}")
}

#[must_use]
pub fn loading_page() -> String {
    render(|| {
        view! {
            <Shell title="Loading…">
                <p role="status">"Loading..."</p>
            </Shell>
        }
    })
}

/// Login form with an optional inline error or notice.
#[must_use]
pub fn login_page(error: Option<&str>, notice: Option<&str>, email: &str) -> String {
    let error = error.map(str::to_owned);
    let notice = notice.map(str::to_owned);
    let email = email.to_owned();
    render(move || {
        view! {
            <Shell title="Admin Login">
                <h1>"Admin Login"</h1>
                {notice.map(|n| view! { <p class="notice" role="status">{n}</p> })}
                {error.map(|e| view! { <p class="error" role="alert">{e}</p> })}
                <form method="post" action="/login">
                    <label>"Email " <input type="email" name="email" value=email required=true /></label>
                    <br />
                    <label>"Password " <input type="password" name="password" required=true /></label>
                    <br />
                    <button type="submit">"Sign in"</button>
                </form>
            </Shell>
        }
    })
}

/// Admin panel landing page for a signed-in user.
#[must_use]
pub fn admin_page(user: &User) -> String {
    let initials = user_initials(user);
    let email = user.email.clone().unwrap_or_default();
    render(move || {
        view! {
            <Shell title="Temple Gallery Admin">
                <header>
                    <span class="avatar">{initials}</span>
                    " "
                    <strong>{email.clone()}</strong>
                    <form method="post" action="/logout" style="display:inline">
                        <button type="submit">"Log out"</button>
                    </form>
                </header>
                <h1>"Temple Gallery Admin"</h1>
                <p>"Signed in as " {email} "."</p>
            </Shell>
        }
    })
}

#[cfg(test)]
#[path = "views_test.rs"]
mod tests;
