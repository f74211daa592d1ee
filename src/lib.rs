//! Authentication core for the temple gallery admin panel.
//!
//! ARCHITECTURE
//! ============
//! Supabase (`backend`) pushes auth changes into the [`store::SessionStore`],
//! which validates every candidate [`session::Session`] and publishes a single
//! [`store::AuthState`]. The [`guard::RouteGuard`] reads that state to decide
//! whether a protected admin view renders or redirects to login. The
//! `routes` module mounts the guard in front of the admin pages.

pub mod backend;
pub mod config;
pub mod guard;
pub mod routes;
pub mod session;
pub mod store;
pub mod views;
