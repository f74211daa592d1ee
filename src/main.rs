use std::sync::Arc;

use gallery_auth::backend::AuthBackend;
use gallery_auth::backend::supabase::SupabaseAuth;
use gallery_auth::config::{ServerConfig, SupabaseConfig};
use gallery_auth::routes::{self, AppState};
use gallery_auth::store::SessionStore;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let supabase = SupabaseConfig::from_env();
    let server = ServerConfig::from_env();

    // Non-fatal: without a backend the admin panel stays locked.
    let backend: Option<Arc<dyn AuthBackend>> = if supabase.is_configured() {
        match SupabaseAuth::new(&supabase) {
            Ok(client) => {
                tracing::info!(url = supabase.base_url().unwrap_or_default(), "Supabase auth client initialized");
                Some(Arc::new(client))
            }
            Err(e) => {
                tracing::error!(error = %e, "Supabase auth client failed to build");
                None
            }
        }
    } else {
        None
    };

    let store = Arc::new(SessionStore::new(backend));
    let init = tokio::spawn({
        let store = store.clone();
        async move { store.initialize().await }
    });

    let app = routes::app(AppState::new(store.clone()));
    let listener = tokio::net::TcpListener::bind(server.listen_addr())
        .await
        .expect("failed to bind");

    tracing::info!(addr = %server.listen_addr(), "gallery admin listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");

    init.abort();
    store.teardown();
    tracing::info!("gallery admin stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
