use super::*;
use crate::config::SupabaseConfig;
use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;

// =============================================================================
// parse_session_response
// =============================================================================

#[test]
fn parse_session_keeps_expires_at() {
    let body = r#"{"access_token":"jwt","token_type":"bearer","expires_in":3600,"expires_at":1700003600,
        "refresh_token":"r","user":{"id":"6f1c2a9e-6d3b-4e0e-9a41-0b6f3f1d9c11","email":"a@b.test"}}"#;
    let session = parse_session_response(body, 1_000).unwrap();
    assert_eq!(session.expires_at, Some(1_700_003_600));
    assert_eq!(session.access_token, "jwt");
    assert_eq!(session.refresh_token.as_deref(), Some("r"));
}

#[test]
fn parse_session_derives_expires_at_from_expires_in() {
    let body = r#"{"access_token":"jwt","expires_in":3600,"user":{"id":"6f1c2a9e-6d3b-4e0e-9a41-0b6f3f1d9c11"}}"#;
    let session = parse_session_response(body, 1_000).unwrap();
    assert_eq!(session.expires_at, Some(4_600));
}

#[test]
fn parse_session_without_any_expiry() {
    let body = r#"{"access_token":"jwt","user":{"id":"6f1c2a9e-6d3b-4e0e-9a41-0b6f3f1d9c11"}}"#;
    let session = parse_session_response(body, 1_000).unwrap();
    assert!(session.expires_at.is_none());
}

#[test]
fn parse_session_rejects_garbage() {
    let err = parse_session_response("<html>oops</html>", 0).unwrap_err();
    assert!(matches!(err, AuthError::Parse(_)));
}

#[test]
fn parse_error_does_not_echo_tokens() {
    let body = r#"{"access_token":"SECRET-ACCESS","refresh_token":"SECRET-REFRESH","user":{"id":"not-a-uuid"}}"#;
    let err = parse_session_response(body, 0).unwrap_err();
    let message = err.to_string();
    assert!(matches!(err, AuthError::Parse(_)));
    assert!(!message.contains("SECRET-ACCESS"));
    assert!(!message.contains("SECRET-REFRESH"));
}

// =============================================================================
// error_message
// =============================================================================

#[test]
fn error_message_prefers_error_description() {
    let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
    assert_eq!(error_message(400, body), "Invalid login credentials");
}

#[test]
fn error_message_falls_back_to_msg_then_message() {
    assert_eq!(error_message(422, r#"{"code":422,"msg":"Email not confirmed"}"#), "Email not confirmed");
    assert_eq!(error_message(500, r#"{"message":"boom"}"#), "boom");
    assert_eq!(error_message(400, r#"{"error":"invalid_grant"}"#), "invalid_grant");
}

#[test]
fn error_message_uses_raw_body_when_not_json() {
    assert_eq!(error_message(502, "  Bad Gateway  "), "Bad Gateway");
}

#[test]
fn error_message_empty_body_mentions_status() {
    assert_eq!(error_message(503, ""), "auth request failed with status 503");
}

// =============================================================================
// persistence
// =============================================================================

#[tokio::test]
async fn load_missing_file_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = load_session(&dir.path().join("absent.json")).await.unwrap();
    assert!(loaded.is_none());
}

#[tokio::test]
async fn save_then_load_session_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let session = crate::backend::test_helpers::valid_session("a@b.test");

    save_session(&path, &session).await.unwrap();
    assert_eq!(load_session(&path).await.unwrap(), Some(session));

    clear_session(&path).await.unwrap();
    assert!(!path.exists());
    // Clearing twice is fine.
    clear_session(&path).await.unwrap();
}

#[tokio::test]
async fn corrupt_session_file_is_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    tokio::fs::write(&path, "{not json").await.unwrap();
    assert!(matches!(load_session(&path).await, Err(AuthError::Storage(_))));
}

// =============================================================================
// client
// =============================================================================

#[test]
fn new_rejects_unconfigured() {
    let cfg = SupabaseConfig::new(crate::config::PLACEHOLDER_URL, "anon");
    assert!(matches!(SupabaseAuth::new(&cfg), Err(AuthError::NotConfigured)));
}

#[tokio::test]
async fn get_session_reads_persisted_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let session = crate::backend::test_helpers::valid_session("a@b.test");
    save_session(&path, &session).await.unwrap();

    let mut cfg = SupabaseConfig::new("https://temple.supabase.co", "anon");
    cfg.session_file = Some(path);
    let auth = SupabaseAuth::new(&cfg).unwrap();

    assert_eq!(auth.get_session().await.unwrap(), Some(session));
}

#[tokio::test]
async fn sign_out_without_session_clears_locally_and_notifies() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let mut cfg = SupabaseConfig::new("https://temple.supabase.co", "anon");
    cfg.session_file = Some(path.clone());
    let auth = SupabaseAuth::new(&cfg).unwrap();
    let mut rx = auth.subscribe();

    auth.sign_out().await.unwrap();

    let change = rx.recv().await.unwrap();
    assert_eq!(change.event, AuthEvent::SignedOut);
    assert!(change.session.is_none());
    assert!(!path.exists());
}

/// Minimal stand-in for the GoTrue endpoints used by the client.
async fn spawn_fake_gotrue() -> String {
    async fn token(headers: HeaderMap, body: String) -> (StatusCode, String) {
        let apikey_ok = headers.get("apikey").and_then(|v| v.to_str().ok()) == Some("anon");
        let request: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
        if !apikey_ok || request["password"] != "correct horse" {
            return (
                StatusCode::BAD_REQUEST,
                r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#.into(),
            );
        }
        let email = request["email"].as_str().unwrap_or_default();
        let body = serde_json::json!({
            "access_token": "jwt-token",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh",
            "user": {"id": "6f1c2a9e-6d3b-4e0e-9a41-0b6f3f1d9c11", "email": email},
        });
        (StatusCode::OK, body.to_string())
    }

    async fn logout(headers: HeaderMap) -> StatusCode {
        match headers.get("authorization").and_then(|v| v.to_str().ok()) {
            Some("Bearer jwt-token") => StatusCode::NO_CONTENT,
            Some("Bearer revoked-token") => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    let app = Router::new()
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/logout", post(logout));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn sign_in_persists_session_and_emits_signed_in() {
    let base = spawn_fake_gotrue().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let mut cfg = SupabaseConfig::new(format!("{base}/"), "anon");
    cfg.session_file = Some(path.clone());
    let auth = SupabaseAuth::new(&cfg).unwrap();
    let mut rx = auth.subscribe();

    auth.sign_in_with_password("monk@temple.test", "correct horse").await.unwrap();

    let change = rx.recv().await.unwrap();
    assert_eq!(change.event, AuthEvent::SignedIn);
    let session = change.session.unwrap();
    assert_eq!(session.access_token, "jwt-token");
    assert!(session.expires_at.is_some());
    assert!(session.is_valid());
    assert_eq!(load_session(&path).await.unwrap(), Some(session.clone()));
    assert_eq!(auth.get_session().await.unwrap(), Some(session));

    auth.sign_out().await.unwrap();
    let change = rx.recv().await.unwrap();
    assert_eq!(change.event, AuthEvent::SignedOut);
    assert!(!path.exists());
    assert!(auth.get_session().await.unwrap().is_none());
}

#[tokio::test]
async fn sign_in_wrong_password_returns_backend_message() {
    let base = spawn_fake_gotrue().await;
    let auth = SupabaseAuth::new(&SupabaseConfig::new(base, "anon")).unwrap();

    let err = auth.sign_in_with_password("monk@temple.test", "nope").await.unwrap_err();
    assert_eq!(err, AuthError::Response { status: 400, message: "Invalid login credentials".into() });
    assert_eq!(err.to_string(), "Invalid login credentials");
    assert!(auth.get_session().await.unwrap().is_none());
}

#[tokio::test]
async fn sign_in_unreachable_backend_is_request_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let auth = SupabaseAuth::new(&SupabaseConfig::new(format!("http://{addr}"), "anon")).unwrap();
    let err = auth.sign_in_with_password("monk@temple.test", "pw").await.unwrap_err();
    assert!(matches!(err, AuthError::Request(_)));
}

#[tokio::test]
async fn sign_in_keeps_session_in_memory_when_file_unwritable() {
    let base = spawn_fake_gotrue().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing-dir").join("session.json");
    let mut cfg = SupabaseConfig::new(base, "anon");
    cfg.session_file = Some(path.clone());
    let auth = SupabaseAuth::new(&cfg).unwrap();
    let mut rx = auth.subscribe();

    auth.sign_in_with_password("monk@temple.test", "correct horse").await.unwrap();

    let change = rx.recv().await.unwrap();
    assert_eq!(change.event, AuthEvent::SignedIn);
    assert!(!path.exists());
    assert_eq!(auth.get_session().await.unwrap(), change.session);
}

async fn client_with_persisted_token(base: &str, path: &Path, token: &str) -> SupabaseAuth {
    let mut session = crate::backend::test_helpers::valid_session("monk@temple.test");
    session.access_token = token.into();
    save_session(path, &session).await.unwrap();

    let mut cfg = SupabaseConfig::new(base, "anon");
    cfg.session_file = Some(path.to_path_buf());
    SupabaseAuth::new(&cfg).unwrap()
}

#[tokio::test]
async fn sign_out_remote_failure_still_clears_locally() {
    let base = spawn_fake_gotrue().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let auth = client_with_persisted_token(&base, &path, "other-token").await;
    let mut rx = auth.subscribe();

    let err = auth.sign_out().await.unwrap_err();
    assert!(matches!(err, AuthError::Response { status: 500, .. }));

    let change = rx.recv().await.unwrap();
    assert_eq!(change.event, AuthEvent::SignedOut);
    assert!(change.session.is_none());
    assert!(!path.exists());
    assert!(auth.get_session().await.unwrap().is_none());
}

#[tokio::test]
async fn sign_out_with_revoked_token_is_ok() {
    let base = spawn_fake_gotrue().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let auth = client_with_persisted_token(&base, &path, "revoked-token").await;
    let mut rx = auth.subscribe();

    auth.sign_out().await.unwrap();

    assert_eq!(rx.recv().await.unwrap().event, AuthEvent::SignedOut);
    assert!(!path.exists());
}
