use std::time::Duration;

use super::*;
use crate::test_support::spawn_router;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use storage::MemoryStore;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
struct AuthServerState {
    logouts: Arc<Mutex<u32>>,
    reject_me: Arc<Mutex<bool>>,
}

fn remote_user() -> User {
    User {
        id: UserId::new("user-7"),
        email: "ops@example.org".into(),
        name: "Ops Lead".into(),
        role: UserRole::Instructor,
        organization_id: Some(OrganizationId::new("org-1")),
        permissions: vec!["exercises:launch".into()],
    }
}

async fn handle_login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["password"] != "correct horse" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "success": false,
                "error": { "code": "unauthorized", "message": "invalid credentials" }
            })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": {
                "user": remote_user(),
                "accessToken": "access-1",
                "refreshToken": "refresh-1",
                "organization": { "id": "org-1", "name": "Blue Org", "slug": "blue" }
            }
        })),
    )
}

async fn handle_logout(State(state): State<AuthServerState>) -> Json<Value> {
    *state.logouts.lock().await += 1;
    Json(json!({ "success": true }))
}

async fn handle_refresh(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["refreshToken"] == "refresh-1" {
        (
            StatusCode::OK,
            Json(json!({ "success": true, "data": { "accessToken": "access-2" } })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "error": { "code": "unauthorized", "message": "expired" } })),
        )
    }
}

async fn handle_me(
    State(state): State<AuthServerState>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer access-"));
    if !authorized || *state.reject_me.lock().await {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "error": { "code": "unauthorized", "message": "no session" } })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({ "success": true, "data": remote_user() })),
    )
}

async fn remote_store() -> (AuthServerState, Arc<MemoryStore>, AuthStore) {
    let state = AuthServerState::default();
    let app = Router::new()
        .route("/api/v1/auth/login", post(handle_login))
        .route("/api/v1/auth/logout", post(handle_logout))
        .route("/api/v1/auth/refresh", post(handle_refresh))
        .route("/api/v1/auth/me", get(handle_me))
        .with_state(state.clone());
    let base = spawn_router(app).await.expect("spawn server");
    let api = Arc::new(ApiClient::new(&base, Duration::from_secs(5)).expect("client"));
    let store = Arc::new(MemoryStore::new());
    let auth = AuthStore::new(AuthMode::Remote, api, store.clone());
    (state, store, auth)
}

fn demo_store() -> (Arc<MemoryStore>, AuthStore) {
    let api = Arc::new(
        ApiClient::new("http://127.0.0.1:9/api/v1", Duration::from_secs(1)).expect("client"),
    );
    let store = Arc::new(MemoryStore::new());
    let auth = AuthStore::new(AuthMode::Demo, api, store.clone());
    (store, auth)
}

#[tokio::test]
async fn demo_login_installs_deterministic_identity() {
    let (store, auth) = demo_store();
    let user = auth.login("anyone@example.org", "whatever").await.expect("login");
    assert_eq!(user.id, UserId::new("demo-user"));

    let state = auth.state().await;
    assert!(state.is_authenticated);
    assert_eq!(state.access_token.as_deref(), Some(DEMO_TOKEN));
    assert_eq!(
        state.organization.map(|o| o.id),
        Some(OrganizationId::new("demo-org"))
    );
    assert!(store.get(AUTH_STORE_KEY).await.expect("get").is_some());
    assert!(auth.has_permission("anything").await);
}

#[tokio::test]
async fn remote_login_persists_snapshot_without_transient_flags() {
    let (_, store, auth) = remote_store().await;
    auth.login("ops@example.org", "correct horse")
        .await
        .expect("login");

    let raw = store
        .get(AUTH_STORE_KEY)
        .await
        .expect("get")
        .expect("persisted");
    assert!(raw.contains("access-1"));
    assert!(!raw.contains("isLoading"));
    assert!(!raw.contains("error"));

    let snapshot: AuthSnapshot = serde_json::from_str(&raw).expect("decode");
    assert!(snapshot.is_authenticated);
    assert_eq!(snapshot.refresh_token.as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn remote_login_failure_records_error_without_demo_fallback() {
    let (_, store, auth) = remote_store().await;
    let err = auth
        .login("ops@example.org", "wrong")
        .await
        .expect_err("rejected");
    assert!(err.to_string().contains("invalid credentials"));

    let state = auth.state().await;
    assert!(!state.is_authenticated);
    assert!(state.user.is_none());
    assert!(state.error.is_some());
    assert!(store.get(AUTH_STORE_KEY).await.expect("get").is_none());

    auth.clear_error().await;
    assert!(auth.state().await.error.is_none());
}

#[tokio::test]
async fn restore_rehydrates_persisted_session() {
    let (_, store, auth) = remote_store().await;
    auth.login("ops@example.org", "correct horse")
        .await
        .expect("login");

    let api = Arc::new(
        ApiClient::new("http://127.0.0.1:9/api/v1", Duration::from_secs(1)).expect("client"),
    );
    let reloaded = AuthStore::new(AuthMode::Remote, api.clone(), store.clone());
    reloaded.restore().await.expect("restore");
    assert!(reloaded.is_authenticated().await);
    assert_eq!(api.token().await.as_deref(), Some("access-1"));
}

#[tokio::test]
async fn restore_discards_corrupt_snapshot() {
    let (store, auth) = demo_store();
    store.set(AUTH_STORE_KEY, "{oops").await.expect("set");
    auth.restore().await.expect("restore");
    assert!(!auth.is_authenticated().await);
    assert!(store.get(AUTH_STORE_KEY).await.expect("get").is_none());
}

#[tokio::test]
async fn logout_notifies_server_and_clears_everything() {
    let (server, store, auth) = remote_store().await;
    auth.login("ops@example.org", "correct horse")
        .await
        .expect("login");
    auth.logout().await;

    assert_eq!(*server.logouts.lock().await, 1);
    assert_eq!(auth.state().await, AuthState::default());
    assert!(store.get(AUTH_STORE_KEY).await.expect("get").is_none());
}

#[tokio::test]
async fn logout_clears_state_even_when_server_unreachable() {
    let api = Arc::new(
        ApiClient::new("http://127.0.0.1:9/api/v1", Duration::from_secs(1)).expect("client"),
    );
    let store = Arc::new(MemoryStore::new());
    let snapshot = AuthSnapshot {
        user: Some(remote_user()),
        access_token: Some("access-1".into()),
        refresh_token: None,
        organization: None,
        is_authenticated: true,
    };
    save_json(store.as_ref(), AUTH_STORE_KEY, &snapshot)
        .await
        .expect("seed");
    let auth = AuthStore::new(AuthMode::Remote, api, store.clone());
    auth.restore().await.expect("restore");

    auth.logout().await;
    assert!(!auth.is_authenticated().await);
    assert!(store.get(AUTH_STORE_KEY).await.expect("get").is_none());
}

#[tokio::test]
async fn check_auth_status_accepts_valid_session() {
    let (_, _, auth) = remote_store().await;
    auth.login("ops@example.org", "correct horse")
        .await
        .expect("login");
    assert!(auth.check_auth_status().await);
    assert!(auth.has_role(UserRole::Instructor).await);
    assert!(auth.has_permission("exercises:launch").await);
    assert!(!auth.has_permission("organizations:delete").await);
}

#[tokio::test]
async fn check_auth_status_fails_closed() {
    let (server, store, auth) = remote_store().await;
    assert!(!auth.check_auth_status().await, "missing token");

    auth.login("ops@example.org", "correct horse")
        .await
        .expect("login");
    *server.reject_me.lock().await = true;
    assert!(!auth.check_auth_status().await);
    assert!(!auth.is_authenticated().await);
    assert!(store.get(AUTH_STORE_KEY).await.expect("get").is_none());
}

#[tokio::test]
async fn refresh_rotates_access_token() {
    let (_, _, auth) = remote_store().await;
    auth.login("ops@example.org", "correct horse")
        .await
        .expect("login");
    auth.refresh_token().await.expect("refresh");

    let state = auth.state().await;
    assert_eq!(state.access_token.as_deref(), Some("access-2"));
    assert_eq!(state.refresh_token.as_deref(), Some("refresh-1"));
    assert!(auth.check_auth_status().await);
}

#[tokio::test]
async fn failed_refresh_logs_out() {
    let (_, _, auth) = remote_store().await;
    auth.set_organization(Organization {
        id: OrganizationId::new("org-1"),
        name: "Blue Org".into(),
        slug: "blue".into(),
        branding: None,
    })
    .await;
    assert!(auth.refresh_token().await.is_err());
    assert!(auth.state().await.organization.is_none());
}

#[tokio::test]
async fn update_user_patches_and_persists() {
    let (store, auth) = demo_store();
    assert!(auth.update_user(UserPatch::default()).await.is_none());

    auth.login("", "").await.expect("login");
    let user = auth
        .update_user(UserPatch {
            name: Some("Renamed".into()),
            email: None,
        })
        .await
        .expect("user");
    assert_eq!(user.name, "Renamed");

    let snapshot: AuthSnapshot = load_json(store.as_ref(), AUTH_STORE_KEY)
        .await
        .expect("load")
        .expect("present");
    assert_eq!(snapshot.user.map(|u| u.name), Some("Renamed".to_string()));
}
