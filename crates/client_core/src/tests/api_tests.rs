use super::*;
use crate::test_support::spawn_router;
use axum::{
    http::{HeaderMap, StatusCode as AxumStatus},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use shared::error::ErrorCode;

#[derive(Debug, Deserialize, PartialEq)]
struct Echo {
    value: u32,
}

async fn ok_handler() -> Json<Value> {
    Json(json!({ "success": true, "data": { "value": 7 } }))
}

async fn rejected_handler() -> Json<Value> {
    Json(json!({
        "success": false,
        "error": { "code": "validation", "message": "bad input" }
    }))
}

async fn unavailable_handler() -> (AxumStatus, Json<Value>) {
    (
        AxumStatus::SERVICE_UNAVAILABLE,
        Json(json!({ "success": false, "error": { "code": "unavailable", "message": "down" } })),
    )
}

async fn whoami_handler(headers: HeaderMap) -> Json<Value> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    Json(json!({ "success": true, "data": auth }))
}

async fn empty_handler() -> Json<Value> {
    Json(json!({ "success": true }))
}

async fn client() -> ApiClient {
    let app = Router::new()
        .route("/api/v1/ok", get(ok_handler))
        .route("/api/v1/rejected", get(rejected_handler))
        .route("/api/v1/unavailable", get(unavailable_handler))
        .route("/api/v1/whoami", get(whoami_handler))
        .route("/api/v1/ack", post(empty_handler));
    let base = spawn_router(app).await.expect("spawn server");
    ApiClient::new(&base, Duration::from_secs(5)).expect("client")
}

#[tokio::test]
async fn decodes_success_envelope_data() {
    let api = client().await;
    let echo: Echo = api.get("/ok").await.expect("get");
    assert_eq!(echo, Echo { value: 7 });
}

#[tokio::test]
async fn failed_envelope_maps_to_api_error() {
    let api = client().await;
    let err = api.get::<Echo>("rejected").await.expect_err("rejected");
    match err {
        ApiClientError::Api(api_err) => {
            assert_eq!(api_err.code, ErrorCode::Validation);
            assert_eq!(api_err.message, "bad input");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn non_success_status_keeps_server_message() {
    let api = client().await;
    let err = api.get::<Echo>("/unavailable").await.expect_err("status");
    assert!(matches!(
        err,
        ApiClientError::Status {
            status: StatusCode::SERVICE_UNAVAILABLE,
            ..
        }
    ));
    assert!(err.to_string().ends_with(": down"), "got {err}");
}

#[tokio::test]
async fn bearer_token_is_attached_once_set() {
    let api = client().await;
    let anonymous: String = api.get("/whoami").await.expect("anonymous");
    assert!(anonymous.is_empty());

    api.set_token(Some("abc".into())).await;
    let authed: String = api.get("/whoami").await.expect("authed");
    assert_eq!(authed, "Bearer abc");
}

#[tokio::test]
async fn ack_accepts_envelope_without_data() {
    let api = client().await;
    api.post_ack("/ack", &json!({})).await.expect("ack");
    let err = api
        .post::<_, Echo>("/ack", &json!({}))
        .await
        .expect_err("no data");
    assert!(matches!(err, ApiClientError::MissingData { .. }));
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let api = ApiClient::new("http://127.0.0.1:9/api/v1", Duration::from_secs(2)).expect("client");
    let err = api.get::<Echo>("/ok").await.expect_err("unreachable");
    assert!(matches!(err, ApiClientError::Transport { .. }));
}

#[test]
fn joins_paths_with_single_slash() {
    let api = ApiClient::with_http(reqwest::Client::new(), "http://host/api/v1/").expect("client");
    assert_eq!(api.url("/auth/login"), "http://host/api/v1/auth/login");
    assert_eq!(api.url("auth/me"), "http://host/api/v1/auth/me");
}

#[test]
fn rejects_invalid_base_url() {
    let err = ApiClient::with_http(reqwest::Client::new(), "not a url").expect_err("invalid");
    assert!(matches!(err, ApiClientError::InvalidBaseUrl { .. }));
}
