//! Integration tests for the HTTP surface: health, presence, CORS, and the
//! upgrade guard.

mod helpers;

use http::StatusCode;

use callhub_core::config::AppConfig;
use callhub_core::types::UserId;

#[tokio::test]
async fn test_health_check() {
    let app = helpers::TestApp::new();

    let response = app.request("GET", "/api/health", &[]).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["data"]["status"], "ok");
    assert!(response.body["data"]["version"].is_string());
}

#[tokio::test]
async fn test_detailed_health_check() {
    let app = helpers::TestApp::new();
    let (conn, _rx) = app.state.realtime.connections.register(None);
    app.state
        .realtime
        .presence
        .announce(conn.id, UserId(4), "dana")
        .await
        .expect("announce");

    let response = app.request("GET", "/api/health/detailed", &[]).await;

    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["connections"], 1);
    assert_eq!(data["onlineUsers"], 1);
    assert_eq!(data["metrics"]["connectionsTotal"], 1);
}

#[tokio::test]
async fn test_presence_endpoint_returns_snapshot() {
    let app = helpers::TestApp::new();
    let empty = app.request("GET", "/api/presence", &[]).await;
    assert_eq!(empty.status, StatusCode::OK);
    assert_eq!(empty.body["data"], serde_json::json!({}));

    let (conn, _rx) = app.state.realtime.connections.register(None);
    app.state
        .realtime
        .presence
        .announce(conn.id, UserId(12), "lee")
        .await
        .expect("announce");

    let response = app.request("GET", "/api/presence", &[]).await;
    assert_eq!(response.body["data"], serde_json::json!({ "12": "lee" }));
}

#[tokio::test]
async fn test_ws_upgrade_without_token_when_required() {
    let mut config = AppConfig::default();
    config.auth.require_token = true;
    let app = helpers::TestApp::with_config(config);

    let response = app.request("GET", "/ws", &[]).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_plain_get_on_ws_path_is_not_upgraded() {
    let app = helpers::TestApp::new();

    let response = app.request("GET", "/ws", &[]).await;

    assert!(
        response.status.is_client_error(),
        "Expected a 4xx, got {}",
        response.status
    );
}

#[tokio::test]
async fn test_cors_preflight_allows_configured_origin() {
    let app = helpers::TestApp::new();

    let response = app
        .request(
            "OPTIONS",
            "/api/presence",
            &[
                ("Origin", "http://localhost:8080"),
                ("Access-Control-Request-Method", "GET"),
            ],
        )
        .await;

    assert!(response.status.is_success());
    assert_eq!(
        response.headers["access-control-allow-origin"],
        "http://localhost:8080"
    );
    assert_eq!(response.headers["access-control-allow-credentials"], "true");
}

#[tokio::test]
async fn test_cors_rejects_unknown_origin() {
    let app = helpers::TestApp::new();

    let response = app
        .request("GET", "/api/health", &[("Origin", "http://evil.example")])
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.headers.get("access-control-allow-origin").is_none());
}
