//! Integration tests for WebSocket presence and connection lifecycle.

mod helpers;

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;
use tokio_tungstenite::connect_async;

use callhub_core::config::AppConfig;
use callhub_core::types::UserId;
use callhub_realtime::connection::authenticator::Claims;

const SECRET: &str = "integration-secret";

fn token_for(id: i64) -> String {
    let now = Utc::now().timestamp();
    encode(
        &Header::default(),
        &Claims {
            id,
            iat: now,
            exp: now + 3600,
        },
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("encode token")
}

fn token_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.require_token = true;
    config.auth.jwt_secret = SECRET.to_string();
    config
}

async fn wait_until_offline(server: &helpers::LiveServer, user: i64) {
    for _ in 0..100 {
        if !server.state.realtime.presence.is_online(UserId(user)).await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("user {user} still online");
}

#[tokio::test]
async fn test_announce_broadcasts_snapshot_to_everyone() {
    let server = helpers::LiveServer::start().await;
    let mut alice = server.connect(None).await;
    let mut watcher = server.connect(None).await;

    alice.announce(5, "alice").await;

    let snapshot = watcher
        .wait_for_snapshot(|s| s.contains_key("5"))
        .await;
    assert_eq!(snapshot, json!({ "5": "alice" }));
}

#[tokio::test]
async fn test_duplicate_announce_keeps_latest_name() {
    let server = helpers::LiveServer::start().await;
    let mut first = server.connect(None).await;
    let mut second = server.connect(None).await;

    first.announce(5, "alice").await;
    second.announce(5, "alice2").await;

    let snapshot = first
        .wait_for_snapshot(|s| s.get("5").and_then(|v| v.as_str()) == Some("alice2"))
        .await;
    assert_eq!(snapshot.as_object().map(|m| m.len()), Some(1));
}

#[tokio::test]
async fn test_disconnect_removes_user_from_snapshot() {
    let server = helpers::LiveServer::start().await;
    let mut alice = server.connect(None).await;
    let mut bob = server.connect(None).await;
    alice.announce(1, "alice").await;
    bob.announce(2, "bob").await;

    alice.close().await;

    let snapshot = bob
        .wait_for_snapshot(|s| !s.contains_key("1"))
        .await;
    assert_eq!(snapshot, json!({ "2": "bob" }));
    wait_until_offline(&server, 1).await;
}

#[tokio::test]
async fn test_malformed_frames_do_not_close_connection() {
    let server = helpers::LiveServer::start().await;
    let mut client = server.connect(None).await;

    client.send_raw("this is not json").await;
    client
        .emit("userConnected", json!({ "userId": -3, "username": "ghost" }))
        .await;
    client.emit("hangUp", json!({})).await;

    client.announce(9, "ivy").await;
    assert!(server.state.realtime.presence.is_online(UserId(9)).await);
    assert_eq!(server.state.realtime.metrics.snapshot().malformed_frames, 3);
}

#[tokio::test]
async fn test_token_required_rejects_upgrade_without_token() {
    let server = helpers::LiveServer::start_with(token_config()).await;

    let err = connect_async(server.ws_url(None))
        .await
        .expect_err("upgrade must fail");
    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_token_identity_binds_announcement() {
    let server = helpers::LiveServer::start_with(token_config()).await;
    let token = token_for(7);
    let mut client = server.connect(Some(&token)).await;

    client
        .emit("userConnected", json!({ "userId": 8, "username": "mallory" }))
        .await;
    client.announce(7, "grace").await;

    let snapshot = server.state.realtime.presence.snapshot().await;
    assert!(snapshot.contains_key(&UserId(7)));
    assert!(!snapshot.contains_key(&UserId(8)));
}

fn fast_heartbeat() -> AppConfig {
    let mut config = AppConfig::default();
    config.realtime.ping_interval_seconds = 1;
    config.realtime.ping_timeout_seconds = 1;
    config
}

#[tokio::test]
async fn test_idle_client_stays_online_past_heartbeat_deadline() {
    let server = helpers::LiveServer::start_with(fast_heartbeat()).await;
    let mut alice = server.connect(None).await;
    alice.announce(1, "alice").await;

    assert!(alice.idle_for(Duration::from_secs(4)).await);
    assert!(server.state.realtime.presence.is_online(UserId(1)).await);
    assert_eq!(server.state.realtime.connections.connection_count(), 1);
}

#[tokio::test]
async fn test_unresponsive_client_is_dropped_by_heartbeat() {
    let server = helpers::LiveServer::start_with(fast_heartbeat()).await;
    let mut alice = server.connect(None).await;
    alice.announce(1, "alice").await;

    // Not reading means pings are never answered.
    tokio::time::sleep(Duration::from_secs(3)).await;
    wait_until_offline(&server, 1).await;
    assert_eq!(server.state.realtime.connections.connection_count(), 0);
}
