//! End-to-end call negotiation over real WebSocket clients.

mod helpers;

use std::time::Duration;

use serde_json::json;

use callhub_core::config::AppConfig;

const QUIET: Duration = Duration::from_millis(300);

#[tokio::test]
async fn test_initiate_then_accept() {
    let server = helpers::LiveServer::start().await;
    let mut alice = server.connect(None).await;
    let mut bob = server.connect(None).await;
    alice.announce(1, "alice").await;
    bob.announce(2, "bob").await;

    alice
        .emit(
            "initiateCall",
            json!({ "callerId": 1, "callerUsername": "alice", "calleeId": 2 }),
        )
        .await;
    let incoming = bob.recv_event("incomingCall").await;
    assert_eq!(incoming, json!({ "from": 1, "username": "alice" }));

    bob.emit(
        "acceptCall",
        json!({ "callerId": 1, "calleeId": 2, "calleeUsername": "bob" }),
    )
    .await;
    let accepted = alice.recv_event("callAccepted").await;
    assert_eq!(accepted, json!({ "by": 2, "username": "bob" }));
}

#[tokio::test]
async fn test_reject_reaches_caller() {
    let server = helpers::LiveServer::start().await;
    let mut alice = server.connect(None).await;
    let mut bob = server.connect(None).await;
    alice.announce(1, "alice").await;
    bob.announce(2, "bob").await;

    alice
        .emit(
            "initiateCall",
            json!({ "callerId": 1, "callerUsername": "alice", "calleeId": 2 }),
        )
        .await;
    bob.recv_event("incomingCall").await;

    bob.emit("callRejected", json!({ "callerId": 1, "message": "busy" }))
        .await;
    let rejected = alice.recv_event("callRejected").await;
    assert_eq!(rejected, json!({ "message": "busy" }));
}

#[tokio::test]
async fn test_call_to_offline_user_is_silent() {
    let server = helpers::LiveServer::start().await;
    let mut alice = server.connect(None).await;
    let mut carol = server.connect(None).await;
    alice.announce(1, "alice").await;
    carol.announce(3, "carol").await;

    alice
        .emit(
            "initiateCall",
            json!({ "callerId": 1, "callerUsername": "alice", "calleeId": 2 }),
        )
        .await;

    alice.expect_no_call_events(QUIET).await;
    carol.expect_no_call_events(QUIET).await;
}

#[tokio::test]
async fn test_every_device_of_callee_rings() {
    let server = helpers::LiveServer::start().await;
    let mut alice = server.connect(None).await;
    let mut bob_laptop = server.connect(None).await;
    alice.announce(1, "alice").await;
    bob_laptop.announce(2, "bob").await;
    // connected late so the first snapshot it sees is its own
    let mut bob_phone = server.connect(None).await;
    bob_phone.announce(2, "bob").await;

    alice
        .emit(
            "initiateCall",
            json!({ "callerId": 1, "callerUsername": "alice", "calleeId": 2 }),
        )
        .await;

    assert_eq!(bob_laptop.recv_event("incomingCall").await["from"], 1);
    assert_eq!(bob_phone.recv_event("incomingCall").await["from"], 1);
}

#[tokio::test]
async fn test_failure_ack_for_offline_callee() {
    let mut config = AppConfig::default();
    config.signaling.failure_acks = true;
    let server = helpers::LiveServer::start_with(config).await;
    let mut alice = server.connect(None).await;
    alice.announce(1, "alice").await;

    alice
        .emit(
            "initiateCall",
            json!({ "callerId": 1, "callerUsername": "alice", "calleeId": 42 }),
        )
        .await;

    let failed = alice.recv_event("callFailed").await;
    assert_eq!(failed, json!({ "calleeId": 42, "reason": "offline" }));
}

#[tokio::test]
async fn test_tracked_sessions_drop_unsolicited_accept() {
    let mut config = AppConfig::default();
    config.signaling.track_sessions = true;
    let server = helpers::LiveServer::start_with(config).await;
    let mut alice = server.connect(None).await;
    let mut bob = server.connect(None).await;
    alice.announce(1, "alice").await;
    bob.announce(2, "bob").await;

    bob.emit(
        "acceptCall",
        json!({ "callerId": 1, "calleeId": 2, "calleeUsername": "bob" }),
    )
    .await;
    alice.expect_no_call_events(QUIET).await;

    alice
        .emit(
            "initiateCall",
            json!({ "callerId": 1, "callerUsername": "alice", "calleeId": 2 }),
        )
        .await;
    bob.recv_event("incomingCall").await;
    bob.emit(
        "acceptCall",
        json!({ "callerId": 1, "calleeId": 2, "calleeUsername": "bob" }),
    )
    .await;
    assert_eq!(alice.recv_event("callAccepted").await["by"], 2);
}
