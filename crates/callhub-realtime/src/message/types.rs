//! Inbound and outbound WebSocket message type definitions.
//!
//! Every frame is a JSON object of the form `{"event": "<name>", "data": {..}}`
//! with camelCase payload fields, matching the event names the browser
//! client already speaks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use callhub_core::types::UserId;

/// Current mapping of online user id to display name.
pub type PresenceSnapshot = BTreeMap<UserId, String>;

/// Messages sent by the client to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum InboundMessage {
    /// Announce the identity this connection speaks for.
    UserConnected(UserConnected),
    /// Ring a callee.
    InitiateCall(InitiateCall),
    /// Callee declines a call.
    CallRejected(RejectCall),
    /// Callee picks up a call.
    AcceptCall(AcceptCall),
    /// Heartbeat answer.
    Pong {
        /// Echoed server timestamp.
        #[serde(default)]
        timestamp: i64,
    },
}

impl InboundMessage {
    /// Event name as it appears on the wire.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::UserConnected(_) => "userConnected",
            Self::InitiateCall(_) => "initiateCall",
            Self::CallRejected(_) => "callRejected",
            Self::AcceptCall(_) => "acceptCall",
            Self::Pong { .. } => "pong",
        }
    }
}

/// `userConnected` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConnected {
    /// Id issued by the auth service.
    pub user_id: UserId,
    /// Display name.
    pub username: String,
}

/// `initiateCall` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateCall {
    /// Who is calling.
    pub caller_id: UserId,
    /// Caller display name shown on the callee's ringing screen.
    pub caller_username: String,
    /// Who is being called.
    pub callee_id: UserId,
}

/// `callRejected` payload (client to server).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectCall {
    /// The caller whose call is declined.
    pub caller_id: UserId,
    /// Free-form reason shown to the caller.
    #[serde(default)]
    pub message: String,
}

/// `acceptCall` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptCall {
    /// The caller whose call is accepted.
    pub caller_id: UserId,
    /// The accepting callee.
    pub callee_id: UserId,
    /// Callee display name.
    pub callee_username: String,
}

/// Messages sent by the server to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum OutboundMessage {
    /// Full presence snapshot, sent to every connection on change.
    UpdateOnlineUsers(PresenceSnapshot),
    /// Someone is ringing this user.
    IncomingCall(IncomingCall),
    /// The callee declined.
    CallRejected(CallRejected),
    /// The callee picked up.
    CallAccepted(CallAccepted),
    /// A call could not be delivered or rang out.
    CallFailed(CallFailed),
    /// Server keepalive. Written to the socket as a protocol Ping frame.
    Ping {
        /// Server timestamp (milliseconds since epoch).
        timestamp: i64,
    },
}

impl OutboundMessage {
    /// Event name as it appears on the wire.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::UpdateOnlineUsers(_) => "updateOnlineUsers",
            Self::IncomingCall(_) => "incomingCall",
            Self::CallRejected(_) => "callRejected",
            Self::CallAccepted(_) => "callAccepted",
            Self::CallFailed(_) => "callFailed",
            Self::Ping { .. } => "ping",
        }
    }
}

/// `incomingCall` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingCall {
    /// Caller id.
    pub from: UserId,
    /// Caller display name.
    pub username: String,
}

/// `callRejected` payload (server to client).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRejected {
    /// Reason supplied by the callee.
    pub message: String,
}

/// `callAccepted` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallAccepted {
    /// Callee id.
    pub by: UserId,
    /// Callee display name.
    pub username: String,
}

/// `callFailed` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFailed {
    /// The callee that could not be reached.
    pub callee_id: UserId,
    /// `"offline"` or `"timeout"`.
    pub reason: String,
}
