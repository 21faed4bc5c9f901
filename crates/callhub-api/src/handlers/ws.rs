//! WebSocket upgrade handler.

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use tracing::{error, info, warn};

use callhub_core::types::UserId;
use callhub_realtime::connection::heartbeat::run_heartbeat;
use callhub_realtime::connection::manager::TeardownGuard;
use callhub_realtime::message::serializer::serialize_outbound;
use callhub_realtime::message::types::OutboundMessage;

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters accepted on the upgrade request.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    /// Token from the auth service. Only checked when token auth is on.
    pub token: Option<String>,
}

/// GET /ws?token={jwt}
///
/// The token is checked before the upgrade so a bad token gets a plain 401.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError> {
    let authenticated = state.authenticator.authenticate(query.token.as_deref())?;

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    let max_message_size = state.config.realtime.max_message_bytes;
    Ok(ws
        .max_message_size(max_message_size)
        .on_upgrade(move |socket| handle_ws_connection(state, authenticated, socket)))
}

/// Handles an established WebSocket connection.
async fn handle_ws_connection(state: AppState, authenticated: Option<UserId>, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let manager = state.realtime.connections.clone();

    let (handle, mut outbound_rx) = manager.register(authenticated);
    let conn_id = handle.id;
    let guard = TeardownGuard::new(manager.clone(), conn_id);
    let closed = handle.closed_token();

    info!(conn_id = %conn_id, "WebSocket connection established");

    let heartbeat = tokio::spawn(run_heartbeat(handle.clone(), manager.heartbeat_config()));

    // Outbound forwarder
    let outbound_closed = closed.clone();
    let outbound_task = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                _ = outbound_closed.cancelled() => break,
                msg = outbound_rx.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
            };
            let frame = match msg {
                // Keepalive goes out as a protocol ping; clients answer it
                // without knowing any event beyond the signaling set.
                OutboundMessage::Ping { timestamp } => {
                    Message::Ping(timestamp.to_be_bytes().to_vec().into())
                }
                msg => match serialize_outbound(&msg) {
                    Ok(text) => Message::Text(text.into()),
                    Err(e) => {
                        error!(conn_id = %conn_id, error = %e, "Failed to serialize outbound message");
                        continue;
                    }
                },
            };
            if ws_tx.send(frame).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.send(Message::Close(None)).await;
    });

    // Inbound frames
    loop {
        let frame = tokio::select! {
            _ = closed.cancelled() => break,
            frame = ws_rx.next() => frame,
        };
        match frame {
            Some(Ok(Message::Text(text))) => {
                manager.handle_inbound(&conn_id, text.as_str()).await;
            }
            Some(Ok(Message::Pong(_) | Message::Ping(_))) => handle.touch().await,
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    handle.close();
    guard.finish().await;
    let _ = heartbeat.await;
    let _ = outbound_task.await;

    info!(conn_id = %conn_id, "WebSocket connection closed");
}
