//! Presence snapshot handler.

use axum::Json;
use axum::extract::State;

use callhub_realtime::message::PresenceSnapshot;

use crate::dto::response::ApiResponse;
use crate::state::AppState;

/// GET /api/presence
///
/// Same mapping `updateOnlineUsers` carries.
pub async fn online_users(State(state): State<AppState>) -> Json<ApiResponse<PresenceSnapshot>> {
    Json(ApiResponse::ok(state.realtime.presence.snapshot().await))
}
