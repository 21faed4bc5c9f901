//! Message validation rules.

use callhub_core::error::AppError;
use callhub_core::types::UserId;

use super::types::{AcceptCall, InboundMessage, InitiateCall, RejectCall, UserConnected};

/// Longest display name accepted in an announcement.
const MAX_USERNAME_LEN: usize = 128;

/// Validates a raw frame before it is parsed.
pub fn validate_frame(raw: &str, max_bytes: usize) -> Result<(), AppError> {
    if raw.len() > max_bytes {
        return Err(AppError::validation(format!(
            "Message exceeds maximum size of {max_bytes} bytes"
        )));
    }

    if raw.trim().is_empty() {
        return Err(AppError::validation("Empty message"));
    }

    Ok(())
}

/// Validates the field values of a parsed inbound message.
pub fn validate_inbound(msg: &InboundMessage) -> Result<(), AppError> {
    match msg {
        InboundMessage::UserConnected(announce) => validate_announce(announce),
        InboundMessage::InitiateCall(InitiateCall {
            caller_id,
            callee_id,
            ..
        }) => {
            validate_user_id("callerId", *caller_id)?;
            validate_user_id("calleeId", *callee_id)
        }
        InboundMessage::CallRejected(RejectCall { caller_id, .. }) => {
            validate_user_id("callerId", *caller_id)
        }
        InboundMessage::AcceptCall(AcceptCall {
            caller_id,
            callee_id,
            ..
        }) => {
            validate_user_id("callerId", *caller_id)?;
            validate_user_id("calleeId", *callee_id)
        }
        InboundMessage::Pong { .. } => Ok(()),
    }
}

/// An announcement needs a positive id and a non-blank display name.
pub fn validate_announce(announce: &UserConnected) -> Result<(), AppError> {
    validate_user_id("userId", announce.user_id)?;
    validate_username(&announce.username)
}

/// Validates a display name.
pub fn validate_username(username: &str) -> Result<(), AppError> {
    if username.trim().is_empty() {
        return Err(AppError::validation("username must not be empty"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::validation(format!(
            "username exceeds {MAX_USERNAME_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_user_id(field: &str, id: UserId) -> Result<(), AppError> {
    if !id.is_valid() {
        return Err(AppError::validation(format!(
            "{field} must be a positive integer, got {id}"
        )));
    }
    Ok(())
}
