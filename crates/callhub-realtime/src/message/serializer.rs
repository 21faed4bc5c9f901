//! JSON framing for WebSocket messages.

use callhub_core::error::{AppError, ErrorKind};
use callhub_core::result::AppResult;

use super::types::{InboundMessage, OutboundMessage};
use super::validator::validate_frame;

/// Serialize an outbound message to a JSON text frame.
pub fn serialize_outbound(msg: &OutboundMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}

/// Decode a raw text frame into an inbound message.
///
/// Oversized, empty, and unparseable frames all come back as validation
/// errors so the caller can log and drop them uniformly.
pub fn deserialize_inbound(text: &str, max_bytes: usize) -> AppResult<InboundMessage> {
    validate_frame(text, max_bytes)?;
    serde_json::from_str(text).map_err(|e| {
        AppError::with_source(ErrorKind::Validation, format!("Malformed frame: {e}"), e)
    })
}
