//! JSON encoding of relay messages.

use crate::error::{RelayError, RelayResult};
use crate::messages::{ClientMessage, ServerMessage};

/// Decode one client frame into a typed message.
///
/// Anything that is not a JSON object with a string `type` field is a
/// `MalformedMessage`. Objects with an unrecognized `type` decode to
/// [`ClientMessage::Unknown`].
pub fn decode_client_message(data: &[u8]) -> RelayResult<ClientMessage> {
    let value: serde_json::Value = serde_json::from_slice(data)?;
    match value.get("type") {
        Some(serde_json::Value::String(_)) => Ok(serde_json::from_value(value)?),
        Some(_) => Err(RelayError::MalformedMessage("`type` is not a string".into())),
        None => Err(RelayError::MalformedMessage("missing `type`".into())),
    }
}

/// Encode a relay message as a JSON text frame.
pub fn encode_server_message(msg: &ServerMessage) -> RelayResult<String> {
    Ok(serde_json::to_string(msg)?)
}
