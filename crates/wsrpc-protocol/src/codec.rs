//! Envelope codec: envelopes to and from the transport's text messages.
//!
//! The codec is stateless. Decoding validates the envelope for its role: a
//! request needs a non-empty `method`, a response needs an `id` member and
//! exactly one of `result`/`error`.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::MAX_MESSAGE_SIZE;
use crate::error::{ProtocolError, ProtocolResult};
use crate::types::{Id, Request, Response};

/// Encodes a request envelope.
pub fn encode_request(request: &Request) -> ProtocolResult<String> {
    encode(request)
}

/// Encodes a response envelope.
pub fn encode_response(response: &Response) -> ProtocolResult<String> {
    encode(response)
}

/// Decodes a request envelope.
///
/// On failure the returned [`ProtocolError::MalformedMessage`] carries the
/// request id whenever the text was JSON with an integer `id` member.
pub fn decode_request(text: &str) -> ProtocolResult<Request> {
    let value = parse(text)?;
    let id = recover_id(&value);
    let request: Request = from_value(value, id)?;

    if request.method.is_empty() {
        return Err(ProtocolError::malformed("method name is empty", request.id));
    }

    Ok(request)
}

/// Decodes a response envelope.
pub fn decode_response(text: &str) -> ProtocolResult<Response> {
    let value = parse(text)?;
    let id = recover_id(&value);
    from_value(value, id)
}

fn encode<T: Serialize>(message: &T) -> ProtocolResult<String> {
    let text = serde_json::to_string(message)?;

    if text.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: text.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    Ok(text)
}

fn parse(text: &str) -> ProtocolResult<Value> {
    if text.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::malformed(
            format!(
                "message too large: {} bytes (max: {})",
                text.len(),
                MAX_MESSAGE_SIZE
            ),
            None,
        ));
    }

    serde_json::from_str(text)
        .map_err(|e| ProtocolError::malformed(format!("invalid JSON: {}", e), None))
}

fn from_value<T: DeserializeOwned>(value: Value, id: Id) -> ProtocolResult<T> {
    serde_json::from_value(value).map_err(|e| ProtocolError::malformed(e.to_string(), id))
}

/// Best-effort id extraction from a structurally invalid envelope.
fn recover_id(value: &Value) -> Id {
    value.get("id").and_then(Value::as_i64)
}
