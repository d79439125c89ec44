//! JSON-RPC message classification and envelope construction.
//!
//! Inbound bodies are decoded into a tagged [`Inbound`] value before any
//! dispatch happens, so the dispatcher never does ad hoc field-presence
//! checks. A message with a non-null `id` is a request; one without is a
//! notification and never produces a response envelope.

use serde_json::{json, Value};
use thiserror::Error;

/// JSON-RPC error code for a body that is not valid JSON.
pub const PARSE_ERROR: i64 = -32700;
/// JSON-RPC error code for an unknown method or tool.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC error code for a failure inside a tool handler.
pub const INTERNAL_ERROR: i64 = -32603;

/// A classified inbound protocol message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Carries a correlation id; the dispatcher answers with an envelope
    /// mirroring that id.
    Request {
        id: Value,
        method: String,
        params: Value,
    },
    /// No correlation id; never answered.
    Notification { method: String, params: Value },
}

impl Inbound {
    pub fn method(&self) -> &str {
        match self {
            Inbound::Request { method, .. } => method,
            Inbound::Notification { method, .. } => method,
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    /// Body is not valid JSON. The one error path that can occur before a
    /// method is known, so its envelope carries no `id` at all.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Valid JSON, but no string `method` field could be read (including
    /// non-object payloads). The envelope's `id` falls back to `null`.
    #[error("missing method field")]
    MissingMethod { id: Option<Value> },
}

/// Classify a raw request body.
pub fn decode(body: &[u8]) -> Result<Inbound, DecodeError> {
    let value: Value = serde_json::from_slice(body)?;

    let Some(object) = value.as_object() else {
        return Err(DecodeError::MissingMethod { id: None });
    };

    let id = object.get("id").cloned().filter(|id| !id.is_null());

    let Some(method) = object.get("method").and_then(Value::as_str) else {
        return Err(DecodeError::MissingMethod { id });
    };

    let method = method.to_string();
    let params = object.get("params").cloned().unwrap_or(Value::Null);

    Ok(match id {
        Some(id) => Inbound::Request { id, method, params },
        None => Inbound::Notification { method, params },
    })
}

/// Successful response envelope mirroring the request's id.
pub fn response_envelope(id: &Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    })
}

/// Error envelope. The `id` field is always present, `null` when the
/// original message lacked one.
pub fn error_envelope(id: &Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message,
        },
    })
}

/// Envelope for a body that never parsed; carries no `id` field.
pub fn parse_error_envelope() -> Value {
    json!({
        "jsonrpc": "2.0",
        "error": {
            "code": PARSE_ERROR,
            "message": "Parse error",
        },
    })
}
