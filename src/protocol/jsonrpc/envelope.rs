// Copyright (c) 2025 Makai MCP Authors
//
// Licensed under the MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)

//! Envelope codec: byte buffers in, typed envelopes out.
//!
//! Parsing deserializes a framed message to a generic JSON value, validates
//! the JSON-RPC 2.0 invariants, and classifies the message as a request,
//! notification, or response. Building goes the other way: a typed result or
//! error becomes a wire envelope whose `id` is a verbatim copy of the
//! request's id (JSON null when the request carried none).

use serde_json::Value;

use super::error::{Error, JsonRpcError, Result};
use super::types::{Request, RequestId, Response, JSONRPC_VERSION};

/// A parsed and validated JSON-RPC message.
#[derive(Debug, Clone)]
pub enum Envelope {
    /// A request carrying an id; the caller expects a response.
    Request(Request),

    /// A request without an id; no response may be produced.
    Notification(Request),

    /// A response envelope. A server connection logs and ignores these.
    Response(Response),
}

impl Envelope {
    /// Returns the method name for request/notification envelopes.
    pub fn method(&self) -> Option<&str> {
        match self {
            Envelope::Request(r) | Envelope::Notification(r) => Some(&r.method),
            Envelope::Response(_) => None,
        }
    }
}

/// Parses a framed message body into a validated envelope.
///
/// Failure modes map onto the wire taxonomy: malformed JSON is a parse error
/// (-32700), everything structural after that is an invalid request (-32600).
pub fn parse(bytes: &[u8]) -> Result<Envelope> {
    let value: Value = serde_json::from_slice(bytes)?;

    let obj = match value {
        Value::Object(ref map) => map,
        _ => {
            return Err(Error::InvalidMessage(
                "Message must be a JSON object".to_string(),
            ))
        }
    };

    match obj.get("jsonrpc") {
        Some(Value::String(v)) if v == JSONRPC_VERSION => {}
        Some(v) => {
            return Err(Error::InvalidMessage(format!(
                "Invalid JSON-RPC version: {}, must be {}",
                v, JSONRPC_VERSION
            )))
        }
        None => {
            return Err(Error::InvalidMessage(
                "Missing jsonrpc version field".to_string(),
            ))
        }
    }

    let id = parse_id(obj.get("id"))?;

    // A message with a method is a request or notification; without one it
    // must be a response (result or error present).
    match obj.get("method") {
        Some(Value::String(method)) => {
            if method.is_empty() {
                return Err(Error::InvalidMessage("Method cannot be empty".to_string()));
            }
            let request = Request {
                jsonrpc: JSONRPC_VERSION.to_string(),
                method: method.clone(),
                params: obj.get("params").cloned(),
                id,
            };
            if request.is_notification() {
                Ok(Envelope::Notification(request))
            } else {
                Ok(Envelope::Request(request))
            }
        }
        Some(_) => Err(Error::InvalidMessage(
            "Method must be a string".to_string(),
        )),
        None => {
            if obj.contains_key("result") || obj.contains_key("error") {
                let response: Response = serde_json::from_slice(bytes)?;
                Ok(Envelope::Response(response))
            } else {
                Err(Error::InvalidMessage("Missing method field".to_string()))
            }
        }
    }
}

/// Validates the `id` field: string or integer, JSON null treated as absent.
fn parse_id(id: Option<&Value>) -> Result<Option<RequestId>> {
    match id {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(RequestId::String(s.clone()))),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => Ok(Some(RequestId::Number(i))),
            None => Err(Error::InvalidMessage(
                "Request id must be an integer or string".to_string(),
            )),
        },
        Some(_) => Err(Error::InvalidMessage(
            "Request id must be an integer or string".to_string(),
        )),
    }
}

/// Best-effort id recovery from a malformed message.
///
/// Used to key an error response when full parsing failed; returns None when
/// no string-or-integer id can be pulled out of the buffer.
pub fn recover_id(bytes: &[u8]) -> Option<RequestId> {
    let value: Value = serde_json::from_slice(bytes).ok()?;
    parse_id(value.get("id")).ok().flatten()
}

/// Serializes a success response for the given request id.
pub fn encode_success(id: Option<RequestId>, result: Value) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&Response::success(id, result))?)
}

/// Serializes an error response for the given request id.
pub fn encode_error(id: Option<RequestId>, error: JsonRpcError) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&Response::error(id, error))?)
}

/// Serializes an outbound notification.
pub fn encode_notification(method: &str, params: Value) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&Request::notification(
        method,
        Some(params),
    ))?)
}
